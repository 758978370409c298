pub(crate) const DEFAULT_PORT: u16 = 3000;
pub(crate) const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080/project/instances/";
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_HEARTBEAT_MS: u64 = 15_000;
pub(crate) const DEFAULT_STATIC_DIR: &str = "static";
pub(crate) const BROADCAST_BUFFER: usize = 256;
