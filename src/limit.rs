use url::form_urlencoded;
use url::Url;

use crate::error::Result;
use crate::model::Table;

/// Rewrites a query string for a new page size: drops the pagination marker
/// (results restart at the first page) and sets `limit_param` to `count`.
/// Other parameters keep their order.
pub fn limit_query(query: &str, pagination_param: &str, limit_param: &str, count: u32) -> String {
    let query = query.strip_prefix('?').unwrap_or(query);
    let kept = form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name != pagination_param && name != limit_param)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect::<Vec<_>>();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in &kept {
        serializer.append_pair(name, value);
    }
    serializer.append_pair(limit_param, &count.to_string());
    serializer.finish()
}

/// Absolute link for one size-limit option of `table`, relative to the page
/// at `base`. Tables that do not declare a limit parameter get no links.
pub fn limit_href(base: &str, table: &Table, count: u32) -> Result<Option<String>> {
    let limit_param = match &table.limit_param {
        Some(param) => param,
        None => return Ok(None),
    };
    let pagination_param = table.pagination_param.as_deref().unwrap_or_default();
    let mut url = Url::parse(base)?;
    let query = limit_query(url.query().unwrap_or_default(), pagination_param, limit_param, count);
    url.set_query(Some(&query));
    Ok(Some(url.to_string()))
}
