use serde::Deserialize;

const EMPTY_ROW_TEMPLATE: &str =
    "<tr class=\"odd empty\"><td colspan=\"{{colspan}}\">{{no_items_label}}</td></tr>";
const CONFIRM_TEMPLATE: &str = "<p>You have selected:{{selection}}.</p>\
{{selection_list}}<p>Please confirm your selection. {{help}}</p>";
const COLSPAN_TOKEN: &str = "{{colspan}}";
const NO_ITEMS_TOKEN: &str = "{{no_items_label}}";
const SELECTION_TOKEN: &str = "{{selection}}";
const SELECTION_LIST_TOKEN: &str = "{{selection_list}}";
const HELP_TOKEN: &str = "{{help}}";
const COUNT_TOKEN: &str = "%s";

/// Message catalogue for the strings the tables render themselves.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Translations {
    pub displaying_one: String,
    pub displaying_many: String,
    pub no_items_label: String,
    pub confirm_title: String,
    /// Confirmation body template. `None` renders the plain fallback.
    pub confirm_body: Option<String>,
}

impl Default for Translations {
    fn default() -> Self {
        Self {
            displaying_one: "Displaying %s item".to_string(),
            displaying_many: "Displaying %s items".to_string(),
            no_items_label: "No items to display.".to_string(),
            confirm_title: "Confirm %s".to_string(),
            confirm_body: Some(CONFIRM_TEMPLATE.to_string()),
        }
    }
}

impl Translations {
    /// Footer text for `count` visible rows; empty when nothing is shown.
    pub fn displaying(&self, count: usize) -> String {
        if count == 0 {
            return String::new();
        }
        let template = if count == 1 {
            &self.displaying_one
        } else {
            &self.displaying_many
        };
        template.replace(COUNT_TOKEN, &count.to_string())
    }

    pub fn confirm_title(&self, action: &str) -> String {
        self.confirm_title.replace(COUNT_TOKEN, action)
    }

    pub fn empty_row_template(&self) -> EmptyRowTemplate {
        EmptyRowTemplate::Label(self.no_items_label.clone())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EmptyRowTemplate {
    /// Built from the translated "no items" label.
    Label(String),
    /// A server-rendered `tr.empty`, reused as is.
    Markup(String),
}

impl EmptyRowTemplate {
    pub fn render(&self, colspan: usize) -> String {
        match self {
            EmptyRowTemplate::Label(label) => EMPTY_ROW_TEMPLATE
                .replace(COLSPAN_TOKEN, &colspan.to_string())
                .replace(NO_ITEMS_TOKEN, &escape_html(label)),
            EmptyRowTemplate::Markup(html) => html.clone(),
        }
    }
}

/// Parameters handed to the confirmation dialog body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfirmParams {
    pub selection: String,
    pub selection_list: Vec<String>,
    pub help: String,
}

pub fn render_confirm_body(params: &ConfirmParams, template: &str) -> String {
    let list = if params.selection_list.len() > 1 {
        let items = params
            .selection_list
            .iter()
            .map(|item| format!("<li>{}</li>", escape_html(item.trim())))
            .collect::<String>();
        format!("<ul>{}</ul>", items)
    } else {
        String::new()
    };
    template
        .replace(SELECTION_TOKEN, &escape_html(&params.selection))
        .replace(SELECTION_LIST_TOKEN, &list)
        .replace(HELP_TOKEN, &escape_html(&params.help))
}

/// Plain-text body used when no template is available.
pub fn fallback_confirm_body(params: &ConfirmParams) -> String {
    format!(
        "{} Please confirm your selection. {}",
        params.selection.trim(),
        params.help
    )
    .trim()
    .to_string()
}

pub(crate) fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
