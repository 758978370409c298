use crate::model::{Table, CATEGORY_PREFIX};

const EMPTY_CATEGORY_SUFFIX: &str = " (0)";

/// Category to select when a table mounts: the first filter button whose
/// label does not advertise an empty bucket.
pub fn initial_category(table: &Table) -> Option<String> {
    table
        .filter_buttons
        .iter()
        .find(|button| !button.label.trim_end().ends_with(EMPTY_CATEGORY_SUFFIX))
        .map(|button| button.value.clone())
}

/// Marks the button for `category` active and every other one inactive.
pub fn select_category(table: &mut Table, category: &str) {
    for button in table.filter_buttons.iter_mut() {
        button.active = button.value == category;
    }
}

/// Hides rows outside `category` without touching rows already hidden by a
/// search. Used when a search and a category filter are both active.
pub fn narrow_to_category(table: &mut Table, category: &str) {
    let class = format!("{}{}", CATEGORY_PREFIX, category);
    for row in table.rows.iter_mut().filter(|row| !row.has_class(&class)) {
        row.hidden = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footer::sync;
    use crate::model::{FilterButton, Row};
    use crate::template::Translations;

    fn filtered_table() -> Table {
        let mut table = Table::new("images").with_rows(vec![
            Row::new("1").with_cell("ubuntu").with_class("category-project"),
            Row::new("2").with_cell("cirros").with_class("category-public"),
            Row::new("3").with_cell("fedora").with_class("category-public"),
        ]);
        table.filter_buttons = vec![
            FilterButton {
                value: "shared".into(),
                label: "Shared with Me (0)".into(),
                active: false,
            },
            FilterButton {
                value: "public".into(),
                label: "Public (2)".into(),
                active: false,
            },
            FilterButton {
                value: "project".into(),
                label: "Project (1)".into(),
                active: false,
            },
        ];
        table.empty_template = Some(Translations::default().empty_row_template());
        table
    }

    #[test]
    fn initial_category_skips_empty_buckets() {
        assert_eq!(initial_category(&filtered_table()).as_deref(), Some("public"));
        assert_eq!(initial_category(&Table::new("plain")), None);
    }

    #[test]
    fn category_hides_other_rows() {
        let translations = Translations::default();
        let mut table = filtered_table();
        select_category(&mut table, "public");
        narrow_to_category(&mut table, "public");
        assert_eq!(sync(&mut table, &translations), 2);
        assert!(table.row("1").map(|row| row.hidden).unwrap_or(false));
        assert!(table.filter_buttons[1].active);
        assert!(!table.filter_buttons[2].active);
        assert_eq!(table.count_text, "Displaying 2 items");

        narrow_to_category(&mut table, "shared");
        assert_eq!(sync(&mut table, &translations), 0);
        assert!(table.placeholder.is_some());
    }
}
