use crate::model::{Placeholder, Table, STRIPE_CLASSES};
use crate::template::Translations;

/// Number of shown data rows; the placeholder is stored apart from the rows
/// and never counts.
pub fn visible_count(table: &Table) -> usize {
    table.visible_rows().count()
}

/// Recounts visible rows, offset by `delta`, and renders the localized count
/// into the table's header and footer slots.
pub fn update_footer_count(table: &mut Table, delta: i64, translations: &Translations) -> usize {
    let count = (visible_count(table) as i64 + delta).max(0) as usize;
    table.count_text = translations.displaying(count);
    count
}

/// Appends the "no results" row when nothing is visible and the table has a
/// template for it. At most one placeholder ever exists.
pub fn add_no_results_row(table: &mut Table) -> bool {
    if table.placeholder.is_some() || visible_count(table) > 0 {
        return false;
    }
    let template = match &table.empty_template {
        Some(template) => template,
        None => return false,
    };
    let colspan = table.colspan();
    table.placeholder = Some(Placeholder {
        colspan,
        html: template.render(colspan),
    });
    true
}

pub fn remove_no_results_row(table: &mut Table) -> bool {
    table.placeholder.take().is_some()
}

/// Re-applies zebra classes across the visible rows in display order.
pub fn restripe(table: &mut Table) {
    let mut index = 0;
    for row in table.rows.iter_mut() {
        for class in STRIPE_CLASSES {
            row.remove_class(class);
        }
        if row.hidden {
            continue;
        }
        row.add_class(STRIPE_CLASSES[index % 2]);
        index += 1;
    }
}

/// Brings count, placeholder and striping in line with the current
/// visibility of the rows. Returns the visible count.
pub fn sync(table: &mut Table, translations: &Translations) -> usize {
    remove_no_results_row(table);
    let count = update_footer_count(table, 0, translations);
    if count == 0 {
        add_no_results_row(table);
    }
    restripe(table);
    count
}
