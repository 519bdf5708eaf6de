use crate::schema::TableInfo;

/// Select tables by exact name: keep `include` (when non-empty), then drop
/// `exclude`. Source order is preserved and nothing is copied.
pub fn filter_tables<'a>(
    tables: &'a [TableInfo],
    include: &[String],
    exclude: &[String],
) -> Vec<&'a TableInfo> {
    tables
        .iter()
        .filter(|table| include.is_empty() || include.iter().any(|name| *name == table.name))
        .filter(|table| !exclude.iter().any(|name| *name == table.name))
        .collect()
}
