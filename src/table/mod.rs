//! Borderless text rendering of tabular macro results

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};

use crate::store::ResultSet;

/// Engine type names rendered right-aligned
const NUMERIC_TYPES: &[&str] = &[
    "TINYINT",
    "SMALLINT",
    "INTEGER",
    "BIGINT",
    "HUGEINT",
    "UTINYINT",
    "USMALLINT",
    "UINTEGER",
    "UBIGINT",
    "FLOAT",
    "DOUBLE",
    "DECIMAL",
];

/// Whether a column of this type is right-aligned.
///
/// Parameterized tags such as `DECIMAL(18,3)` are matched on their base name.
pub fn is_numeric_type(type_tag: &str) -> bool {
    let base = type_tag
        .split('(')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    NUMERIC_TYPES.contains(&base.as_str())
}

/// Render a result as an aligned grid inside `<pre class="duckbox">`.
///
/// Header row, one blank row, then data rows. NULL renders empty.
pub fn format_table(result: &ResultSet) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled);

    table.set_header(
        result
            .columns
            .iter()
            .map(|column| Cell::new(&column.name).set_alignment(CellAlignment::Left)),
    );

    let width = result.columns.len();
    table.add_row(vec![Cell::new(""); width]);
    for row in &result.rows {
        table.add_row(row.iter().map(|value| Cell::new(value.to_string())));
    }

    for (i, column) in result.columns.iter().enumerate() {
        if is_numeric_type(&column.type_tag) {
            if let Some(col) = table.column_mut(i) {
                col.set_cell_alignment(CellAlignment::Right);
            }
        }
    }

    let grid = if width == 0 {
        String::new()
    } else {
        table
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!("<pre class=\"duckbox\">\n{}\n</pre>", grid)
}
