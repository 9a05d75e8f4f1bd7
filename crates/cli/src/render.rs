//! Terminal and JSON rendering of table pages.

use serde_json::{Map, Value as Json};
use tabula_api::User;
use tabula_core::{CellRenderer, ColumnSpec, PlainRenderer, Value};
use tabula_table::Table;

/// Cell text for the user table.
pub struct UserCells;

impl CellRenderer<User> for UserCells {
    fn render(&self, column: &ColumnSpec<User>, index: usize, row: &User) -> String {
        match column.id.as_str() {
            "number" => (index + 1).to_string(),
            "Profile Picture" => row.image.clone().unwrap_or_else(|| "-".into()),
            "role" => row.role().map(|r| r.display_name()).or_else(|| row.role.clone()).unwrap_or_else(|| "-".into()),
            _ => match column.value(row) {
                Value::Date(d) => d.format("%b %-d, %Y %H:%M").to_string(),
                Value::Null => "-".into(),
                _ => PlainRenderer.render(column, index, row),
            },
        }
    }
}

/// Rendered current page: header labels, column ids and one string per visible cell.
pub struct Grid {
    pub ids: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn grid<T, R: CellRenderer<T>>(table: &Table<T>, renderer: &R) -> Grid {
    let cols = table.visible_columns();
    let page = table.visible_rows();
    let rows = page
        .rows
        .iter()
        .map(|r| cols.iter().map(|c| renderer.render(c, r.index, r.row)).collect())
        .collect();
    Grid {
        ids: cols.iter().map(|c| c.id.clone()).collect(),
        headers: cols.iter().map(|c| c.meta.label.clone()).collect(),
        rows,
    }
}

/// Left-aligned columns separated by two spaces; each column as wide as its widest cell.
pub fn format_human(grid: &Grid) -> String {
    let widths: Vec<usize> = grid
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| grid.rows.iter().map(|r| r[i].chars().count()).chain([h.chars().count()]).max().unwrap_or(0))
        .collect();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let mut out = vec![line(&grid.headers.iter().map(|h| h.to_uppercase()).collect::<Vec<_>>())];
    out.extend(grid.rows.iter().map(|r| line(r)));
    out.join("\n")
}

/// One object per row keyed by column id.
pub fn rows_json(grid: &Grid) -> Vec<Json> {
    grid.rows
        .iter()
        .map(|r| {
            let obj: Map<String, Json> = grid.ids.iter().cloned().zip(r.iter().cloned().map(Json::String)).collect();
            Json::Object(obj)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_api::{identity::demo_users, user_columns};

    #[test]
    fn renders_numbers_roles_and_dates() {
        let mut t = Table::new(demo_users(), user_columns().unwrap());
        t.set_column_visibility("Profile Picture", false);
        t.set_column_visibility("Updated At", false);
        t.set_page_size(4);
        t.next_page();
        let g = grid(&t, &UserCells);
        assert_eq!(g.ids, vec!["number", "email", "name", "role", "Created At"]);
        assert_eq!(g.rows.len(), 4);
        assert_eq!(g.rows[0][0], "5");
        assert_eq!(g.rows[0][3], "User");
        assert_eq!(g.rows[1][3], "Admin");
    }

    #[test]
    fn human_output_aligns_columns() {
        let g = Grid {
            ids: vec!["a".into(), "b".into()],
            headers: vec!["No".into(), "Name".into()],
            rows: vec![vec!["1".into(), "Rose".into()], vec!["10".into(), "Li".into()]],
        };
        assert_eq!(format_human(&g), "NO  NAME\n1   Rose\n10  Li");
        let json = rows_json(&g);
        assert_eq!(json[1]["b"], "Li");
    }
}
