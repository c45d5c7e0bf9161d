//! HTML table to header/row grid
//!
//! Rows and cells are laid out on an explicit grid so `colspan` and
//! `rowspan` land where a browser would draw them. Header rows (the `thead`,
//! or leading rows made only of `th`) are flattened per column by joining
//! the level labels with a space, so a "DERECHO MINERO" group over a
//! "Código Único" cell becomes `"DERECHO MINERO Código Único"`.

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::LazyLock;
use tracing::warn;

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table").expect("BUG: hardcoded selector 'table' is statically valid")
});

static TR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("tr").expect("BUG: hardcoded selector 'tr' is statically valid")
});

static CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("td, th").expect("BUG: hardcoded selector 'td, th' is statically valid")
});

/// Grid limits; portal tables are a few dozen rows at most
const MAX_GRID_ROWS: usize = 2000;
const MAX_GRID_COLS: usize = 100;
const MAX_SPAN: usize = 100;

/// A parsed table: one flattened label per column plus the body rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Distinct non-empty values of a column in first-seen order.
    /// `None` when the column is absent.
    #[must_use]
    pub fn distinct_values(&self, name: &str) -> Option<Vec<String>> {
        let index = self.column_index(name)?;
        let mut seen = HashSet::new();
        let values = self
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|value| !value.is_empty())
            .filter(|value| seen.insert(value.as_str()))
            .cloned()
            .collect();
        Some(values)
    }
}

struct RawCell {
    text: String,
    is_header: bool,
}

/// Spanned cells share one `Rc` across every slot they cover
type Grid = Vec<Vec<Option<Rc<RawCell>>>>;

/// Parse the first table in `html`
pub fn parse_table(html: &str) -> Result<ParsedTable> {
    let document = Html::parse_fragment(html);
    let table = document
        .select(&TABLE_SELECTOR)
        .next()
        .ok_or_else(|| anyhow!("No <table> element in results HTML"))?;
    Ok(table_from_element(&table))
}

/// Only rows owned by this table, not by tables nested inside it
fn own_rows<'a>(table: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    table
        .select(&TR_SELECTOR)
        .filter(|row| {
            row.ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == "table")
                .is_some_and(|owner| owner.id() == table.id())
        })
        .collect()
}

fn in_thead(row: &ElementRef) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|ancestor| ancestor.value().name() != "table")
        .any(|ancestor| ancestor.value().name() == "thead")
}

fn span(cell: &ElementRef, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .clamp(1, MAX_SPAN)
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn table_from_element(table: &ElementRef) -> ParsedTable {
    let rows = own_rows(table);
    if rows.is_empty() {
        return ParsedTable::default();
    }

    let grid = expand_grid(&rows);

    let thead_rows = rows.iter().take_while(|row| in_thead(row)).count();
    let header_rows = if thead_rows > 0 {
        thead_rows
    } else {
        grid.iter()
            .take_while(|row| !row.is_empty() && row.iter().flatten().all(|cell| cell.is_header))
            .count()
    };

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let headers = (0..width)
        .map(|col| flatten_header(&grid[..header_rows.min(grid.len())], col))
        .collect();

    let body = grid
        .iter()
        .skip(header_rows)
        .map(|row| {
            (0..width)
                .map(|col| {
                    row.get(col)
                        .and_then(Option::as_ref)
                        .map(|cell| cell.text.clone())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    ParsedTable {
        headers,
        rows: body,
    }
}

/// Join the label of every header level above `col`; repeats from a
/// rowspan collapse into one
fn flatten_header(header_grid: &[Vec<Option<Rc<RawCell>>>], col: usize) -> String {
    let mut labels: Vec<&str> = Vec::new();
    let mut previous: Option<&Rc<RawCell>> = None;
    for row in header_grid {
        let Some(Some(cell)) = row.get(col) else {
            continue;
        };
        if previous.is_some_and(|prev| Rc::ptr_eq(prev, cell)) {
            continue;
        }
        previous = Some(cell);
        if !cell.text.is_empty() {
            labels.push(&cell.text);
        }
    }
    labels.join(" ").trim().to_string()
}

/// Place every cell on the grid, expanding spans
fn expand_grid(rows: &[ElementRef]) -> Grid {
    let mut grid: Grid = Vec::new();
    let mut occupied: HashSet<(usize, usize)> = HashSet::new();

    for (row_idx, row) in rows.iter().enumerate() {
        if row_idx >= MAX_GRID_ROWS {
            warn!("Table exceeded {MAX_GRID_ROWS} rows, truncating");
            break;
        }
        while grid.len() <= row_idx {
            grid.push(Vec::new());
        }

        let mut col = 0;
        for cell in row.select(&CELL_SELECTOR) {
            // Cells of nested tables belong to those tables
            if cell
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|ancestor| ancestor.value().name() == "tr")
                .is_some_and(|owner| owner.id() != row.id())
            {
                continue;
            }

            while occupied.contains(&(row_idx, col)) {
                col += 1;
            }
            if col >= MAX_GRID_COLS {
                break;
            }

            let colspan = span(&cell, "colspan");
            let rowspan = span(&cell, "rowspan");
            let raw = Rc::new(RawCell {
                text: cell_text(&cell),
                is_header: cell.value().name() == "th",
            });

            for r in 0..rowspan {
                let target_row = row_idx + r;
                if target_row >= MAX_GRID_ROWS || target_row >= rows.len() {
                    break;
                }
                while grid.len() <= target_row {
                    grid.push(Vec::new());
                }
                for c in 0..colspan {
                    let target_col = col + c;
                    if target_col >= MAX_GRID_COLS {
                        break;
                    }
                    let target = &mut grid[target_row];
                    if target.len() <= target_col {
                        target.resize(target_col + 1, None);
                    }
                    target[target_col] = Some(Rc::clone(&raw));
                    occupied.insert((target_row, target_col));
                }
            }
            col += colspan;
        }
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    const REINFO_TABLE: &str = r#"
        <table id="stdregistro">
          <thead>
            <tr>
              <th rowspan="2">N°</th>
              <th rowspan="2">RUC</th>
              <th colspan="2">DERECHO MINERO</th>
              <th rowspan="2">ESTADO</th>
            </tr>
            <tr><th>Código Único</th><th>Nombre</th></tr>
          </thead>
          <tbody>
            <tr><td>1</td><td>20606564016</td><td>750012345</td><td>VETA UNO</td><td>VIGENTE</td></tr>
            <tr><td>2</td><td>20606564016</td><td>750012345</td><td>VETA UNO</td><td>VIGENTE</td></tr>
            <tr><td>3</td><td>20606564016</td><td> 010203404 </td><td>VETA DOS</td><td>VIGENTE</td></tr>
            <tr><td>4</td><td>20606564016</td><td></td><td>SIN CODIGO</td><td>VIGENTE</td></tr>
          </tbody>
        </table>"#;

    #[test]
    fn test_multi_level_headers_are_flattened() {
        let table = parse_table(REINFO_TABLE).expect("parse");
        assert_eq!(
            table.headers,
            vec![
                "N°",
                "RUC",
                "DERECHO MINERO Código Único",
                "DERECHO MINERO Nombre",
                "ESTADO"
            ]
        );
        assert_eq!(table.rows.len(), 4);
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let table = parse_table(REINFO_TABLE).expect("parse");
        assert_eq!(
            table.distinct_values("DERECHO MINERO Código Único"),
            Some(vec!["750012345".to_string(), "010203404".to_string()])
        );
        assert_eq!(table.distinct_values("No existe"), None);
    }

    #[test]
    fn test_leading_th_rows_without_thead() {
        let html = r#"<table>
            <tr><th>Mensaje</th></tr>
            <tr><td>No se encontraron registros</td></tr>
        </table>"#;
        let table = parse_table(html).expect("parse");
        assert_eq!(table.headers, vec!["Mensaje"]);
        assert_eq!(table.rows, vec![vec!["No se encontraron registros".to_string()]]);
    }

    #[test]
    fn test_body_rowspan_repeats_value() {
        let html = r#"<table>
            <tr><th>A</th><th>B</th></tr>
            <tr><td rowspan="2">x</td><td>1</td></tr>
            <tr><td>2</td></tr>
        </table>"#;
        let table = parse_table(html).expect("parse");
        assert_eq!(
            table.rows,
            vec![
                vec!["x".to_string(), "1".to_string()],
                vec!["x".to_string(), "2".to_string()]
            ]
        );
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert!(parse_table("<div>nothing</div>").is_err());
    }
}
