// src/csv.rs

/// One parsed line: cell values in column order.
pub type Row = Vec<String>;

/// Header row followed by data rows. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// `None` when there is nothing to show, so renderers never see an empty table.
    pub fn new(rows: Vec<Row>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    pub fn header(&self) -> &Row {
        &self.rows[0]
    }

    pub fn body(&self) -> &[Row] {
        &self.rows[1..]
    }

    /// Implied by the header; data rows may be ragged.
    pub fn column_count(&self) -> usize {
        self.header().len()
    }
}

/// Split `text` into rows of trimmed fields.
///
/// Quotes toggle whether a comma separates fields and are dropped from the
/// output. There is no `""` unescaping and no multi-line fields; lines that are
/// blank after trimming are skipped.
pub fn parse_csv(text: &str) -> Vec<Row> {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

/// [`parse_csv`] into a [`Table`], `None` if no rows survived.
pub fn parse_table(text: &str) -> Option<Table> {
    Table::new(parse_csv(text))
}

fn parse_line(line: &str) -> Row {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut inside_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => inside_quotes = !inside_quotes,
            ',' if !inside_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}
