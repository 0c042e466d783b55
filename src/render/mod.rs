// src/render/mod.rs

use anyhow::Result;

use crate::config::{Align, ColumnStyle};
use crate::csv::Table;

pub mod html;
pub mod terminal;

pub use html::HtmlSurface;
pub use terminal::TerminalSurface;

/// Shown in place of the body when every route to the data failed.
pub const ERROR_MESSAGE: &str =
    "Error loading data. All CORS proxies failed. Please check the CSV URL.";

/// One cell ready for a surface: text plus the styling for its column index.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub index: usize,
    pub text: String,
    pub class: String,
    pub width: Option<String>,
    pub align: Option<Align>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub header: Vec<RenderedCell>,
    pub body: Vec<Vec<RenderedCell>>,
}

/// Heights in surface units (pixels for HTML, lines for a terminal).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Layout {
    /// Height of the whole body region.
    pub content_height: f64,
    /// Height of the container holding header and body.
    pub viewport_height: f64,
    pub header_height: f64,
    /// Number of body rows.
    pub rows: usize,
}

/// What the surface saw from its user since the last poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    None,
    Quit,
    Resized,
}

/// A display with a header region and a scrollable body region.
pub trait Surface {
    /// Replace both regions with `table`.
    fn replace(&mut self, table: &RenderedTable) -> Result<()>;

    /// Replace the body with a single row spanning every column.
    fn show_error(&mut self, message: &str) -> Result<()>;

    fn measure(&mut self) -> Result<Layout>;

    /// Vertical offset of the body; zero or negative.
    fn set_offset(&mut self, offset: f64) -> Result<()>;

    /// Flush the current frame.
    fn present(&mut self) -> Result<()> {
        Ok(())
    }

    fn poll_input(&mut self) -> Result<Input> {
        Ok(Input::None)
    }
}

/// Build header and body cells from `table`, styling column `i` from `columns[i]`.
pub fn render_table(table: &Table, columns: &[ColumnStyle]) -> RenderedTable {
    RenderedTable {
        header: render_row(table.header(), columns),
        body: table
            .body()
            .iter()
            .map(|row| render_row(row, columns))
            .collect(),
    }
}

fn render_row(row: &[String], columns: &[ColumnStyle]) -> Vec<RenderedCell> {
    row.iter()
        .enumerate()
        .map(|(index, text)| {
            let style = columns.get(index);
            RenderedCell {
                index,
                text: text.clone(),
                class: format!("column{} align{}", index, index),
                width: style.and_then(|s| s.width.clone()),
                align: style.and_then(|s| s.align),
            }
        })
        .collect()
}
