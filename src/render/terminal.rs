// src/render/terminal.rs

use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::{
    io::{self, Stdout, Write},
    sync::Arc,
    time::Duration,
};

use super::{Input, Layout, RenderedCell, RenderedTable, Surface};
use crate::config::{parse_leading_float, Align, ColumnStyle, KioskConfig};

/// Weight for columns whose width is missing or not numeric.
const DEFAULT_WEIGHT: f64 = 150.0;

/// Title line plus the rule under it.
const HEADER_LINES: u16 = 2;

const SHADE: Color = Color::Rgb {
    r: 0x26,
    g: 0x26,
    b: 0x26,
};

/// Full-screen table on the controlling terminal. Restores the terminal on drop.
pub struct TerminalSurface {
    config: Arc<KioskConfig>,
    stdout: Stdout,
    size: (u16, u16),
    header: Vec<RenderedCell>,
    body: Vec<Vec<RenderedCell>>,
    error: Option<String>,
    offset: f64,
    drawn: Option<usize>,
}

impl TerminalSurface {
    pub fn new(config: Arc<KioskConfig>) -> Result<Self> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode().context("enabling raw mode")?;
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)
            .context("entering alternate screen")?;
        let size = terminal::size().context("reading terminal size")?;
        Ok(Self {
            config,
            stdout,
            size,
            header: Vec::new(),
            body: Vec::new(),
            error: None,
            offset: 0.0,
            drawn: None,
        })
    }

    fn first_visible_row(&self) -> usize {
        (-self.offset).max(0.0).floor() as usize
    }

    fn column_count(&self) -> usize {
        self.body
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }

    fn draw(&mut self) -> Result<()> {
        let (width, height) = self.size;
        let widths = column_widths(width, self.column_count(), &self.config.columns);
        queue!(self.stdout, Clear(ClearType::All))?;

        if !self.header.is_empty() {
            queue!(self.stdout, cursor::MoveTo(0, 0), SetAttribute(Attribute::Bold))?;
            queue!(self.stdout, Print(format_row(&self.header, &widths)))?;
            queue!(
                self.stdout,
                SetAttribute(Attribute::Reset),
                cursor::MoveTo(0, 1),
                Print("─".repeat(width as usize))
            )?;
        }
        let top = if self.header.is_empty() { 0 } else { HEADER_LINES };

        if let Some(message) = &self.error {
            queue!(
                self.stdout,
                cursor::MoveTo(0, top),
                SetForegroundColor(Color::Red),
                Print(fit(message, width as usize, Align::Center)),
                ResetColor
            )?;
        } else {
            let first = self.first_visible_row();
            let visible = height.saturating_sub(top) as usize;
            for (line, (index, row)) in self
                .body
                .iter()
                .enumerate()
                .skip(first)
                .take(visible)
                .enumerate()
            {
                queue!(self.stdout, cursor::MoveTo(0, top + line as u16))?;
                if index % 2 == 1 {
                    queue!(self.stdout, SetBackgroundColor(SHADE))?;
                }
                queue!(self.stdout, Print(format_row(row, &widths)), ResetColor)?;
            }
        }
        self.stdout.flush()?;
        Ok(())
    }
}

impl Surface for TerminalSurface {
    fn replace(&mut self, table: &RenderedTable) -> Result<()> {
        self.header = table.header.clone();
        self.body = table.body.clone();
        self.error = None;
        self.drawn = None;
        Ok(())
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.body.clear();
        self.error = Some(message.to_string());
        self.offset = 0.0;
        self.drawn = None;
        Ok(())
    }

    fn measure(&mut self) -> Result<Layout> {
        let rows = if self.error.is_some() { 1 } else { self.body.len() };
        Ok(Layout {
            content_height: rows as f64,
            viewport_height: self.size.1 as f64,
            header_height: if self.header.is_empty() {
                0.0
            } else {
                HEADER_LINES as f64
            },
            rows,
        })
    }

    fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    /// Redraws only when the content or the first visible row changed.
    fn present(&mut self) -> Result<()> {
        let first = self.first_visible_row();
        if self.drawn == Some(first) {
            return Ok(());
        }
        self.draw()?;
        self.drawn = Some(first);
        Ok(())
    }

    fn poll_input(&mut self) -> Result<Input> {
        let mut input = Input::None;
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                        return Ok(Input::Quit);
                    }
                }
                Event::Resize(w, h) => {
                    self.size = (w, h);
                    self.drawn = None;
                    input = Input::Resized;
                }
                _ => {}
            }
        }
        Ok(input)
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = execute!(
            self.stdout,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Share `total` cells between `count` columns in proportion to their CSS widths.
pub fn column_widths(total: u16, count: usize, columns: &[ColumnStyle]) -> Vec<u16> {
    if count == 0 {
        return Vec::new();
    }
    let weights: Vec<f64> = (0..count)
        .map(|i| {
            columns
                .get(i)
                .and_then(|c| c.width.as_deref())
                .and_then(parse_leading_float)
                .filter(|w| *w > 0.0)
                .unwrap_or(DEFAULT_WEIGHT)
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    let mut widths: Vec<u16> = weights
        .iter()
        .map(|w| (total as f64 * w / sum).floor() as u16)
        .collect();
    let used: u16 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last += total.saturating_sub(used);
    }
    widths
}

fn format_row(cells: &[RenderedCell], widths: &[u16]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| {
            let align = cell.align.unwrap_or(Align::Left);
            fit(&cell.text, *w as usize, align)
        })
        .collect()
}

/// Pad or truncate `text` to exactly `width` characters, keeping one cell of gutter.
pub fn fit(text: &str, width: usize, align: Align) -> String {
    if width == 0 {
        return String::new();
    }
    let room = width.saturating_sub(1).max(1);
    let shown: String = text.chars().take(room).collect();
    let len = shown.chars().count();
    let pad = width - len;
    let (left, right) = match align {
        Align::Left => (0, pad),
        Align::Right => (pad.saturating_sub(1), pad - pad.saturating_sub(1)),
        Align::Center => (pad / 2, pad - pad / 2),
    };
    format!("{}{}{}", " ".repeat(left), shown, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(widths: &[&str]) -> Vec<ColumnStyle> {
        widths
            .iter()
            .map(|w| ColumnStyle {
                width: Some(w.to_string()),
                align: None,
            })
            .collect()
    }

    #[test]
    fn widths_follow_css_proportions() {
        let widths = column_widths(100, 2, &styled(&["300px", "100px"]));
        assert_eq!(widths, vec![75, 25]);
    }

    #[test]
    fn widths_always_fill_the_screen() {
        let columns = KioskConfig::default().columns;
        for total in [37u16, 80, 133, 200] {
            for count in 1..=14 {
                let widths = column_widths(total, count, &columns);
                assert_eq!(widths.len(), count);
                assert_eq!(widths.iter().sum::<u16>(), total);
            }
        }
    }

    #[test]
    fn unstyled_columns_get_default_weight() {
        let widths = column_widths(60, 3, &styled(&["150px", "auto"]));
        assert_eq!(widths, vec![20, 20, 20]);
        assert!(column_widths(60, 0, &[]).is_empty());
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit("ab", 6, Align::Left), "ab    ");
        assert_eq!(fit("ab", 6, Align::Center), "  ab  ");
        assert_eq!(fit("ab", 6, Align::Right), "   ab ");
        assert_eq!(fit("abcdefgh", 5, Align::Left), "abcd ");
        assert_eq!(fit("ab", 0, Align::Center), "");
        assert_eq!(fit("é—x", 4, Align::Left).chars().count(), 4);
    }
}
