// src/render/html.rs

use anyhow::{Context, Result};
use chrono::Utc;
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

use super::{Layout, RenderedCell, RenderedTable, Surface};
use crate::config::{KioskConfig, MAX_COLUMNS};

/// Surface backed by HTML fragments, optionally mirrored to a page on disk.
pub struct HtmlSurface {
    config: Arc<KioskConfig>,
    out: Option<PathBuf>,
    header: String,
    body: Vec<String>,
    offset: f64,
    /// Whole-pixel offset in the page last written to disk.
    written_px: Option<i64>,
}

impl HtmlSurface {
    pub fn new(config: Arc<KioskConfig>) -> Self {
        Self {
            config,
            out: None,
            header: String::new(),
            body: Vec::new(),
            offset: 0.0,
            written_px: None,
        }
    }

    /// Rewrite the page at `path` after every content change, and whenever
    /// the scroll offset moves by a whole pixel.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = Some(path.into());
        self
    }

    /// Contents of `thead#tableHeader`.
    pub fn header_html(&self) -> &str {
        &self.header
    }

    /// One `<tr>` per body row.
    pub fn body_rows(&self) -> &[String] {
        &self.body
    }

    pub fn body_html(&self) -> String {
        self.body.concat()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Complete document: style variables, table regions, refresh interval.
    pub fn page(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(
            html,
            "<meta http-equiv=\"refresh\" content=\"{}\">",
            self.config.reload_interval_secs
        );
        let _ = writeln!(
            html,
            "<meta name=\"generated\" content=\"{}\">",
            Utc::now().to_rfc3339()
        );
        html.push_str("<style>\n:root {\n");
        for (name, value) in self.config.style_variables() {
            let _ = writeln!(html, "  {}: {};", name, escape(&value));
        }
        html.push_str("}\n</style>\n");
        if let Some(sheet) = &self.config.style.stylesheet {
            let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape(sheet));
        }
        html.push_str("</head>\n<body>\n<div class=\"tableContainer\">\n<table>\n");
        let _ = writeln!(html, "<thead id=\"tableHeader\">{}</thead>", self.header);
        let _ = writeln!(
            html,
            "<tbody id=\"tableBody\" class=\"scrollableBody\" style=\"transform: translateY({}px);\">{}</tbody>",
            self.offset,
            self.body_html()
        );
        html.push_str("</table>\n</div>\n</body>\n</html>\n");
        html
    }

    fn flush_page(&mut self) -> Result<()> {
        let Some(path) = &self.out else {
            return Ok(());
        };
        write_atomically(path, &self.page())?;
        self.written_px = Some(self.offset.round() as i64);
        debug!(path = %path.display(), rows = self.body.len(), "wrote page");
        Ok(())
    }
}

impl Surface for HtmlSurface {
    fn replace(&mut self, table: &RenderedTable) -> Result<()> {
        self.header = row_html("th", &table.header);
        self.body = table.body.iter().map(|row| row_html("td", row)).collect();
        self.offset = 0.0;
        self.flush_page()
    }

    fn show_error(&mut self, message: &str) -> Result<()> {
        self.body = vec![format!(
            "<tr><td colspan=\"{}\" style=\"text-align: center; color: red;\">{}</td></tr>",
            MAX_COLUMNS,
            escape(message)
        )];
        self.offset = 0.0;
        self.flush_page()
    }

    fn measure(&mut self) -> Result<Layout> {
        let v = &self.config.viewport;
        Ok(Layout {
            content_height: self.body.len() as f64 * v.row_height_px,
            viewport_height: v.height_px,
            header_height: if self.header.is_empty() {
                0.0
            } else {
                v.header_height_px
            },
            rows: self.body.len(),
        })
    }

    fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.offset = offset;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if self.written_px == Some(self.offset.round() as i64) {
            return Ok(());
        }
        self.flush_page()
    }
}

fn row_html(tag: &str, cells: &[RenderedCell]) -> String {
    let mut tr = String::from("<tr>");
    for cell in cells {
        let mut style = String::new();
        if let Some(w) = &cell.width {
            let _ = write!(style, "width: {};", escape(w));
        }
        if let Some(a) = cell.align {
            if !style.is_empty() {
                style.push(' ');
            }
            let _ = write!(style, "text-align: {};", a.as_str());
        }
        let _ = write!(tr, "<{} class=\"{}\"", tag, cell.class);
        if !style.is_empty() {
            let _ = write!(tr, " style=\"{}\"", style);
        }
        let _ = write!(tr, ">{}</{}>", escape(&cell.text), tag);
    }
    tr.push_str("</tr>");
    tr
}

/// Escape text for element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Write to a sibling temp file and rename over `path`, so readers never see half a page.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("html.tmp");
    fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::parse_table;
    use crate::render::{render_table, ERROR_MESSAGE};
    use scraper::{Html, Selector};
    use tempfile::tempdir;

    fn surface() -> HtmlSurface {
        HtmlSurface::new(Arc::new(KioskConfig::default()))
    }

    fn render(surface: &mut HtmlSurface, csv: &str) {
        let config = KioskConfig::default();
        let table = parse_table(csv).unwrap();
        surface
            .replace(&render_table(&table, &config.columns))
            .unwrap();
    }

    fn count(doc: &Html, selector: &str) -> usize {
        doc.select(&Selector::parse(selector).unwrap()).count()
    }

    #[test]
    fn replace_builds_header_and_body_rows() {
        let mut s = surface();
        render(&mut s, "Name,Score\nAda,10\nBob,7\n");

        assert_eq!(
            s.header_html(),
            "<tr><th class=\"column0 align0\" style=\"width: 300px; text-align: center;\">Name</th>\
             <th class=\"column1 align1\" style=\"width: 280px; text-align: center;\">Score</th></tr>"
        );
        assert_eq!(s.body_rows().len(), 2);

        let doc = Html::parse_document(&s.page());
        assert_eq!(count(&doc, "thead#tableHeader th"), 2);
        assert_eq!(count(&doc, "tbody#tableBody tr"), 2);
        assert_eq!(count(&doc, "div.tableContainer table"), 1);
    }

    #[test]
    fn replace_discards_previous_content() {
        let mut s = surface();
        render(&mut s, "a\n1\n2\n3\n");
        render(&mut s, "b\n9\n");
        assert_eq!(s.body_rows().len(), 1);
        assert!(s.header_html().contains(">b</th>"));
    }

    #[test]
    fn error_row_replaces_body_only() {
        let mut s = surface();
        render(&mut s, "Name,Score\nAda,10\nBob,7\n");
        s.set_offset(-25.0).unwrap();
        s.show_error(ERROR_MESSAGE).unwrap();

        assert_eq!(s.body_rows().len(), 1);
        assert_eq!(s.offset(), 0.0);
        let doc = Html::parse_document(&s.page());
        assert_eq!(count(&doc, "tbody#tableBody tr"), 1);
        assert_eq!(count(&doc, "tbody#tableBody td[colspan=\"12\"]"), 1);
        assert!(!s.body_html().contains("Ada"));
        assert_eq!(count(&doc, "thead#tableHeader th"), 2);
    }

    #[test]
    fn text_is_escaped() {
        let mut s = surface();
        render(&mut s, "<b>head</b>\nfish & chips\n");
        assert!(s.header_html().contains("&lt;b&gt;head&lt;/b&gt;"));
        assert!(s.body_html().contains("fish &amp; chips"));
    }

    #[test]
    fn page_carries_style_variables_and_offset() {
        let mut s = surface();
        render(&mut s, "a\n1\n");
        s.set_offset(-12.5).unwrap();
        let page = s.page();
        assert!(page.contains("--scrollSpeed: 12s;"));
        assert!(page.contains("--column0Width: 300px;"));
        assert!(page.contains("content=\"3600\""));
        assert!(page.contains("translateY(-12.5px)"));
    }

    #[test]
    fn measure_uses_configured_metrics() {
        let mut s = surface();
        render(&mut s, "h\n1\n2\n3\n");
        let layout = s.measure().unwrap();
        assert_eq!(layout.rows, 3);
        assert_eq!(layout.content_height, 150.0);
        assert_eq!(layout.viewport_height, 1080.0);
        assert_eq!(layout.header_height, 60.0);
    }

    #[test]
    fn writes_page_to_disk_on_every_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kiosk").join("index.html");
        let mut s = surface().with_output(&path);

        render(&mut s, "Name\nAda\n");
        let first = fs::read_to_string(&path).unwrap();
        assert!(first.contains("<td class=\"column0 align0\""));

        s.show_error(ERROR_MESSAGE).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert!(second.contains("All CORS proxies failed"));
        assert!(!second.contains(">Ada<"));
        assert!(!path.with_extension("html.tmp").exists());
    }

    #[test]
    fn present_writes_offset_once_per_whole_pixel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.html");
        let mut s = surface().with_output(&path);
        render(&mut s, "h
1
2
");

        s.set_offset(-40.0).unwrap();
        s.present().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("translateY(-40px)"));

        // Sub-pixel movement leaves the file alone.
        s.set_offset(-40.3).unwrap();
        s.present().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("translateY(-40px)"));

        s.set_offset(-41.0).unwrap();
        s.present().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("translateY(-41px)"));
    }

    #[test]
    fn new_content_starts_at_the_top() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.html");
        let mut s = surface().with_output(&path);
        render(&mut s, "h
1
2
");
        s.set_offset(-75.0).unwrap();
        s.present().unwrap();

        render(&mut s, "h
3
4
");
        assert_eq!(s.offset(), 0.0);
        assert!(fs::read_to_string(&path).unwrap().contains("translateY(0px)"));
    }
}
