// src/config.rs

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};
use url::Url;

/// Published Google Sheets export used when nothing else is configured.
static DEFAULT_CSV_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vRrQmSEotq71FqYpE7oxahUwUt4OV_fouWiz33QKJPUECgZC_h_LT033MZ7I3_8ipYpIt3d3vlzStxS/pub?gid=0&single=true&output=csv";

/// Relays tried in order; each expects the percent-encoded target appended.
static DEFAULT_PROXIES: &[&str] = &[
    "https://api.allorigins.win/raw?url=",
    "https://corsproxy.io/?",
    "https://api.codetabs.com/v1/proxy?quest=",
];

static DEFAULT_COLUMN_WIDTHS: &[&str] = &[
    "300px", "280px", "150px", "360px", "150px", "360px", "150px", "150px", "150px", "150px",
    "150px", "150px",
];

/// Hard cap on configurable columns; also the span of the error row.
pub const MAX_COLUMNS: usize = 12;

/// Used when the per-row scroll speed is unset, unparseable or zero.
pub const DEFAULT_SECONDS_PER_ROW: f64 = 20.0;

/// Environment override for the CSV source.
pub const CSV_URL_ENV: &str = "SHEETSCROLL_CSV_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

/// Width (any CSS length) and alignment for one column index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColumnStyle {
    pub width: Option<String>,
    pub align: Option<Align>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub csv_url: String,
    pub proxies: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            csv_url: DEFAULT_CSV_URL.to_string(),
            proxies: DEFAULT_PROXIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Exported as `--scrollSpeed`; the animator times itself per row.
    pub speed_secs: u64,
    /// Pause at the bottom and again at the top of every cycle.
    pub delay_secs: u64,
    /// Raw style value, read like CSS `parseFloat` (`"1.5s"` is 1.5).
    pub seconds_per_row: Option<String>,
    /// Delay between a render and the first measurement.
    pub settle_ms: u64,
    pub frame_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            speed_secs: 12,
            delay_secs: 2,
            seconds_per_row: None,
            settle_ms: 100,
            frame_ms: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub row_color: String,
    pub row_alt: String,
    pub header_font: String,
    pub header_size: String,
    pub header_color: String,
    pub content_font: String,
    pub content_size: String,
    pub content_color: String,
    /// External stylesheet linked from the HTML page.
    pub stylesheet: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            row_color: "#00000050".to_string(),
            row_alt: "#0000002c".to_string(),
            header_font: "Arial, sans-serif".to_string(),
            header_size: "3.1em".to_string(),
            header_color: "#000".to_string(),
            content_font: "Arial, sans-serif".to_string(),
            content_size: "2.7em".to_string(),
            content_color: "#000000".to_string(),
            stylesheet: None,
        }
    }
}

/// Pixel metrics the HTML surface measures with, since it has no layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub height_px: f64,
    pub header_height_px: f64,
    pub row_height_px: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            height_px: 1080.0,
            header_height_px: 60.0,
            row_height_px: 50.0,
        }
    }
}

/// Everything the kiosk needs, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    pub source: SourceConfig,
    pub reload_interval_secs: u64,
    pub scroll: ScrollConfig,
    pub style: StyleConfig,
    pub columns: Vec<ColumnStyle>,
    pub viewport: ViewportConfig,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            reload_interval_secs: 3600,
            scroll: ScrollConfig::default(),
            style: StyleConfig::default(),
            columns: DEFAULT_COLUMN_WIDTHS
                .iter()
                .map(|w| ColumnStyle {
                    width: Some(w.to_string()),
                    align: Some(Align::Center),
                })
                .collect(),
            viewport: ViewportConfig::default(),
        }
    }
}

impl KioskConfig {
    /// Load from an optional YAML file, apply the environment override and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        if let Ok(url) = env::var(CSV_URL_ENV) {
            if !url.trim().is_empty() {
                config.source.csv_url = url.trim().to_string();
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.source.csv_url)
            .with_context(|| format!("invalid csv_url {:?}", self.source.csv_url))?;
        for (i, proxy) in self.source.proxies.iter().enumerate() {
            Url::parse(proxy).with_context(|| format!("invalid proxy #{} {:?}", i, proxy))?;
        }
        if self.columns.len() > MAX_COLUMNS {
            bail!(
                "{} columns configured, at most {} are supported",
                self.columns.len(),
                MAX_COLUMNS
            );
        }
        if self.reload_interval_secs == 0 {
            bail!("reload_interval_secs must be positive");
        }
        if self.scroll.frame_ms == 0 {
            bail!("scroll.frame_ms must be positive");
        }
        Ok(())
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_secs(self.scroll.delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.scroll.settle_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.scroll.frame_ms)
    }

    pub fn seconds_per_row(&self) -> f64 {
        parse_seconds_per_row(self.scroll.seconds_per_row.as_deref())
    }

    /// `(name, value)` pairs for the HTML `:root` block, in a stable order.
    pub fn style_variables(&self) -> Vec<(String, String)> {
        let s = &self.style;
        let mut vars = vec![
            ("--scrollSpeed".to_string(), format!("{}s", self.scroll.speed_secs)),
            ("--scrollDelay".to_string(), format!("{}s", self.scroll.delay_secs)),
            ("--rowCol".to_string(), s.row_color.clone()),
            ("--rowAlt".to_string(), s.row_alt.clone()),
            ("--tableHeaderFont".to_string(), s.header_font.clone()),
            ("--tableHeaderSize".to_string(), s.header_size.clone()),
            ("--tableHeaderColor".to_string(), s.header_color.clone()),
            ("--tableContentFont".to_string(), s.content_font.clone()),
            ("--tableContentSize".to_string(), s.content_size.clone()),
            ("--tableContentColor".to_string(), s.content_color.clone()),
        ];
        if let Some(raw) = &self.scroll.seconds_per_row {
            vars.push(("--scrollSpeedPerRowSeconds".to_string(), raw.clone()));
        }
        for (i, col) in self.columns.iter().enumerate() {
            if let Some(w) = &col.width {
                vars.push((format!("--column{}Width", i), w.clone()));
            }
        }
        for (i, col) in self.columns.iter().enumerate() {
            if let Some(a) = col.align {
                vars.push((format!("--column{}Align", i), a.as_str().to_string()));
            }
        }
        vars
    }
}

static LEADING_FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("leading float regex")
});

/// Leading numeric prefix of `raw`, like JavaScript `parseFloat`.
pub fn parse_leading_float(raw: &str) -> Option<f64> {
    LEADING_FLOAT
        .find(raw.trim())
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Seconds each row takes to scroll past; zero and garbage fall back to the default.
pub fn parse_seconds_per_row(raw: Option<&str>) -> f64 {
    match raw.and_then(parse_leading_float) {
        Some(v) if v != 0.0 && v.is_finite() => v,
        _ => DEFAULT_SECONDS_PER_ROW,
    }
}
