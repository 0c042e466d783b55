use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Client;
use sheetscroll::{
    config::KioskConfig,
    kiosk,
    render::{HtmlSurface, TerminalSurface},
};
use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Auto-scrolling kiosk display for a published CSV spreadsheet"
)]
struct Args {
    /// YAML file overriding the built-in settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write an HTML page here instead of drawing on the terminal
    #[arg(long)]
    html_out: Option<PathBuf>,

    /// Log destination while the terminal is in use
    #[arg(long, default_value = "sheetscroll.log")]
    log_file: PathBuf,

    /// Load once, write the page and exit (non-zero if no data arrived)
    #[arg(long, requires = "html_out")]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    // The terminal surface owns stdout/stderr, so logs go to a file there.
    let log_file = args.html_out.is_none().then_some(args.log_file.as_path());
    init_logging(log_file)?;
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        error!("panic: {}", info);
    }));

    // ─── 2) configuration ───────────────────────────────────────────
    let config = Arc::new(KioskConfig::load(args.config.as_deref())?);
    info!(
        url = %config.source.csv_url,
        proxies = config.source.proxies.len(),
        "config loaded"
    );
    let client = Client::new();

    // ─── 3) pick a surface and go ───────────────────────────────────
    match args.html_out {
        Some(out) => {
            let surface = HtmlSurface::new(config.clone()).with_output(&out);
            if args.once {
                if !kiosk::run_once(config, surface, client).await? {
                    bail!("no data loaded; wrote error page to {}", out.display());
                }
                info!(page = %out.display(), "wrote page");
                return Ok(());
            }
            kiosk::run(config, surface, client, ctrl_c()).await?;
        }
        None => {
            let surface = TerminalSurface::new(config.clone())?;
            kiosk::run(config, surface, client, ctrl_c()).await?;
        }
    }

    info!("all done");
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("listening for ctrl-c failed: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
