// src/kiosk.rs

use anyhow::Result;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{error, info, warn};

use crate::config::KioskConfig;
use crate::csv::Table;
use crate::fetch::{FetchChain, FetchError, Fetched, Transport};
use crate::reload::ReloadTimer;
use crate::render::{render_table, Input, Surface, ERROR_MESSAGE};
use crate::scroll::{ScrollAnimator, ScrollTiming};

/// Display state: what is on the surface and where the scroll is.
pub struct Kiosk<S> {
    config: Arc<KioskConfig>,
    surface: S,
    animator: ScrollAnimator,
    table: Option<Table>,
    renders: u64,
}

impl<S: Surface> Kiosk<S> {
    pub fn new(config: Arc<KioskConfig>, surface: S) -> Self {
        let animator = ScrollAnimator::new(ScrollTiming::from_config(&config));
        Self {
            config,
            surface,
            animator,
            table: None,
            renders: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    /// Data currently on screen, `None` before the first load or after a failure.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Successful renders since construction.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Put a load result on the surface. `now` is elapsed time on the frame clock.
    pub fn apply(&mut self, result: Result<Fetched, FetchError>, now: Duration) -> Result<()> {
        match result {
            Ok(fetched) => {
                let rendered = render_table(&fetched.table, &self.config.columns);
                self.surface.replace(&rendered)?;
                self.animator.schedule(now);
                self.renders += 1;
                info!(
                    source = ?fetched.source,
                    rows = fetched.table.body().len(),
                    columns = fetched.table.column_count(),
                    fetched_at = %fetched.fetched_at,
                    "rendered"
                );
                self.table = Some(fetched.table);
            }
            Err(e) => {
                error!(error = %e, "showing error row");
                self.table = None;
                self.animator.reset();
                self.surface.show_error(ERROR_MESSAGE)?;
                self.surface.set_offset(0.0)?;
            }
        }
        Ok(())
    }

    /// Advance the animation to `now` and draw.
    pub fn frame(&mut self, now: Duration) -> Result<()> {
        let layout = self.surface.measure()?;
        let offset = self.animator.tick(now, &layout);
        self.surface.set_offset(offset)?;
        self.surface.present()
    }

    /// Begin a fresh scroll pass with new measurements, e.g. after a resize.
    pub fn restart_scroll(&mut self, now: Duration) -> Result<()> {
        if self.table.is_none() {
            return Ok(());
        }
        let layout = self.surface.measure()?;
        self.animator.restart(now, &layout);
        self.surface.set_offset(self.animator.offset())
    }

    /// Forget the data and stop scrolling; the next load starts from nothing.
    ///
    /// The surface keeps showing the old rows until that load lands.
    pub fn reinitialize(&mut self) {
        info!(renders = self.renders, "re-initializing");
        self.table = None;
        self.animator.reset();
    }
}

type LoadTask = JoinHandle<Result<Fetched, FetchError>>;

fn spawn_load<T>(mut chain: FetchChain<T>) -> LoadTask
where
    T: Transport + 'static,
{
    tokio::spawn(async move { chain.load().await })
}

async fn join_pending(pending: &mut Option<LoadTask>) -> Option<<LoadTask as Future>::Output> {
    match pending.as_mut() {
        Some(handle) => Some(handle.await),
        None => std::future::pending().await,
    }
}

/// Drive the kiosk until `shutdown` completes or the surface asks to quit.
///
/// Loads run on a spawned task and never block frames. Every load, including
/// the one after each reload, gets a fresh fetch chain starting at proxy 0.
pub async fn run<S, T, F>(
    config: Arc<KioskConfig>,
    surface: S,
    transport: T,
    shutdown: F,
) -> Result<()>
where
    S: Surface,
    T: Transport + Clone + 'static,
    F: Future<Output = ()>,
{
    let epoch = Instant::now();
    let mut kiosk = Kiosk::new(config.clone(), surface);
    let mut reload = ReloadTimer::arm(config.reload_interval());
    let mut pending = Some(spawn_load(FetchChain::from_config(
        transport.clone(),
        &config,
    )));

    let mut frames = time::interval(config.frame_interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(
        url = %config.source.csv_url,
        proxies = config.source.proxies.len(),
        reload_secs = config.reload_interval_secs,
        "kiosk started"
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            Some(joined) = join_pending(&mut pending) => {
                pending = None;
                match joined {
                    Ok(result) => kiosk.apply(result, epoch.elapsed())?,
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        error!(error = %e, "load task failed");
                        kiosk.apply(Err(FetchError::Exhausted { attempts: 0 }), epoch.elapsed())?;
                    }
                }
            }
            _ = reload.fired() => {
                if let Some(handle) = pending.take() {
                    warn!("load still in flight at reload, abandoning it");
                    handle.abort();
                }
                kiosk.reinitialize();
                pending = Some(spawn_load(FetchChain::from_config(transport.clone(), &config)));
                reload.rearm(Instant::now());
            }
            _ = frames.tick() => {
                let now = epoch.elapsed();
                match kiosk.surface_mut().poll_input()? {
                    Input::Quit => {
                        info!("quit requested");
                        break;
                    }
                    Input::Resized => kiosk.restart_scroll(now)?,
                    Input::None => {}
                }
                kiosk.frame(now)?;
            }
        }
    }

    if let Some(handle) = pending.take() {
        handle.abort();
    }
    Ok(())
}

/// Load once, put the result on `surface`, and report whether data arrived.
pub async fn run_once<S, T>(config: Arc<KioskConfig>, surface: S, transport: T) -> Result<bool>
where
    S: Surface,
    T: Transport,
{
    let mut chain = FetchChain::from_config(transport, &config);
    let result = chain.load().await;
    let ok = result.is_ok();
    let mut kiosk = Kiosk::new(config, surface);
    kiosk.apply(result, Duration::ZERO)?;
    Ok(ok)
}
