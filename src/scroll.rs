// src/scroll.rs

//! Continuous scroll through the body region.
//!
//! The animator never reads a clock. Callers pass the elapsed time since any
//! fixed epoch to [`ScrollAnimator::tick`] once per frame, together with the
//! current [`Layout`], and apply the returned offset to the surface.
//!
//! One cycle: scroll down at a fixed time per row, hold at the bottom for the
//! pause, jump back to the top, hold again, then measure afresh and restart.

use std::time::Duration;
use tracing::debug;

use crate::config::KioskConfig;
use crate::render::Layout;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTiming {
    pub seconds_per_row: f64,
    /// Hold at the bottom, and again at the top, of every cycle.
    pub pause: Duration,
    /// Wait after a render before the first measurement.
    pub settle: Duration,
}

impl ScrollTiming {
    pub fn from_config(config: &KioskConfig) -> Self {
        Self {
            seconds_per_row: config.seconds_per_row(),
            pause: config.scroll_pause(),
            settle: config.settle_delay(),
        }
    }
}

/// Geometry of one scroll pass, fixed when the cycle starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPlan {
    pub distance: f64,
    pub duration_ms: f64,
}

impl ScrollPlan {
    /// `None` when the body fits in the space below the header.
    pub fn measure(layout: &Layout, seconds_per_row: f64) -> Option<Self> {
        if layout.rows == 0 {
            return None;
        }
        let scrollable = layout.viewport_height - layout.header_height;
        let distance = layout.content_height - scrollable;
        if distance <= 0.0 {
            return None;
        }
        let average_row = layout.content_height / layout.rows as f64;
        let visible_rows = scrollable / average_row;
        let rows_to_scroll = layout.rows as f64 - visible_rows;
        Some(Self {
            distance,
            duration_ms: rows_to_scroll * seconds_per_row * 1000.0,
        })
    }

    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed.as_secs_f64() * 1000.0 / self.duration_ms).min(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Settling { until: Duration },
    Scrolling { started: Duration, plan: ScrollPlan },
    PausedAtBottom { until: Duration },
    PausedAtTop { until: Duration },
    Fitted,
}

/// Observable phase, for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Settling,
    Scrolling,
    PausedAtBottom,
    PausedAtTop,
    Fitted,
}

#[derive(Debug, Clone)]
pub struct ScrollAnimator {
    timing: ScrollTiming,
    state: State,
    offset: f64,
    cycles: u64,
}

impl ScrollAnimator {
    pub fn new(timing: ScrollTiming) -> Self {
        Self {
            timing,
            state: State::Idle,
            offset: 0.0,
            cycles: 0,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Completed down-scrolls since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Settling { .. } => Phase::Settling,
            State::Scrolling { .. } => Phase::Scrolling,
            State::PausedAtBottom { .. } => Phase::PausedAtBottom,
            State::PausedAtTop { .. } => Phase::PausedAtTop,
            State::Fitted => Phase::Fitted,
        }
    }

    /// Start after the settle delay, replacing whatever was pending.
    pub fn schedule(&mut self, now: Duration) {
        self.state = State::Settling {
            until: now + self.timing.settle,
        };
    }

    /// Measure `layout` and start a new pass immediately, replacing whatever was pending.
    pub fn restart(&mut self, now: Duration, layout: &Layout) {
        self.offset = 0.0;
        if layout.rows == 0 {
            self.state = State::Idle;
            return;
        }
        self.state = match ScrollPlan::measure(layout, self.timing.seconds_per_row) {
            Some(plan) => {
                debug!(
                    distance = plan.distance,
                    duration_ms = plan.duration_ms,
                    "scroll cycle"
                );
                State::Scrolling { started: now, plan }
            }
            None => {
                debug!(rows = layout.rows, "content fits, not scrolling");
                State::Fitted
            }
        };
    }

    /// Stop and return to the top.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.offset = 0.0;
    }

    /// Advance to `now` and return the offset to apply.
    ///
    /// `layout` is only read when a new pass starts.
    pub fn tick(&mut self, now: Duration, layout: &Layout) -> f64 {
        match self.state {
            State::Idle | State::Fitted => {}
            State::Settling { until } => {
                if now >= until {
                    self.restart(now, layout);
                }
            }
            State::Scrolling { started, plan } => {
                let progress = plan.progress(now.saturating_sub(started));
                if progress < 1.0 {
                    self.offset = -plan.distance * progress;
                } else {
                    self.offset = -plan.distance;
                    self.cycles += 1;
                    self.state = State::PausedAtBottom {
                        until: now + self.timing.pause,
                    };
                }
            }
            State::PausedAtBottom { until } => {
                if now >= until {
                    self.offset = 0.0;
                    self.state = State::PausedAtTop {
                        until: now + self.timing.pause,
                    };
                }
            }
            State::PausedAtTop { until } => {
                if now >= until {
                    self.restart(now, layout);
                }
            }
        }
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn timing() -> ScrollTiming {
        ScrollTiming {
            seconds_per_row: 0.5,
            pause: Duration::from_secs(2),
            settle: Duration::from_millis(100),
        }
    }

    /// 40 rows of 10 units under a 50-unit header in a 250-unit viewport.
    fn tall() -> Layout {
        Layout {
            content_height: 400.0,
            viewport_height: 250.0,
            header_height: 50.0,
            rows: 40,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn plan_matches_row_arithmetic() {
        let plan = ScrollPlan::measure(&tall(), 0.5).unwrap();
        assert_eq!(plan.distance, 200.0);
        // 40 rows, 20 visible, 20 to scroll at half a second each.
        assert_eq!(plan.duration_ms, 10_000.0);
        assert_eq!(plan.progress(ms(5_000)), 0.5);
        assert_eq!(plan.progress(ms(60_000)), 1.0);
    }

    #[test]
    fn content_that_fits_is_never_moved() {
        let short = Layout {
            content_height: 200.0,
            ..tall()
        };
        let mut a = ScrollAnimator::new(timing());
        a.schedule(Duration::ZERO);
        let mut now = Duration::ZERO;
        while now < Duration::from_secs(60) {
            assert_eq!(a.tick(now, &short), 0.0);
            now += FRAME;
        }
        assert_eq!(a.phase(), Phase::Fitted);
        assert_eq!(a.cycles(), 0);
    }

    #[test]
    fn empty_body_stays_idle() {
        let mut a = ScrollAnimator::new(timing());
        a.restart(Duration::ZERO, &Layout::default());
        assert_eq!(a.phase(), Phase::Idle);
        assert_eq!(a.tick(ms(500), &tall()), 0.0);
        assert_eq!(a.phase(), Phase::Idle);
    }

    #[test]
    fn settle_delay_precedes_first_measurement() {
        let mut a = ScrollAnimator::new(timing());
        a.schedule(ms(1_000));
        a.tick(ms(1_050), &tall());
        assert_eq!(a.phase(), Phase::Settling);
        a.tick(ms(1_100), &tall());
        assert_eq!(a.phase(), Phase::Scrolling);
        assert_eq!(a.offset(), 0.0);
    }

    #[test]
    fn full_cycle_down_pause_top_pause_restart() {
        let mut a = ScrollAnimator::new(timing());
        let layout = tall();
        a.restart(Duration::ZERO, &layout);

        let mut now = Duration::ZERO;
        let mut last = 0.0;
        while a.phase() == Phase::Scrolling {
            let offset = a.tick(now, &layout);
            assert!(offset <= last, "offset went back up: {} > {}", offset, last);
            assert!(offset >= -200.0);
            last = offset;
            now += FRAME;
        }
        assert_eq!(a.phase(), Phase::PausedAtBottom);
        assert_eq!(a.offset(), -200.0);
        assert_eq!(a.cycles(), 1);
        let bottom_at = now - FRAME;

        // Held at the bottom for the whole pause.
        assert_eq!(a.tick(bottom_at + ms(1_999), &layout), -200.0);
        assert_eq!(a.tick(bottom_at + ms(2_000), &layout), 0.0);
        assert_eq!(a.phase(), Phase::PausedAtTop);
        let top_at = bottom_at + ms(2_000);

        assert_eq!(a.tick(top_at + ms(1_000), &layout), 0.0);
        assert_eq!(a.phase(), Phase::PausedAtTop);
        a.tick(top_at + ms(2_000), &layout);
        assert_eq!(a.phase(), Phase::Scrolling);
        assert_eq!(a.offset(), 0.0);

        let offset = a.tick(top_at + ms(2_000) + ms(2_500), &layout);
        assert_eq!(offset, -50.0);
    }

    #[test]
    fn restart_measures_new_layout() {
        let mut a = ScrollAnimator::new(timing());
        a.restart(Duration::ZERO, &tall());
        a.tick(ms(10_000), &tall());
        a.tick(ms(12_000), &tall());
        assert_eq!(a.phase(), Phase::PausedAtTop);

        // Window grew while paused: the next pass finds nothing to scroll.
        let roomy = Layout {
            viewport_height: 1_000.0,
            ..tall()
        };
        a.tick(ms(14_000), &roomy);
        assert_eq!(a.phase(), Phase::Fitted);
        assert_eq!(a.offset(), 0.0);
    }

    #[test]
    fn restart_cancels_pending_pause() {
        let mut a = ScrollAnimator::new(timing());
        a.restart(Duration::ZERO, &tall());
        a.tick(ms(10_000), &tall());
        assert_eq!(a.phase(), Phase::PausedAtBottom);

        a.restart(ms(10_500), &tall());
        assert_eq!(a.phase(), Phase::Scrolling);
        assert_eq!(a.offset(), 0.0);
        // The old bottom deadline no longer applies.
        assert_eq!(a.tick(ms(12_500), &tall()), -40.0);
        assert_eq!(a.phase(), Phase::Scrolling);
    }

    #[test]
    fn reset_returns_to_top_and_stops() {
        let mut a = ScrollAnimator::new(timing());
        a.restart(Duration::ZERO, &tall());
        a.tick(ms(3_000), &tall());
        assert!(a.offset() < 0.0);
        a.reset();
        assert_eq!(a.offset(), 0.0);
        assert_eq!(a.tick(ms(4_000), &tall()), 0.0);
        assert_eq!(a.phase(), Phase::Idle);
    }

    #[test]
    fn non_positive_duration_jumps_straight_to_bottom() {
        let timing = ScrollTiming {
            seconds_per_row: -1.0,
            ..timing()
        };
        let plan = ScrollPlan::measure(&tall(), timing.seconds_per_row).unwrap();
        assert!(plan.duration_ms < 0.0);
        assert_eq!(plan.progress(Duration::ZERO), 1.0);

        let mut a = ScrollAnimator::new(timing);
        a.restart(Duration::ZERO, &tall());
        assert_eq!(a.tick(Duration::ZERO, &tall()), -200.0);
        assert_eq!(a.phase(), Phase::PausedAtBottom);
    }
}
