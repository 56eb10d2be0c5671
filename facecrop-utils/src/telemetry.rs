//! Scoped timing for the crop pipeline.
//!
//! A [`TimingGuard`] records when a stage started and, if telemetry is switched
//! on and the logger accepts the level, logs the elapsed time when it drops.
//! With telemetry off a guard costs one `Instant::now()`.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

/// Log target used for every timing record.
pub const TARGET: &str = "facecrop::telemetry";

static ENABLED: AtomicBool = AtomicBool::new(false);
static MAX_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Off as usize);

/// Logs the duration of a pipeline stage on drop.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    /// Returns `true` when the guard will log on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the clock without logging.
    pub fn finish(mut self) -> Duration {
        self.active = false;
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            log!(
                target: TARGET,
                self.level,
                "{} took {:.2?}",
                self.label,
                self.start.elapsed()
            );
        }
    }
}

/// Time a stage, honouring only the global telemetry switch.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(label, level, true)
}

/// Time a stage when `enabled` is set and the global switch allows `level`.
pub fn timing_guard_if(
    label: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    let active = enabled && allows(level) && log_enabled!(target: TARGET, level);
    TimingGuard {
        label: label.into(),
        level,
        start: Instant::now(),
        active,
    }
}

/// Switch telemetry on or off and set the most verbose level it records.
pub fn configure(enabled: bool, level: LevelFilter) {
    ENABLED.store(enabled, Ordering::Relaxed);
    MAX_LEVEL.store(level as usize, Ordering::Relaxed);
}

/// Whether a guard at `level` would currently be recorded.
pub fn allows(level: Level) -> bool {
    ENABLED.load(Ordering::Relaxed) && (level as usize) <= MAX_LEVEL.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_threshold_is_inclusive() {
        configure(true, LevelFilter::Debug);
        assert!(allows(Level::Info));
        assert!(allows(Level::Debug));
        assert!(!allows(Level::Trace));

        configure(false, LevelFilter::Trace);
        assert!(!allows(Level::Error));
    }

    #[test]
    fn finished_guard_reports_duration() {
        let guard = timing_guard_if("noop", Level::Debug, false);
        assert!(!guard.is_active());
        let elapsed = guard.finish();
        assert!(elapsed < Duration::from_secs(5));
    }
}
