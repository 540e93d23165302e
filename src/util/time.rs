//! Run timing
//!
//! Each participant times itself independently: there is no shared clock and
//! no synchronization between participants' timers.
//!
//! Two clocks are available:
//!
//! - **Wall**: monotonic wall-clock time (`std::time::Instant`)
//! - **Cpu**: CPU time consumed by the whole process
//!   (`clock_gettime(CLOCK_PROCESS_CPUTIME_ID)`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Which clock a [`Stopwatch`] reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ClockKind {
    #[default]
    Wall,
    Cpu,
}

impl fmt::Display for ClockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockKind::Wall => f.write_str("wall"),
            ClockKind::Cpu => f.write_str("cpu"),
        }
    }
}

/// CPU time consumed by this process so far
///
/// Returns `Duration::ZERO` if the clock cannot be read.
pub fn process_cpu_time() -> Duration {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    if rc != 0 {
        return Duration::ZERO;
    }
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Wall(Instant),
    Cpu(Duration),
}

/// Running timer started at a fixed point
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    origin: Origin,
}

impl Stopwatch {
    /// Start a stopwatch on the given clock
    pub fn start(clock: ClockKind) -> Self {
        let origin = match clock {
            ClockKind::Wall => Origin::Wall(Instant::now()),
            ClockKind::Cpu => Origin::Cpu(process_cpu_time()),
        };
        Self { origin }
    }

    pub fn clock(&self) -> ClockKind {
        match self.origin {
            Origin::Wall(_) => ClockKind::Wall,
            Origin::Cpu(_) => ClockKind::Cpu,
        }
    }

    /// Time elapsed since `start`
    pub fn elapsed(&self) -> Duration {
        match self.origin {
            Origin::Wall(start) => start.elapsed(),
            Origin::Cpu(start) => process_cpu_time().saturating_sub(start),
        }
    }
}

/// Run `action` and return its result with the time it took
///
/// # Examples
///
/// ```
/// use pquad::util::time::{measure, ClockKind};
///
/// let (sum, elapsed) = measure(ClockKind::Wall, || (1..=10u64).sum::<u64>());
/// assert_eq!(sum, 55);
/// assert!(elapsed.as_secs() < 1);
/// ```
pub fn measure<T, F>(clock: ClockKind, action: F) -> (T, Duration)
where
    F: FnOnce() -> T,
{
    let stopwatch = Stopwatch::start(clock);
    let result = action();
    (result, stopwatch.elapsed())
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pquad::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}us", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wall_stopwatch_advances() {
        let stopwatch = Stopwatch::start(ClockKind::Wall);
        thread::sleep(Duration::from_millis(10));
        assert!(stopwatch.elapsed() >= Duration::from_millis(10));
        assert_eq!(stopwatch.clock(), ClockKind::Wall);
    }

    #[test]
    fn test_cpu_clock_counts_work() {
        let (value, elapsed) = measure(ClockKind::Cpu, || {
            let mut acc = 0.0f64;
            for i in 0..2_000_000u64 {
                acc += (i as f64).sqrt();
            }
            acc
        });
        assert!(value > 0.0);
        assert!(elapsed > Duration::ZERO);
    }

    #[test]
    fn test_measure_returns_result() {
        let (value, elapsed) = measure(ClockKind::Wall, || {
            thread::sleep(Duration::from_millis(5));
            42
        });
        assert_eq!(value, 42);
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.50ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
    }
}
