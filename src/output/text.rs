//! Human-readable console output
//!
//! The per-participant lines are diagnostic only; with several participants
//! sharing a terminal they interleave in whatever order the processes print.

use crate::compute::RemainderPolicy;
use crate::distributed::group::ParticipantContext;
use crate::output::json::RunSummary;
use crate::util::time::format_duration;
use std::time::Duration;

/// Line every participant prints once its partial result is known
pub fn partial_line(ctx: &ParticipantContext, value: f64) -> String {
    format!(
        "Process {} / {} has the partial result of {:.6}",
        ctx.id() + 1,
        ctx.group_size(),
        value
    )
}

/// Coordinator's running total before anything is received
pub fn seed_line(value: f64) -> String {
    format!("integral = {:.6}", value)
}

/// Coordinator's running total after one receive
pub fn running_total_line(total: f64) -> String {
    format!("integral (Master) = {:.6}", total)
}

/// Worker's line after sending its partial result
pub fn sent_line(ctx: &ParticipantContext, value: f64) -> String {
    format!("integral (Process {}) = {:.6}", ctx.id(), value)
}

/// Elapsed time of one participant
pub fn duration_line(ctx: &ParticipantContext, elapsed: Duration) -> String {
    format!("duration (Process {}) = {:.6}", ctx.id(), elapsed.as_secs_f64())
}

/// Print the coordinator's end-of-run summary
pub fn print_summary(summary: &RunSummary) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Integrand:     {} over {}", summary.integrand, summary.interval);
    println!("Participants:  {}", summary.group_size);
    println!("Steps:         {}", summary.steps);
    if summary.dropped_steps > 0 {
        println!("  Dropped:     {} (not divisible by {}, remainder policy: {})",
                 summary.dropped_steps, summary.group_size, summary.remainder);
    }
    if summary.remainder == RemainderPolicy::AbsorbLast {
        println!("Remainder:     {} (last participant takes N mod P extra increments)", summary.remainder);
    }
    println!("Aggregation:   {}", summary.mode);
    println!("Elapsed ({}): {}", summary.clock,
             format_duration(Duration::from_secs_f64(summary.elapsed_secs.max(0.0))));
    println!("Result:        {:.15}", summary.value);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_lines() {
        let ctx = ParticipantContext::new(2, 4).unwrap();

        assert_eq!(partial_line(&ctx, 0.25), "Process 3 / 4 has the partial result of 0.250000");
        assert_eq!(sent_line(&ctx, 0.25), "integral (Process 2) = 0.250000");
        assert_eq!(duration_line(&ctx, Duration::from_millis(1250)), "duration (Process 2) = 1.250000");
    }

    #[test]
    fn test_coordinator_lines() {
        assert_eq!(seed_line(0.382683), "integral = 0.382683");
        assert_eq!(running_total_line(1.0), "integral (Master) = 1.000000");
    }
}
