//! Telemetry sinks for per-tick session statistics

use riposte_shared::Stats;

/// Receives a [`Stats`] sample after every tick
pub trait TelemetrySink: Send {
    fn record(&mut self, stats: &Stats);
}

impl<F: FnMut(&Stats) + Send> TelemetrySink for F {
    fn record(&mut self, stats: &Stats) {
        self(stats)
    }
}

/// Logs every sample at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&mut self, stats: &Stats) {
        tracing::debug!(
            frame = stats.current_frame,
            rollbacks = stats.rollback_count,
            delay = stats.frame_delay,
            predicted = stats.predicted_frames,
            resimulated = stats.resimulated_frames,
            "tick"
        );
    }
}
