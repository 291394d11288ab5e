/// Receives `(percent, label)` at every step boundary of a run; percent is within 0..=100.
///
/// Any `FnMut(f64, &str)` closure is a sink.
pub trait ProgressSink {
    fn on_progress(&mut self, percent: f64, label: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(f64, &str),
{
    fn on_progress(&mut self, percent: f64, label: &str) {
        self(percent, label)
    }
}

/// Percentage of `done` out of `total`, clamped to 0..=100; an empty run counts as complete.
pub fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

/// Maps a 0..=100 percentage onto the window `[offset, offset + span]`.
pub fn scale(percent: f64, offset: f64, span: f64) -> f64 {
    (offset + percent.clamp(0.0, 100.0) * span / 100.0).clamp(0.0, 100.0)
}

/// Sink that only logs; used when the caller has no UI to drive.
pub fn log_progress(percent: f64, label: &str) {
    tracing::info!(target: "finvault", event = "progress", percent = percent, label = label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: f64, label: &str| seen.push((p, label.to_string()));
            let sink: &mut dyn ProgressSink = &mut sink;
            sink.on_progress(50.0, "halfway");
        }
        assert_eq!(seen, vec![(50.0, "halfway".to_string())]);
    }

    #[test]
    fn percent_of_handles_empty_totals() {
        assert_eq!(percent_of(0, 0), 100.0);
        assert_eq!(percent_of(1, 4), 25.0);
        assert_eq!(percent_of(9, 4), 100.0);
    }

    #[test]
    fn scale_maps_into_window() {
        assert_eq!(scale(0.0, 0.0, 30.0), 0.0);
        assert_eq!(scale(100.0, 0.0, 30.0), 30.0);
        assert_eq!(scale(50.0, 30.0, 70.0), 65.0);
    }
}
