use std::time::Duration;

/// Summary statistics over recent inter-tick intervals.
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

/// Bounded ring of inter-tick intervals for loop diagnostics. The driver
/// records one interval per tick; `stats` summarizes the window.
#[derive(Debug, Clone)]
pub struct FrameMonitor {
    intervals: Vec<Duration>,
    max_samples: usize,
}

impl FrameMonitor {
    pub fn new(max_samples: usize) -> Self {
        Self {
            intervals: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record_frame(&mut self, d: Duration) {
        if self.intervals.len() >= self.max_samples {
            self.intervals.remove(0);
        }
        self.intervals.push(d);
    }

    pub fn frame_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn stats(&self) -> FrameStats {
        let times: Vec<f64> = self
            .intervals
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        if times.is_empty() {
            return FrameStats {
                average_frame_time_ns: 0.0,
                jitter_ns: 0.0,
                min_frame_time_ns: 0.0,
                max_frame_time_ns: 0.0,
                effective_fps: 0.0,
            };
        }
        let sum: f64 = times.iter().sum();
        let avg = sum / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        FrameStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new(1000)
    }
}
