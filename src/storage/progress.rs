use tokio::time::{Duration, Instant};

/// Snapshot of a transfer after a part completes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub total_bytes: u64,
    pub bytes_transferred: u64,
    pub bytes_per_second: f64,
    pub percent_complete: f32,
    pub estimated_time_remaining: Duration,
}

/// Counters for one upload, owned by the pipeline invocation that drives it.
#[derive(Debug)]
pub struct TransferSession {
    total_bytes: u64,
    bytes_transferred: u64,
    start_time: Instant,
}

impl TransferSession {
    pub fn start(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            bytes_transferred: 0,
            start_time: Instant::now(),
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Adds `bytes` to the running total and returns the updated snapshot.
    pub fn record(&mut self, bytes: u64) -> ProgressStats {
        self.bytes_transferred = (self.bytes_transferred + bytes).min(self.total_bytes);
        self.snapshot()
    }

    pub fn snapshot(&self) -> ProgressStats {
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let bytes_per_second = if elapsed_secs > 0.0 {
            self.bytes_transferred as f64 / elapsed_secs
        } else {
            0.0
        };

        let percent_complete = if self.total_bytes == 0 {
            100.0
        } else {
            (self.bytes_transferred as f32 / self.total_bytes as f32) * 100.0
        };

        let remaining_bytes = self.total_bytes - self.bytes_transferred;
        let estimated_time_remaining = if bytes_per_second > 0.0 {
            Duration::from_secs_f64(remaining_bytes as f64 / bytes_per_second)
        } else {
            Duration::from_secs(0)
        };

        ProgressStats {
            total_bytes: self.total_bytes,
            bytes_transferred: self.bytes_transferred,
            bytes_per_second,
            percent_complete,
            estimated_time_remaining,
        }
    }
}

/// Binary units, two decimals trimmed: `0 B`, `512 B`, `1.5 KB`, `12.25 MB`.
pub fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes <= 0.0 {
        return "0 B".to_string();
    }

    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

pub trait ProgressFormatter {
    fn format_progress(&self) -> String;
    fn format_speed(&self) -> String;
    fn format_time_remaining(&self) -> String;
}

impl ProgressFormatter for ProgressStats {
    fn format_progress(&self) -> String {
        format!(
            "{:.0}% ({} / {})",
            self.percent_complete,
            format_bytes(self.bytes_transferred as f64),
            format_bytes(self.total_bytes as f64)
        )
    }

    fn format_speed(&self) -> String {
        format!("{}/s", format_bytes(self.bytes_per_second))
    }

    fn format_time_remaining(&self) -> String {
        let secs = self.estimated_time_remaining.as_secs_f64();
        if secs >= 3600.0 {
            format!("{:.0}h remaining", secs / 3600.0)
        } else if secs >= 60.0 {
            format!("{:.0}m remaining", secs / 60.0)
        } else {
            format!("{:.0}s remaining", secs)
        }
    }
}
