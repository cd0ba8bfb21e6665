//! Footer printed after a result set

use std::time::Duration;

/// Statistics formatter for statement execution
pub struct StatsFormatter {
    /// Show execution time
    show_time: bool,
}

impl StatsFormatter {
    /// Create a new statistics formatter
    ///
    /// # Arguments
    /// * `show_time` - Append elapsed time to the row count
    pub fn new(show_time: bool) -> Self {
        Self { show_time }
    }

    /// Format the footer, e.g. `3 rows (0.012 sec)`
    pub fn format(&self, total_rows: usize, elapsed: Duration) -> String {
        let count = match total_rows {
            1 => "1 row".to_string(),
            n => format!("{n} rows"),
        };
        if self.show_time {
            format!("{count} ({:.3} sec)", elapsed.as_secs_f64())
        } else {
            count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_formatter() {
        let formatter = StatsFormatter::new(true);
        assert_eq!(formatter.format(3, Duration::from_millis(150)), "3 rows (0.150 sec)");
        assert_eq!(StatsFormatter::new(false).format(1, Duration::ZERO), "1 row");
    }
}
