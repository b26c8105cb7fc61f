use std::time::{Duration, Instant};

use crate::scan::{LineBuffer, LineScanner};
use crate::stream::SessionRegistry;

/// Main server state shared across all handlers
pub struct AppState {
    pub scanner: LineScanner,
    pub registry: SessionRegistry,
    pub line_interval: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(buffer: LineBuffer, line_interval: Duration) -> Self {
        Self {
            scanner: LineScanner::new(buffer),
            registry: SessionRegistry::new(),
            line_interval,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
