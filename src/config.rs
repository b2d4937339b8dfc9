/// Rows a windowed adapter keeps addressable behind its read/write position.
pub const DEFAULT_WINDOW_ROWS: usize = 8;

/// Rows a loopback queue holds before the producer blocks.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Tunables for the windowed adapters, the loopback queue and the transformer.
///
/// Passed at construction so tests can use deliberately small windows.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Look-back/look-ahead window of [`WindowedSource`](crate::WindowedSource)
    /// and [`TargetAdapter`](crate::TargetAdapter). Clamped to at least 1.
    pub window_rows: usize,
    /// Capacity of the loopback queue. Clamped to at least 1.
    pub queue_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_rows: DEFAULT_WINDOW_ROWS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl StreamConfig {
    pub fn with_window_rows(mut self, rows: usize) -> Self {
        self.window_rows = rows;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub(crate) fn window(&self) -> usize {
        self.window_rows.max(1)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}
