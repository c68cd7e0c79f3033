//! Percent progress for a pipeline run.

/// Receives integer percentages in `0..=100`
pub type ProgressSink = Box<dyn Fn(u8) + Send + Sync>;

/// Converts completed work units into percentages for a sink.
///
/// Reported values never decrease, stay below 100 until [`finish`] is
/// called, and a value is only sent when it changes.
///
/// [`finish`]: ProgressTracker::finish
pub struct ProgressTracker<'a> {
    sink: Option<&'a (dyn Fn(u8) + Send + Sync)>,
    total: f64,
    completed: f64,
    last: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(total_units: f64, sink: Option<&'a (dyn Fn(u8) + Send + Sync)>) -> Self {
        Self {
            sink,
            total: total_units.max(0.0),
            completed: 0.0,
            last: None,
        }
    }

    /// Report the starting value
    pub fn start(&mut self) {
        self.emit(0);
    }

    /// Mark `units` more work as done
    pub fn advance(&mut self, units: f64) {
        if units <= 0.0 {
            return;
        }
        self.completed = (self.completed + units).min(self.total);
        let percent = if self.total > 0.0 {
            ((self.completed / self.total) * 100.0).floor().min(99.0) as u8
        } else {
            0
        };
        self.emit(percent);
    }

    pub fn finish(&mut self) {
        self.completed = self.total;
        self.emit(100);
    }

    /// Last value sent, if any
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    fn emit(&mut self, percent: u8) {
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(sink) = self.sink {
            sink(percent);
        }
    }
}
