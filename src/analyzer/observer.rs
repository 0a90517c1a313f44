use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Sink for luminosity values, invoked synchronously once per analyzed frame
pub trait LumaObserver: Send + Sync {
    fn on_luma(&self, luma: f64);
}

impl<F> LumaObserver for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_luma(&self, luma: f64) {
        self(luma)
    }
}

/// Observer that writes every value to the debug log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl LumaObserver for LoggingObserver {
    fn on_luma(&self, luma: f64) {
        debug!(luma, "Average luminosity: {}", luma);
    }
}

/// Running statistics over observed luminosity values
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LumaSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl LumaSummary {
    pub fn record(&mut self, luma: f64) {
        if self.count == 0 {
            self.min = luma;
            self.max = luma;
        } else {
            self.min = self.min.min(luma);
            self.max = self.max.max(luma);
        }
        self.count += 1;
        self.sum += luma;
    }

    /// Mean of all recorded values, `None` before the first one
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl Default for LumaSummary {
    fn default() -> Self {
        Self {
            count: 0,
            min: 0.0,
            max: 0.0,
            sum: 0.0,
        }
    }
}

/// Shared view of a [`LumaSummary`] updated by a [`SummaryObserver`]
#[derive(Debug, Clone, Default)]
pub struct SummaryHandle {
    inner: Arc<Mutex<LumaSummary>>,
}

impl SummaryHandle {
    pub fn snapshot(&self) -> LumaSummary {
        *self.inner.lock()
    }

    fn record(&self, luma: f64) {
        self.inner.lock().record(luma);
    }
}

/// Forwards to an inner observer after recording the value
pub struct SummaryObserver<O> {
    inner: O,
    summary: SummaryHandle,
}

impl<O: LumaObserver> SummaryObserver<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            summary: SummaryHandle::default(),
        }
    }

    pub fn handle(&self) -> SummaryHandle {
        self.summary.clone()
    }
}

impl<O: LumaObserver> LumaObserver for SummaryObserver<O> {
    fn on_luma(&self, luma: f64) {
        self.summary.record(luma);
        self.inner.on_luma(luma);
    }
}
