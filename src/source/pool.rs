use crate::frame::{Frame, FrameFormat, FrameInfo, FrameRelease, Plane};
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

/// Snapshot of frame pool usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub available: usize,
    pub acquired: u64,
    pub released: u64,
}

impl PoolStats {
    /// Frames handed out and not yet released
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

struct PoolShared {
    free: ArrayQueue<Vec<Plane>>,
    capacity: usize,
    width: u32,
    height: u32,
    format: FrameFormat,
    acquired: AtomicU64,
    released: AtomicU64,
    available: Notify,
}

impl FrameRelease for PoolShared {
    fn release(&self, info: &FrameInfo, planes: Vec<Plane>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if self.free.push(planes).is_err() {
            warn!("Frame pool full while releasing frame {}; dropping buffers", info.id);
        }
        trace!("Frame {} returned to pool", info.id);
        self.available.notify_one();
    }
}

/// Fixed set of frame buffers recycled between a source and its consumer.
///
/// Once every buffer is out, production stalls until a frame is released.
#[derive(Clone)]
pub struct FramePool {
    shared: Arc<PoolShared>,
}

impl FramePool {
    /// Create a pool of `capacity` buffers sized for `format` at `width`x`height`
    pub fn new(capacity: usize, width: u32, height: u32, format: FrameFormat) -> Self {
        if capacity == 0 {
            panic!("Frame pool capacity must be greater than 0");
        }

        let free: ArrayQueue<Vec<Plane>> = ArrayQueue::new(capacity);
        let layout = format.plane_layout(width, height);
        for _ in 0..capacity {
            let planes: Vec<Plane> = layout.iter().copied().map(Plane::allocate).collect();
            let _ = free.push(planes);
        }

        debug!(
            "Created frame pool with {} {} buffers of {}x{}",
            capacity, format, width, height
        );

        Self {
            shared: Arc::new(PoolShared {
                free,
                capacity,
                width,
                height,
                format,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                available: Notify::new(),
            }),
        }
    }

    /// Take a free buffer for frame `id`, or `None` if all buffers are out
    pub fn try_acquire(&self, id: u64) -> Option<Frame> {
        let planes = self.shared.free.pop()?;
        self.shared.acquired.fetch_add(1, Ordering::Relaxed);

        let info = FrameInfo::new(id, self.shared.width, self.shared.height, self.shared.format);
        let release: Arc<dyn FrameRelease> = self.shared.clone();
        Some(Frame::with_release(info, planes, release))
    }

    /// Take a free buffer, waiting for a release if none is available
    pub async fn acquire(&self, id: u64) -> Frame {
        loop {
            let notified = self.shared.available.notified();
            if let Some(frame) = self.try_acquire(id) {
                return frame;
            }
            trace!("Frame pool exhausted, waiting for release (frame {})", id);
            notified.await;
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.shared.capacity,
            available: self.shared.free.len(),
            acquired: self.shared.acquired.load(Ordering::Relaxed),
            released: self.shared.released.load(Ordering::Relaxed),
        }
    }
}
