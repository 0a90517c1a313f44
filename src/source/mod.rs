mod pool;
mod synthetic;

use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;

pub use pool::{FramePool, PoolStats};
pub use synthetic::{SyntheticFrameSource, TestPattern, VecFrameSource};

/// Producer of camera frames, consumed one frame at a time
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream has ended
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Name of this source for logging
    fn source_name(&self) -> &str;
}
