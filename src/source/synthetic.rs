use crate::config::SourceConfig;
use crate::error::Result;
use crate::frame::{Frame, LUMA_PLANE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::pool::FramePool;
use super::FrameSource;

/// Neutral chroma value (no color)
const CHROMA_NEUTRAL: u8 = 128;

/// Image content generated by [`SyntheticFrameSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPattern {
    /// Every luma sample set to the configured level
    Solid,
    /// Horizontal ramp from 0 at the left edge to 255 at the right edge
    Gradient,
    /// Uniform frames whose level rises by one per frame, wrapping at 255
    Ramp,
}

impl TestPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestPattern::Solid => "solid",
            TestPattern::Gradient => "gradient",
            TestPattern::Ramp => "ramp",
        }
    }

    /// Paint the pattern into `frame`; chroma planes are set to neutral
    pub fn fill(&self, frame: &mut Frame, level: u8) {
        let (id, width, height) = {
            let info = frame.info();
            (info.id, info.width as usize, info.height as usize)
        };

        for (index, plane) in frame.planes_mut().iter_mut().enumerate() {
            if index != LUMA_PLANE {
                plane.bytes_mut().fill(CHROMA_NEUTRAL);
                continue;
            }

            match self {
                TestPattern::Solid => plane.bytes_mut().fill(level),
                TestPattern::Ramp => {
                    let value = ((u64::from(level) + id) % 256) as u8;
                    plane.bytes_mut().fill(value);
                }
                TestPattern::Gradient => {
                    let row_stride = plane.row_stride();
                    let pixel_stride = plane.pixel_stride();
                    let span = width.saturating_sub(1).max(1);
                    let bytes = plane.bytes_mut();
                    for y in 0..height {
                        for x in 0..width {
                            if let Some(sample) = bytes.get_mut(y * row_stride + x * pixel_stride) {
                                *sample = (x * 255 / span) as u8;
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Frame source producing generated frames from a recycled buffer pool at a fixed rate
pub struct SyntheticFrameSource {
    config: SourceConfig,
    pool: FramePool,
    interval: Option<Interval>,
    next_id: u64,
}

impl SyntheticFrameSource {
    pub fn new(config: SourceConfig) -> Self {
        let (width, height) = config.resolution;
        let pool = FramePool::new(config.pool_size, width, height, config.format);

        info!(
            "Synthetic source: {}x{} {} @ {}fps, pattern {}, pool of {}",
            width,
            height,
            config.format,
            config.fps,
            config.pattern.as_str(),
            config.pool_size
        );

        Self {
            config,
            pool,
            interval: None,
            next_id: 0,
        }
    }

    /// Handle to the underlying buffer pool
    pub fn pool(&self) -> FramePool {
        self.pool.clone()
    }

    pub fn frames_produced(&self) -> u64 {
        self.next_id
    }

    fn frame_interval(&self) -> Duration {
        // tokio intervals reject a zero period
        Duration::from_micros((1_000_000 / u64::from(self.config.fps.max(1))).max(1))
    }
}

#[async_trait]
impl FrameSource for SyntheticFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.config.frame_limit {
            if self.next_id >= limit {
                debug!("Frame limit {} reached", limit);
                return Ok(None);
            }
        }

        let period = self.frame_interval();
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;

        let mut frame = self.pool.acquire(self.next_id).await;
        self.config.pattern.fill(&mut frame, self.config.level);
        self.next_id += 1;

        Ok(Some(frame))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

/// Frame source replaying a prepared sequence of frames
pub struct VecFrameSource {
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    pub fn new<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait]
impl FrameSource for VecFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
