use crate::error::{FrameFormatError, Result};
use crate::frame::{Frame, LUMA_PLANE};
use tracing::trace;

use super::observer::LumaObserver;

/// Capability of consuming frames one at a time and returning promptly
pub trait FrameAnalyzer: Send {
    /// Analyze and release one frame. The frame is released on every path.
    fn analyze(&self, frame: Frame) -> Result<()>;
}

/// Arithmetic mean of all samples, `None` for an empty plane
pub fn average_luma(samples: &[u8]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sum: u64 = samples.iter().map(|&sample| u64::from(sample)).sum();
    Some(sum as f64 / samples.len() as f64)
}

/// Reports the mean brightness of each frame's luma plane to an observer
pub struct LuminosityAnalyzer<O> {
    observer: O,
}

impl<O: LumaObserver> LuminosityAnalyzer<O> {
    pub fn new(observer: O) -> Self {
        Self { observer }
    }
}

impl<O: LumaObserver> FrameAnalyzer for LuminosityAnalyzer<O> {
    fn analyze(&self, frame: Frame) -> Result<()> {
        // Early returns and observer panics release through the frame's drop guard
        let plane = frame
            .plane(LUMA_PLANE)
            .ok_or(FrameFormatError::MissingPlane { index: LUMA_PLANE })?;
        let luma = average_luma(plane.bytes())
            .ok_or(FrameFormatError::EmptyPlane { index: LUMA_PLANE })?;

        trace!("Frame {} luma {:.3} over {} samples", frame.id(), luma, plane.len());
        self.observer.on_luma(luma);

        frame.close();
        Ok(())
    }
}
