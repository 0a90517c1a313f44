use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

/// Index of the luma (brightness) plane in every supported format
pub const LUMA_PLANE: usize = 0;

/// Pixel layout of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameFormat {
    /// Planar YUV 4:2:0 - full resolution Y plane followed by quarter resolution U and V planes
    Yuv420,
    /// Single 8-bit grayscale plane
    Gray8,
}

/// Geometry of a single plane within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub len: usize,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl FrameFormat {
    /// Number of planes carried by the format
    pub fn plane_count(&self) -> usize {
        match self {
            FrameFormat::Yuv420 => 3,
            FrameFormat::Gray8 => 1,
        }
    }

    /// Plane geometry for a frame of the given size. Plane 0 is always luma.
    pub fn plane_layout(&self, width: u32, height: u32) -> Vec<PlaneLayout> {
        let (w, h) = (width as usize, height as usize);
        let luma = PlaneLayout {
            len: w * h,
            row_stride: w,
            pixel_stride: 1,
        };

        match self {
            FrameFormat::Gray8 => vec![luma],
            FrameFormat::Yuv420 => {
                let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
                let chroma = PlaneLayout {
                    len: cw * ch,
                    row_stride: cw,
                    pixel_stride: 1,
                };
                vec![luma, chroma, chroma]
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameFormat::Yuv420 => "yuv420",
            FrameFormat::Gray8 => "gray8",
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contiguous block of 8-bit samples
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    row_stride: usize,
    pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Tightly packed plane with a single row
    pub fn packed(data: Vec<u8>) -> Self {
        let len = data.len();
        Self::new(data, len, 1)
    }

    /// Zeroed plane matching the given layout
    pub fn allocate(layout: PlaneLayout) -> Self {
        Self::new(vec![0u8; layout.len], layout.row_stride, layout.pixel_stride)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }
}

/// Metadata describing a captured frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    /// Unique frame identifier, increasing per source
    pub id: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
}

impl FrameInfo {
    pub fn new(id: u64, width: u32, height: u32, format: FrameFormat) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            width,
            height,
            format,
        }
    }
}

/// Completion acknowledgement sent back to whoever produced a frame.
///
/// Receives the plane buffers back so they can be recycled.
pub trait FrameRelease: Send + Sync {
    fn release(&self, info: &FrameInfo, planes: Vec<Plane>);
}

/// Handle to one captured image.
///
/// A frame created with [`Frame::with_release`] signals its release hook
/// exactly once: on [`Frame::close`] or when dropped, whichever happens
/// first. Dropping during a panic unwind still releases.
pub struct Frame {
    info: FrameInfo,
    planes: Vec<Plane>,
    release: Option<Arc<dyn FrameRelease>>,
}

impl Frame {
    /// Create a frame with no release hook
    pub fn new(info: FrameInfo, planes: Vec<Plane>) -> Self {
        Self {
            info,
            planes,
            release: None,
        }
    }

    /// Create a frame that reports back to `release` when done
    pub fn with_release(
        info: FrameInfo,
        planes: Vec<Plane>,
        release: Arc<dyn FrameRelease>,
    ) -> Self {
        Self {
            info,
            planes,
            release: Some(release),
        }
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn id(&self) -> u64 {
        self.info.id
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn planes_mut(&mut self) -> &mut [Plane] {
        &mut self.planes
    }

    /// Release the frame now instead of waiting for drop
    pub fn close(mut self) {
        self.signal_release();
    }

    fn signal_release(&mut self) {
        if let Some(release) = self.release.take() {
            trace!("Releasing frame {}", self.info.id);
            let planes = std::mem::take(&mut self.planes);
            release.release(&self.info, planes);
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.signal_release();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("info", &self.info)
            .field("planes", &self.planes.len())
            .field("hooked", &self.release.is_some())
            .finish()
    }
}
