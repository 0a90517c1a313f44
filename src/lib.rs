pub mod analyzer;
pub mod config;
pub mod error;
pub mod frame;
pub mod source;

pub use analyzer::{
    average_luma, AnalysisRunner, AnalysisRunnerBuilder, FrameAnalyzer, LoggingObserver,
    LumaObserver, LumaSummary, LuminosityAnalyzer, RunnerStats, SummaryHandle, SummaryObserver,
};
pub use config::{AnalyzerConfig, LumaConfig, SourceConfig};
pub use error::{FrameFormatError, LumaError, Result};
pub use frame::{Frame, FrameFormat, FrameInfo, FrameRelease, Plane, PlaneLayout, LUMA_PLANE};
pub use source::{
    FramePool, FrameSource, PoolStats, SyntheticFrameSource, TestPattern, VecFrameSource,
};
