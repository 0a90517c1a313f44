mod luminosity;
mod observer;
mod runner;
#[cfg(test)]
mod tests;

pub use luminosity::{average_luma, FrameAnalyzer, LuminosityAnalyzer};
pub use observer::{LoggingObserver, LumaObserver, LumaSummary, SummaryHandle, SummaryObserver};
pub use runner::{AnalysisRunner, AnalysisRunnerBuilder, RunnerStats};
