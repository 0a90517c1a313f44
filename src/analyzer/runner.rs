use crate::config::AnalyzerConfig;
use crate::error::{LumaError, Result};
use crate::source::FrameSource;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::luminosity::{FrameAnalyzer, LuminosityAnalyzer};
use super::observer::{LumaObserver, LumaSummary, SummaryHandle, SummaryObserver};

/// Counters shared between the runner handle and its worker task
#[derive(Debug, Default)]
struct RunnerCounters {
    frames_analyzed: AtomicU64,
    format_errors: AtomicU64,
}

/// Clears the running flag when the worker exits, including by panic
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Snapshot of runner progress
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunnerStats {
    pub frames_analyzed: u64,
    pub format_errors: u64,
    /// Luminosity statistics, available when the runner built the analyzer itself
    pub luma: Option<LumaSummary>,
}

/// Drives a frame source into an analyzer on one dedicated worker task.
///
/// Frames are pulled strictly one at a time; the next frame is not requested
/// until `analyze` for the previous one has returned.
pub struct AnalysisRunner {
    cancellation_token: CancellationToken,
    is_running: Arc<AtomicBool>,
    counters: Arc<RunnerCounters>,
    summary: Option<SummaryHandle>,
    task: Option<JoinHandle<Result<()>>>,
}

impl AnalysisRunner {
    /// Start a luminosity analyzer around `observer`, keeping running statistics
    pub fn start<S, O>(source: S, observer: O, config: AnalyzerConfig) -> Self
    where
        S: FrameSource + 'static,
        O: LumaObserver + 'static,
    {
        let observer = SummaryObserver::new(observer);
        let summary = observer.handle();
        Self::spawn(
            source,
            LuminosityAnalyzer::new(observer),
            config,
            Some(summary),
        )
    }

    /// Start with a caller-provided analyzer
    pub fn start_with_analyzer<S, A>(source: S, analyzer: A, config: AnalyzerConfig) -> Self
    where
        S: FrameSource + 'static,
        A: FrameAnalyzer + 'static,
    {
        Self::spawn(source, analyzer, config, None)
    }

    fn spawn<S, A>(
        mut source: S,
        analyzer: A,
        config: AnalyzerConfig,
        summary: Option<SummaryHandle>,
    ) -> Self
    where
        S: FrameSource + 'static,
        A: FrameAnalyzer + 'static,
    {
        let cancellation_token = CancellationToken::new();
        let is_running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(RunnerCounters::default());

        let token = cancellation_token.clone();
        let running = Arc::clone(&is_running);
        let task_counters = Arc::clone(&counters);
        let task_summary = summary.clone();

        let task = tokio::spawn(async move {
            let _running = RunningGuard(running);
            info!("Analysis worker started for source '{}'", source.source_name());

            let result = loop {
                let next = tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Analysis worker cancelled");
                        break Ok(());
                    }
                    next = source.next_frame() => next,
                };

                let frame = match next {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        info!("Frame source '{}' finished", source.source_name());
                        break Ok(());
                    }
                    Err(e) => {
                        error!("Frame source '{}' failed: {}", source.source_name(), e);
                        break Err(e);
                    }
                };

                let frame_id = frame.id();
                match analyzer.analyze(frame) {
                    Ok(()) => {
                        let analyzed =
                            task_counters.frames_analyzed.fetch_add(1, Ordering::Relaxed) + 1;
                        log_summary(&config, analyzed, task_summary.as_ref());
                    }
                    Err(LumaError::FrameFormat(e)) => {
                        warn!("Skipping malformed frame {}: {}", frame_id, e);
                        task_counters.format_errors.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("Analysis of frame {} failed: {}", frame_id, e);
                        break Err(e);
                    }
                }
            };

            info!("Analysis worker stopped");
            result
        });

        Self {
            cancellation_token,
            is_running,
            counters,
            summary,
            task: Some(task),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Current progress
    pub fn stats(&self) -> RunnerStats {
        RunnerStats {
            frames_analyzed: self.counters.frames_analyzed.load(Ordering::Relaxed),
            format_errors: self.counters.format_errors.load(Ordering::Relaxed),
            luma: self.summary.as_ref().map(SummaryHandle::snapshot),
        }
    }

    /// Token that stops the worker when cancelled, for use from other tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Request the worker to stop before pulling its next frame
    pub fn stop(&self) {
        if self.cancellation_token.is_cancelled() {
            return;
        }
        info!("Stopping analysis runner");
        self.cancellation_token.cancel();
    }

    /// Wait for the worker to finish and return final statistics
    pub async fn join(mut self) -> Result<RunnerStats> {
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                LumaError::component("analysis_runner".to_string(), e.to_string())
            })??;
        }
        Ok(self.stats())
    }

    /// Stop the worker and wait for it
    pub async fn shutdown(self) -> Result<RunnerStats> {
        self.stop();
        self.join().await
    }
}

impl Drop for AnalysisRunner {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn log_summary(config: &AnalyzerConfig, analyzed: u64, summary: Option<&SummaryHandle>) {
    if config.summary_interval == 0 || analyzed % config.summary_interval != 0 {
        return;
    }

    if let Some(summary) = summary.map(SummaryHandle::snapshot) {
        info!(
            "Analyzed {} frames: luma min {:.2} max {:.2} mean {:.2}",
            analyzed,
            summary.min,
            summary.max,
            summary.mean().unwrap_or_default()
        );
    } else {
        info!("Analyzed {} frames", analyzed);
    }
}

/// Builder for [`AnalysisRunner`]
pub struct AnalysisRunnerBuilder<S, O> {
    source: Option<S>,
    observer: Option<O>,
    config: AnalyzerConfig,
}

impl<S, O> AnalysisRunnerBuilder<S, O>
where
    S: FrameSource + 'static,
    O: LumaObserver + 'static,
{
    pub fn new() -> Self {
        Self {
            source: None,
            observer: None,
            config: AnalyzerConfig::default(),
        }
    }

    pub fn source(mut self, source: S) -> Self {
        self.source = Some(source);
        self
    }

    pub fn observer(mut self, observer: O) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the runner; must be called within a tokio runtime
    pub fn start(self) -> Result<AnalysisRunner> {
        let source = self
            .source
            .ok_or_else(|| LumaError::system("Frame source must be specified"))?;
        let observer = self
            .observer
            .ok_or_else(|| LumaError::system("Luma observer must be specified"))?;

        Ok(AnalysisRunner::start(source, observer, self.config))
    }
}

impl<S, O> Default for AnalysisRunnerBuilder<S, O>
where
    S: FrameSource + 'static,
    O: LumaObserver + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
