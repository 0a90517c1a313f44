use super::*;
use crate::config::{AnalyzerConfig, SourceConfig};
use crate::error::{FrameFormatError, LumaError};
use crate::frame::{Frame, FrameFormat, FrameInfo, FrameRelease, Plane};
use crate::source::{FrameSource, SyntheticFrameSource, TestPattern, VecFrameSource};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct ReleaseCounter {
    released: AtomicUsize,
}

impl FrameRelease for ReleaseCounter {
    fn release(&self, _info: &FrameInfo, _planes: Vec<Plane>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl ReleaseCounter {
    fn count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

fn tracked_frame(id: u64, planes: Vec<Plane>, counter: &Arc<ReleaseCounter>) -> Frame {
    let hook: Arc<dyn FrameRelease> = counter.clone();
    Frame::with_release(FrameInfo::new(id, 0, 0, FrameFormat::Gray8), planes, hook)
}

fn luma_frame(id: u64, samples: Vec<u8>, counter: &Arc<ReleaseCounter>) -> Frame {
    tracked_frame(id, vec![Plane::packed(samples)], counter)
}

fn recording_analyzer() -> (
    LuminosityAnalyzer<impl LumaObserver>,
    Arc<Mutex<Vec<f64>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let analyzer = LuminosityAnalyzer::new(move |luma: f64| sink.lock().push(luma));
    (analyzer, seen)
}

#[test]
fn test_average_luma() {
    assert_eq!(average_luma(&[10, 20, 30, 40]), Some(25.0));
    assert_eq!(average_luma(&[7]), Some(7.0));
    assert_eq!(average_luma(&[]), None);
}

#[test]
fn test_mean_of_known_plane() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    analyzer
        .analyze(luma_frame(1, vec![10, 20, 30, 40], &counter))
        .unwrap();

    assert_eq!(*seen.lock(), vec![25.0]);
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_extreme_planes() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    for len in [1usize, 3, 640 * 480] {
        analyzer.analyze(luma_frame(0, vec![0u8; len], &counter)).unwrap();
        analyzer.analyze(luma_frame(1, vec![255u8; len], &counter)).unwrap();
    }

    assert_eq!(*seen.lock(), vec![0.0, 255.0, 0.0, 255.0, 0.0, 255.0]);
    assert_eq!(counter.count(), 6);
}

#[test]
fn test_mean_matches_sum_over_len() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    // Uneven, non-repeating content
    let samples: Vec<u8> = (0..1001u32).map(|i| ((i * 37 + 11) % 256) as u8).collect();
    let expected =
        samples.iter().map(|&b| u64::from(b)).sum::<u64>() as f64 / samples.len() as f64;

    analyzer.analyze(luma_frame(0, samples, &counter)).unwrap();

    let reported = seen.lock()[0];
    assert!((reported - expected).abs() < 1e-9);
}

#[test]
fn test_only_luma_plane_is_read() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    let planes = vec![
        Plane::packed(vec![100; 16]),
        Plane::packed(vec![0; 4]),
        Plane::packed(vec![255; 4]),
    ];
    analyzer.analyze(tracked_frame(0, planes, &counter)).unwrap();

    assert_eq!(*seen.lock(), vec![100.0]);
}

#[test]
fn test_empty_plane_is_format_error() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    let err = analyzer
        .analyze(luma_frame(3, Vec::new(), &counter))
        .unwrap_err();

    assert!(err.is_frame_format());
    assert!(matches!(
        err,
        LumaError::FrameFormat(FrameFormatError::EmptyPlane { index: 0 })
    ));
    assert!(seen.lock().is_empty());
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_missing_plane_is_format_error() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    let err = analyzer
        .analyze(tracked_frame(4, Vec::new(), &counter))
        .unwrap_err();

    assert!(matches!(
        err,
        LumaError::FrameFormat(FrameFormatError::MissingPlane { index: 0 })
    ));
    assert!(seen.lock().is_empty());
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_panicking_observer_still_releases() {
    let counter = Arc::new(ReleaseCounter::default());
    let analyzer = LuminosityAnalyzer::new(|_luma: f64| panic!("observer failure"));
    let frame = luma_frame(0, vec![1, 2, 3], &counter);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = analyzer.analyze(frame);
    }));

    assert!(result.is_err());
    assert_eq!(counter.count(), 1);
}

#[test]
fn test_sequential_frames_preserve_order() {
    let counter = Arc::new(ReleaseCounter::default());
    let (analyzer, seen) = recording_analyzer();

    // A large frame followed by a tiny one
    analyzer
        .analyze(luma_frame(1, vec![200; 1920 * 1080], &counter))
        .unwrap();
    analyzer.analyze(luma_frame(2, vec![10], &counter)).unwrap();

    assert_eq!(*seen.lock(), vec![200.0, 10.0]);
    assert_eq!(counter.count(), 2);
}

#[test]
fn test_summary_observer() {
    let observer = SummaryObserver::new(LoggingObserver);
    let handle = observer.handle();
    assert_eq!(handle.snapshot().mean(), None);

    for luma in [10.0, 40.0, 25.0] {
        observer.on_luma(luma);
    }

    let summary = handle.snapshot();
    assert_eq!(summary.count, 3);
    assert_eq!(summary.min, 10.0);
    assert_eq!(summary.max, 40.0);
    assert_eq!(summary.mean(), Some(25.0));
}

#[tokio::test]
async fn test_runner_analyzes_every_frame_in_order() {
    let counter = Arc::new(ReleaseCounter::default());
    let frames = vec![
        luma_frame(0, vec![10, 20, 30, 40], &counter),
        luma_frame(1, Vec::new(), &counter),
        luma_frame(2, vec![255; 8], &counter),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let runner = AnalysisRunner::start(
        VecFrameSource::new(frames),
        move |luma: f64| sink.lock().push(luma),
        AnalyzerConfig { summary_interval: 1 },
    );

    let stats = tokio::time::timeout(Duration::from_secs(5), runner.join())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.frames_analyzed, 2);
    assert_eq!(stats.format_errors, 1);
    assert_eq!(*seen.lock(), vec![25.0, 255.0]);
    assert_eq!(counter.count(), 3);

    let luma = stats.luma.unwrap();
    assert_eq!(luma.count, 2);
    assert_eq!(luma.max, 255.0);
}

#[tokio::test]
async fn test_runner_with_synthetic_source() {
    let config = SourceConfig {
        resolution: (256, 4),
        fps: 1000,
        format: FrameFormat::Yuv420,
        pool_size: 2,
        pattern: TestPattern::Gradient,
        level: 0,
        frame_limit: Some(5),
    };
    let source = SyntheticFrameSource::new(config);
    let pool = source.pool();

    let runner = AnalysisRunnerBuilder::new()
        .source(source)
        .observer(LoggingObserver)
        .config(AnalyzerConfig::default())
        .start()
        .unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(5), runner.join())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.frames_analyzed, 5);
    assert_eq!(stats.luma.unwrap().mean(), Some(127.5));

    let pool_stats = pool.stats();
    assert_eq!(pool_stats.acquired, 5);
    assert_eq!(pool_stats.released, 5);
}

#[tokio::test]
async fn test_runner_stop() {
    let config = SourceConfig {
        resolution: (16, 16),
        fps: 200,
        ..SourceConfig::default()
    };
    let runner = AnalysisRunner::start(
        SyntheticFrameSource::new(config),
        LoggingObserver,
        AnalyzerConfig::default(),
    );
    assert!(runner.is_running());

    tokio::time::sleep(Duration::from_millis(30)).await;

    let stats = tokio::time::timeout(Duration::from_secs(5), runner.shutdown())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.format_errors, 0);
}

#[tokio::test]
async fn test_runner_reports_observer_panic() {
    let counter = Arc::new(ReleaseCounter::default());
    let frames = vec![luma_frame(0, vec![1, 2, 3], &counter)];

    let runner = AnalysisRunner::start(
        VecFrameSource::new(frames),
        |_luma: f64| panic!("observer failure"),
        AnalyzerConfig::default(),
    );

    tokio::time::timeout(Duration::from_secs(5), async {
        while runner.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker should report it is no longer running");

    assert_eq!(counter.count(), 1);

    match runner.join().await {
        Err(LumaError::Component { component, message }) => {
            assert_eq!(component, "analysis_runner");
            assert!(message.contains("panicked"));
        }
        other => panic!("Expected component error, got {:?}", other),
    }
}

struct FailingSource;

#[async_trait]
impl FrameSource for FailingSource {
    async fn next_frame(&mut self) -> crate::error::Result<Option<Frame>> {
        Err(LumaError::frame_source("device unplugged"))
    }

    fn source_name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn test_runner_surfaces_source_errors() {
    let runner = AnalysisRunner::start(FailingSource, LoggingObserver, AnalyzerConfig::default());

    let result = tokio::time::timeout(Duration::from_secs(5), runner.join())
        .await
        .unwrap();

    assert!(matches!(result, Err(LumaError::Source { .. })));
}

#[tokio::test]
async fn test_builder_requires_source() {
    let result = AnalysisRunnerBuilder::<VecFrameSource, LoggingObserver>::new()
        .observer(LoggingObserver)
        .start();

    match result {
        Err(LumaError::System { message }) => {
            assert!(message.contains("Frame source must be specified"));
        }
        _ => panic!("Expected system error for missing source"),
    }
}
