use skycap_recording::{
    CapturePipeline, PipelineError, PipelineState, Resource, Resources, StopReason, VideoSink,
    VideoSource,
    test_sources::{
        MemorySink, MemorySinkConfig, MemorySinkHandle, ReleaseLog, ScriptedPreview,
        ScriptedPreviewHandle, SyntheticSource, SyntheticSourceConfig,
    },
};
use std::{path::Path, time::Duration};

mod test_utils {
    use std::sync::Once;

    static INIT: Once = Once::new();

    pub fn init_tracing() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::DEBUG.into()),
                )
                .with_test_writer()
                .try_init()
                .ok();
        });
    }
}

const POLL: Duration = Duration::from_millis(1);

struct Harness {
    log: ReleaseLog,
    sink: MemorySinkHandle,
    preview: ScriptedPreviewHandle,
}

impl Harness {
    fn new() -> Self {
        Self {
            log: ReleaseLog::default(),
            sink: MemorySinkHandle::default(),
            preview: ScriptedPreviewHandle::default(),
        }
    }

    fn source(&self, config: SyntheticSourceConfig) -> SyntheticSource {
        SyntheticSource::open(config.with_resolution(64, 48).with_log(self.log.clone())).unwrap()
    }

    fn sink(&self, source: &SyntheticSource, fail_at: Option<u64>) -> MemorySink {
        MemorySink::open(
            MemorySinkConfig {
                handle: self.sink.clone(),
                fail_at,
                log: Some(self.log.clone()),
                ..Default::default()
            },
            Path::new("memory.mp4"),
            source.video_info(),
        )
        .unwrap()
    }

    fn preview(&self, quit_after: Option<u64>) -> ScriptedPreview {
        ScriptedPreview::with_handle(quit_after, self.preview.clone()).with_log(self.log.clone())
    }

    fn assert_released_once(&self) {
        assert_eq!(self.log.events(), Resource::RELEASE_ORDER.to_vec());
        assert_eq!(self.sink.closed(), 1);
        assert_eq!(self.preview.closed(), 1);
    }
}

#[test]
fn quit_after_n_frames_writes_n_frames() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    let outcome = CapturePipeline::new(source, sink, h.preview(Some(7)), POLL).run();

    assert!(outcome.stop_reason.is_quit());
    assert_eq!(
        outcome.states,
        [
            PipelineState::Running,
            PipelineState::StoppingNormal,
            PipelineState::Stopped
        ]
    );
    assert_eq!(outcome.frames_written, 7);
    assert_eq!(h.sink.frame_count(), 7);
    assert_eq!(h.preview.rendered(), 7);
    assert!(outcome.teardown.is_clean());
    h.assert_released_once();
}

#[test]
fn frames_reach_the_sink_unmodified_and_in_order() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    CapturePipeline::new(source, sink, h.preview(Some(3)), POLL).run();

    let first_bytes: Vec<u8> = h.sink.frames().iter().map(|f| f.data()[0]).collect();
    assert_eq!(first_bytes, vec![0, 1, 2]);
}

#[test]
fn read_failure_at_frame_k_keeps_k_minus_one_frames() {
    test_utils::init_tracing();

    for k in [1, 2, 5] {
        let h = Harness::new();

        let source = h.source(SyntheticSourceConfig::default().failing_at(k));
        let sink = h.sink(&source, None);
        let outcome = CapturePipeline::new(source, sink, h.preview(None), POLL).run();

        assert!(matches!(
            outcome.stop_reason,
            StopReason::Failed(PipelineError::SourceRead(_))
        ));
        assert_eq!(outcome.frames_written, k - 1);
        assert_eq!(h.sink.frame_count() as u64, k - 1);
        assert_eq!(
            outcome.states,
            [
                PipelineState::Running,
                PipelineState::StoppingError,
                PipelineState::Stopped
            ]
        );
        h.assert_released_once();
    }
}

#[test]
fn write_failure_stops_with_sink_error() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, Some(4));
    let outcome = CapturePipeline::new(source, sink, h.preview(None), POLL).run();

    let error = outcome.stop_reason.error().unwrap();
    assert!(matches!(error, PipelineError::SinkWrite(_)));
    assert_eq!(error.stage(), "write");
    assert_eq!(outcome.frames_written, 3);
    h.assert_released_once();
}

#[test]
fn render_failure_stops_after_the_frame_was_written() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    let preview = h.preview(None).failing_render_at(2);
    let outcome = CapturePipeline::new(source, sink, preview, POLL).run();

    assert!(matches!(
        outcome.stop_reason,
        StopReason::Failed(PipelineError::Render(_))
    ));
    assert_eq!(outcome.frames_written, 2);
    h.assert_released_once();
}

#[test]
fn geometry_mismatch_is_a_write_error() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let mut info = source.video_info();
    info.width *= 2;
    let sink = MemorySink::open(
        MemorySinkConfig {
            handle: h.sink.clone(),
            log: Some(h.log.clone()),
            ..Default::default()
        },
        Path::new("memory.mp4"),
        info,
    )
    .unwrap();

    let outcome = CapturePipeline::new(source, sink, h.preview(None), POLL).run();

    assert!(matches!(
        outcome.stop_reason,
        StopReason::Failed(PipelineError::SinkWrite(_))
    ));
    assert_eq!(h.sink.frame_count(), 0);
    h.assert_released_once();
}

#[test]
fn teardown_twice_releases_once() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    let mut resources = Resources::new(source);
    resources.attach_sink(sink);
    resources.attach_preview(h.preview(None));

    let first = resources.release();
    let second = resources.release();
    drop(resources);

    assert_eq!(first.released, Resource::RELEASE_ORDER.to_vec());
    assert!(second.released.is_empty());
    assert!(second.is_clean());
    h.assert_released_once();
}

#[test]
fn dropping_unstarted_resources_releases_them() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    let pipeline = CapturePipeline::new(source, sink, h.preview(None), POLL);
    drop(pipeline);

    h.assert_released_once();
}

#[test]
fn partial_resources_release_in_order() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let mut resources: Resources<_, MemorySink, ScriptedPreview> = Resources::new(source);
    assert!(resources.parts().is_none());

    let report = resources.release();

    assert_eq!(report.released, vec![Resource::Source]);
    assert_eq!(h.log.count(Resource::Source), 1);
}

#[test]
fn running_released_resources_fails_without_releasing_again() {
    test_utils::init_tracing();
    let h = Harness::new();

    let source = h.source(SyntheticSourceConfig::default());
    let sink = h.sink(&source, None);
    let mut resources = Resources::new(source);
    resources.attach_sink(sink);
    resources.attach_preview(h.preview(Some(1)));
    resources.release();

    let outcome = CapturePipeline::from_resources(resources, POLL).run();

    assert!(matches!(
        outcome.stop_reason,
        StopReason::Failed(PipelineError::AlreadyReleased)
    ));
    assert!(outcome.teardown.released.is_empty());
    h.assert_released_once();
}
