use skycap_recording::{
    OutputDirError, OutputName, Resource, SessionOptions, StartError, StopReason,
    ensure_output_dir, record_session,
    test_sources::{
        MemorySink, MemorySinkConfig, MemorySinkHandle, ReleaseLog, ScriptedPreview,
        ScriptedPreviewHandle, SyntheticSource, SyntheticSourceConfig,
    },
};
use std::time::Duration;
use tempfile::TempDir;

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

fn options(dir: &TempDir) -> SessionOptions {
    SessionOptions {
        output_dir: dir.path().join("recordings"),
        output_name: OutputName::now("webcam_recording").with_source_id(0),
        poll_interval: Duration::from_millis(1),
    }
}

#[test]
fn records_until_quit() {
    test_utils::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let sink = MemorySinkHandle::default();
    let preview = ScriptedPreviewHandle::default();

    let summary = record_session::<SyntheticSource, MemorySink, _>(
        SyntheticSourceConfig::default().with_resolution(32, 24),
        MemorySinkConfig {
            handle: sink.clone(),
            ..Default::default()
        },
        |info| {
            assert_eq!((info.width, info.height), (32, 24));
            Ok(ScriptedPreview::with_handle(Some(5), preview.clone()))
        },
        options(&temp_dir),
    )
    .unwrap();

    assert!(matches!(summary.stop_reason, StopReason::QuitRequested));
    assert_eq!(summary.frames_written, 5);
    assert_eq!(sink.frame_count(), 5);
    assert_eq!(sink.path().as_deref(), Some(summary.path.as_path()));
    assert_eq!(sink.video_info(), Some(summary.video_info));
    assert!(summary.path.starts_with(temp_dir.path().join("recordings")));
    assert!(
        summary
            .path
            .to_string_lossy()
            .ends_with("_0_webcam_recording.mp4")
    );
    assert!(temp_dir.path().join("recordings").is_dir());
    assert_eq!(preview.closed(), 1);
}

#[test]
fn source_open_failure_creates_nothing() {
    test_utils::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let sink = MemorySinkHandle::default();
    let preview = ScriptedPreviewHandle::default();

    let result = record_session::<SyntheticSource, MemorySink, _>(
        SyntheticSourceConfig::default().failing_open(),
        MemorySinkConfig {
            handle: sink.clone(),
            ..Default::default()
        },
        |_| Ok(ScriptedPreview::with_handle(Some(1), preview.clone())),
        options(&temp_dir),
    );

    assert!(matches!(result, Err(StartError::SourceOpen(_))));
    assert_eq!(sink.opened(), 0);
    assert_eq!(preview.opened(), 0);
    assert!(!temp_dir.path().join("recordings").exists());
}

#[test]
fn sink_open_failure_releases_the_source() {
    test_utils::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let log = ReleaseLog::default();
    let preview = ScriptedPreviewHandle::default();

    let result = record_session::<SyntheticSource, MemorySink, _>(
        SyntheticSourceConfig::default().with_log(log.clone()),
        MemorySinkConfig {
            fail_open: true,
            ..Default::default()
        },
        |_| Ok(ScriptedPreview::with_handle(Some(1), preview.clone())),
        options(&temp_dir),
    );

    assert!(matches!(result, Err(StartError::SinkOpen(_))));
    assert_eq!(log.events(), vec![Resource::Source]);
    assert_eq!(preview.opened(), 0);
}

#[test]
fn preview_open_failure_releases_sink_then_source() {
    test_utils::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let log = ReleaseLog::default();

    let result = record_session::<SyntheticSource, MemorySink, ScriptedPreview>(
        SyntheticSourceConfig::default().with_log(log.clone()),
        MemorySinkConfig {
            log: Some(log.clone()),
            ..Default::default()
        },
        |_| Err(anyhow::anyhow!("no display")),
        options(&temp_dir),
    );

    assert!(matches!(result, Err(StartError::PreviewOpen(_))));
    assert_eq!(log.events(), vec![Resource::Sink, Resource::Source]);
}

#[test]
fn output_dir_that_is_a_file_is_rejected() {
    test_utils::init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("recordings");
    std::fs::write(&file, b"not a directory").unwrap();

    assert!(matches!(
        ensure_output_dir(&file),
        Err(OutputDirError::NotADirectory(_))
    ));

    let log = ReleaseLog::default();
    let result = record_session::<SyntheticSource, MemorySink, ScriptedPreview>(
        SyntheticSourceConfig::default().with_log(log.clone()),
        MemorySinkConfig::default(),
        |_| Ok(ScriptedPreview::quit_after(Some(1))),
        options(&temp_dir),
    );

    assert!(matches!(result, Err(StartError::OutputDir(_))));
    assert_eq!(log.events(), vec![Resource::Source]);
}

#[test]
fn ensure_output_dir_creates_nested_directories() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("a").join("b");

    ensure_output_dir(&nested).unwrap();
    ensure_output_dir(&nested).unwrap();

    assert!(nested.is_dir());
}
