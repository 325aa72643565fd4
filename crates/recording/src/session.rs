use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use skycap_media_info::VideoInfo;
use tracing::*;

use crate::{
    CapturePipeline, OutputDirError, OutputName, PreviewSurface, Resources, StopReason,
    TeardownReport, VideoSink, VideoSource, ensure_output_dir,
};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub output_dir: PathBuf,
    pub output_name: OutputName,
    /// Upper bound on the quit-key poll per frame.
    pub poll_interval: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum StartError {
    #[error("Opening source: {0:#}")]
    SourceOpen(anyhow::Error),
    #[error("Output directory/{0}")]
    OutputDir(#[from] OutputDirError),
    #[error("Opening sink: {0:#}")]
    SinkOpen(anyhow::Error),
    #[error("Opening preview: {0:#}")]
    PreviewOpen(anyhow::Error),
}

#[derive(Debug)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub video_info: VideoInfo,
    pub frames_written: u64,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
    pub teardown: TeardownReport,
}

/// Records one session end to end.
///
/// The source is opened first; if that fails nothing else is created. Once
/// it is open, every resource acquired is owned by a [`Resources`] guard, so
/// a later start failure still releases what was already opened.
pub fn record_session<S, K, P>(
    source_config: S::Config,
    sink_config: K::Config,
    open_preview: impl FnOnce(&VideoInfo) -> anyhow::Result<P>,
    options: SessionOptions,
) -> Result<RecordingSummary, StartError>
where
    S: VideoSource,
    K: VideoSink,
    P: PreviewSurface,
{
    let source = S::open(source_config).map_err(StartError::SourceOpen)?;
    let video_info = source.video_info();
    info!("Source open: {video_info}");

    let mut resources = Resources::<S, K, P>::new(source);

    ensure_output_dir(&options.output_dir)?;
    let path = options.output_name.path_in(&options.output_dir);

    let sink = K::open(sink_config, &path, video_info).map_err(StartError::SinkOpen)?;
    resources.attach_sink(sink);
    info!("Recording to '{}'", path.display());

    let preview = open_preview(&video_info).map_err(StartError::PreviewOpen)?;
    resources.attach_preview(preview);

    let start = Instant::now();
    let outcome = CapturePipeline::from_resources(resources, options.poll_interval).run();
    let elapsed = start.elapsed();

    info!(
        "Recorded {} frames in {:.1}s to '{}'",
        outcome.frames_written,
        elapsed.as_secs_f64(),
        path.display()
    );

    Ok(RecordingSummary {
        path,
        video_info,
        frames_written: outcome.frames_written,
        stop_reason: outcome.stop_reason,
        elapsed,
        teardown: outcome.teardown,
    })
}
