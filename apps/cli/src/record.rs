use anyhow::{Context, Result};
use skycap_media_info::RawVideoFormat;
use skycap_recording::{
    OutputName, Preview, RecordingSummary, SessionOptions, StopReason,
    output_pipeline::{Mp4Sink, Mp4SinkConfig},
    record_session,
    sources::{TelloSource, WebcamSource, WebcamSourceConfig},
    test_sources::{ScriptedPreview, SyntheticSource, SyntheticSourceConfig, TestPattern},
};
use skycap_tello::Tello;
use std::time::Duration;
use tracing::*;

use crate::config::RecorderConfig;

pub fn webcam(config: &RecorderConfig, channel: u32) -> Result<RecordingSummary> {
    let options = SessionOptions {
        output_dir: config.output_dir.clone(),
        output_name: OutputName::now("webcam_recording").with_source_id(channel),
        poll_interval: config.webcam.poll_interval(),
    };

    let summary = record_session::<WebcamSource, Mp4Sink, _>(
        WebcamSourceConfig { channel },
        Mp4SinkConfig::default(),
        |_| open_preview(config, &config.webcam.window_title),
        options,
    )?;

    Ok(summary)
}

/// Enters SDK mode and starts the feed, records, then reboots the drone
/// whatever happened in between.
pub fn tello(config: &RecorderConfig) -> Result<RecordingSummary> {
    let drone = Tello::connect(&config.tello.drone).context("Connecting to Tello")?;

    drone.run_streaming(|drone| record_with_drone(config, drone))
}

fn record_with_drone(config: &RecorderConfig, drone: &Tello) -> Result<RecordingSummary> {
    match drone.battery() {
        Ok(level) => info!("Tello battery at {level}%"),
        Err(e) => warn!("Couldn't read Tello battery level: {e}"),
    }

    let options = SessionOptions {
        output_dir: config.output_dir.clone(),
        output_name: OutputName::now("tello_recording"),
        poll_interval: config.tello.poll_interval(),
    };

    let summary = record_session::<TelloSource, Mp4Sink, _>(
        config.tello.drone.clone(),
        Mp4SinkConfig::default(),
        |_| open_preview(config, &config.tello.window_title),
        options,
    )?;

    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
pub struct SyntheticArgs {
    pub frames: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Records a generated test pattern, paced at `fps`. Stops after `frames`
/// when given, otherwise on the quit key.
pub fn synthetic(config: &RecorderConfig, args: SyntheticArgs) -> Result<RecordingSummary> {
    let source_config = SyntheticSourceConfig::default()
        .with_resolution(args.width, args.height)
        .with_frame_rate(args.fps)
        .with_pixel_format(RawVideoFormat::Rgb24)
        .with_pattern(TestPattern::SmpteColorBars)
        .realtime();

    let options = SessionOptions {
        output_dir: config.output_dir.clone(),
        output_name: OutputName::now("synthetic_recording"),
        poll_interval: Duration::from_millis(1),
    };

    let summary = match args.frames {
        Some(frames) => record_session::<SyntheticSource, Mp4Sink, _>(
            source_config,
            Mp4SinkConfig::default(),
            |_| Ok(ScriptedPreview::quit_after(Some(frames))),
            options,
        )?,
        None => record_session::<SyntheticSource, Mp4Sink, _>(
            source_config,
            Mp4SinkConfig::default(),
            |_| open_preview(config, "Synthetic - Press 'q' key to quit."),
            options,
        )?,
    };

    Ok(summary)
}

fn open_preview(config: &RecorderConfig, title: &str) -> Result<Preview> {
    Ok(Preview::open(config.preview, title, config.quit_key)?)
}

pub fn report(summary: &RecordingSummary) {
    match &summary.stop_reason {
        StopReason::QuitRequested => info!(
            "Saved {} frames ({}) to '{}'",
            summary.frames_written,
            summary.video_info,
            summary.path.display()
        ),
        StopReason::Failed(e) => error!(
            stage = e.stage(),
            "Recording stopped early, kept {} frames in '{}': {e}",
            summary.frames_written,
            summary.path.display()
        ),
    }

    for (resource, e) in &summary.teardown.failures {
        warn!("Releasing {resource} failed: {e:#}");
    }
}
