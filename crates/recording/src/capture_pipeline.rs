use std::time::Duration;

use tracing::*;

use crate::{PreviewSurface, Resources, TeardownReport, VideoSink, VideoSource};

/// A failure inside the capture loop. Every variant stops the recording.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Source read failed: {0:#}")]
    SourceRead(anyhow::Error),
    #[error("Sink write failed: {0:#}")]
    SinkWrite(anyhow::Error),
    #[error("Preview render failed: {0:#}")]
    Render(anyhow::Error),
    #[error("Quit key poll failed: {0:#}")]
    Poll(anyhow::Error),
    #[error("Resources were already released")]
    AlreadyReleased,
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SourceRead(_) => "read",
            Self::SinkWrite(_) => "write",
            Self::Render(_) => "render",
            Self::Poll(_) => "poll",
            Self::AlreadyReleased => "start",
        }
    }
}

#[derive(Debug)]
pub enum StopReason {
    QuitRequested,
    Failed(PipelineError),
}

impl StopReason {
    pub fn is_quit(&self) -> bool {
        matches!(self, Self::QuitRequested)
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::QuitRequested => None,
            Self::Failed(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    StoppingNormal,
    StoppingError,
    Stopped,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub frames_written: u64,
    pub stop_reason: StopReason,
    pub teardown: TeardownReport,
    /// Every state the pipeline passed through, starting at `Running`.
    pub states: Vec<PipelineState>,
}

pub struct CapturePipeline<S: VideoSource, K: VideoSink, P: PreviewSurface> {
    resources: Resources<S, K, P>,
    poll_interval: Duration,
    states: Vec<PipelineState>,
}

impl<S: VideoSource, K: VideoSink, P: PreviewSurface> CapturePipeline<S, K, P> {
    pub fn new(source: S, sink: K, preview: P, poll_interval: Duration) -> Self {
        let mut resources = Resources::new(source);
        resources.attach_sink(sink);
        resources.attach_preview(preview);

        Self::from_resources(resources, poll_interval)
    }

    pub fn from_resources(resources: Resources<S, K, P>, poll_interval: Duration) -> Self {
        Self {
            resources,
            poll_interval,
            states: vec![PipelineState::Running],
        }
    }

    /// Runs until the quit key is pressed or a stage fails, then tears down.
    /// Loop failures are logged and reported in the outcome, never returned.
    pub fn run(mut self) -> PipelineOutcome {
        let mut frames_written = 0;

        let stop_reason = match self.run_loop(&mut frames_written) {
            Ok(()) => {
                self.transition(PipelineState::StoppingNormal);
                info!("Quit requested after {frames_written} frames");
                StopReason::QuitRequested
            }
            Err(e) => {
                self.transition(PipelineState::StoppingError);
                error!(stage = e.stage(), "Stopping after {frames_written} frames: {e}");
                StopReason::Failed(e)
            }
        };

        let teardown = self.resources.release();
        self.transition(PipelineState::Stopped);

        PipelineOutcome {
            frames_written,
            stop_reason,
            teardown,
            states: self.states,
        }
    }

    fn run_loop(&mut self, frames_written: &mut u64) -> Result<(), PipelineError> {
        let poll_interval = self.poll_interval;
        let (source, sink, preview) = self
            .resources
            .parts()
            .ok_or(PipelineError::AlreadyReleased)?;

        loop {
            let frame = source.next_frame().map_err(PipelineError::SourceRead)?;

            sink.append(frame).map_err(PipelineError::SinkWrite)?;
            *frames_written += 1;

            preview.render(frame).map_err(PipelineError::Render)?;

            if preview
                .poll_quit(poll_interval)
                .map_err(PipelineError::Poll)?
            {
                return Ok(());
            }

            trace!("Frame {frames_written} done");
        }
    }

    fn transition(&mut self, next: PipelineState) {
        if let Some(current) = self.states.last() {
            debug!("Pipeline {current:?} -> {next:?}");
        }
        self.states.push(next);
    }
}
