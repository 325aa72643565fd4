use anyhow::{anyhow, bail};
use parking_lot::Mutex;
use skycap_media_info::{VideoFrame, VideoInfo};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{PreviewSurface, Resource, VideoSink};

/// Shared record of releases, in the order they happened.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLog(Arc<Mutex<Vec<Resource>>>);

impl ReleaseLog {
    pub fn record(&self, resource: Resource) {
        self.0.lock().push(resource);
    }

    pub fn events(&self) -> Vec<Resource> {
        self.0.lock().clone()
    }

    pub fn count(&self, resource: Resource) -> usize {
        self.0.lock().iter().filter(|r| **r == resource).count()
    }
}

#[derive(Debug, Default)]
pub struct MemorySinkState {
    pub opened: u32,
    pub closed: u32,
    pub path: Option<PathBuf>,
    pub video_info: Option<VideoInfo>,
    pub frames: Vec<VideoFrame>,
}

/// Observes a [`MemorySink`] from outside the pipeline that owns it.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkHandle(Arc<Mutex<MemorySinkState>>);

impl MemorySinkHandle {
    pub fn opened(&self) -> u32 {
        self.0.lock().opened
    }

    pub fn closed(&self) -> u32 {
        self.0.lock().closed
    }

    pub fn frame_count(&self) -> usize {
        self.0.lock().frames.len()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.0.lock().path.clone()
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        self.0.lock().video_info
    }

    pub fn frames(&self) -> Vec<VideoFrame> {
        self.0.lock().frames.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySinkConfig {
    pub handle: MemorySinkHandle,
    /// 1-based index of the append that fails.
    pub fail_at: Option<u64>,
    pub fail_open: bool,
    pub log: Option<ReleaseLog>,
}

/// Keeps appended frames in memory. Panics if closed twice.
pub struct MemorySink {
    config: MemorySinkConfig,
    video_info: VideoInfo,
    frames_written: u64,
    closed: bool,
}

impl VideoSink for MemorySink {
    type Config = MemorySinkConfig;

    fn open(config: Self::Config, path: &Path, video_info: VideoInfo) -> anyhow::Result<Self> {
        if config.fail_open {
            bail!("Can't create '{}'", path.display());
        }

        {
            let mut state = config.handle.0.lock();
            state.opened += 1;
            state.path = Some(path.to_path_buf());
            state.video_info = Some(video_info);
        }

        Ok(Self {
            config,
            video_info,
            frames_written: 0,
            closed: false,
        })
    }

    fn append(&mut self, frame: &VideoFrame) -> anyhow::Result<()> {
        if self.closed {
            bail!("Memory sink is closed");
        }

        if !self.video_info.accepts(frame) {
            return Err(anyhow!(
                "{:?} {}x{} doesn't match {}",
                frame.format(),
                frame.width(),
                frame.height(),
                self.video_info
            ));
        }

        if self.config.fail_at == Some(self.frames_written + 1) {
            bail!("Synthetic write failure at frame {}", self.frames_written + 1);
        }

        self.config.handle.0.lock().frames.push(frame.clone());
        self.frames_written += 1;

        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn close(&mut self) -> anyhow::Result<()> {
        assert!(!self.closed, "memory sink released twice");
        self.closed = true;

        self.config.handle.0.lock().closed += 1;
        if let Some(log) = &self.config.log {
            log.record(Resource::Sink);
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedPreviewState {
    pub opened: u32,
    pub rendered: u64,
    pub polls: u64,
    pub closed: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPreviewHandle(Arc<Mutex<ScriptedPreviewState>>);

impl ScriptedPreviewHandle {
    pub fn opened(&self) -> u32 {
        self.0.lock().opened
    }

    pub fn rendered(&self) -> u64 {
        self.0.lock().rendered
    }

    pub fn polls(&self) -> u64 {
        self.0.lock().polls
    }

    pub fn closed(&self) -> u32 {
        self.0.lock().closed
    }
}

/// Presses the quit key on a fixed poll. Never sleeps.
pub struct ScriptedPreview {
    quit_after: Option<u64>,
    fail_render_at: Option<u64>,
    handle: ScriptedPreviewHandle,
    log: Option<ReleaseLog>,
    closed: bool,
}

impl ScriptedPreview {
    /// Quits on the `polls`-th poll. `None` never quits.
    pub fn quit_after(polls: Option<u64>) -> Self {
        Self::with_handle(polls, ScriptedPreviewHandle::default())
    }

    pub fn with_handle(quit_after: Option<u64>, handle: ScriptedPreviewHandle) -> Self {
        handle.0.lock().opened += 1;

        Self {
            quit_after,
            fail_render_at: None,
            handle,
            log: None,
            closed: false,
        }
    }

    pub fn failing_render_at(mut self, frame: u64) -> Self {
        self.fail_render_at = Some(frame);
        self
    }

    pub fn with_log(mut self, log: ReleaseLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn handle(&self) -> &ScriptedPreviewHandle {
        &self.handle
    }
}

impl PreviewSurface for ScriptedPreview {
    fn render(&mut self, _frame: &VideoFrame) -> anyhow::Result<()> {
        let mut state = self.handle.0.lock();
        if self.fail_render_at == Some(state.rendered + 1) {
            bail!("Synthetic render failure at frame {}", state.rendered + 1);
        }

        state.rendered += 1;

        Ok(())
    }

    fn poll_quit(&mut self, _timeout: Duration) -> anyhow::Result<bool> {
        let mut state = self.handle.0.lock();
        state.polls += 1;

        Ok(self.quit_after == Some(state.polls))
    }

    fn close(&mut self) -> anyhow::Result<()> {
        assert!(!self.closed, "scripted preview released twice");
        self.closed = true;

        self.handle.0.lock().closed += 1;
        if let Some(log) = &self.log {
            log.record(Resource::Preview);
        }

        Ok(())
    }
}
