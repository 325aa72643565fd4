use ffmpeg::format;
use skycap_media_info::{VideoFrame, VideoInfo};
use std::path::{Path, PathBuf};
use tracing::*;

use crate::video::mpeg4::{Mpeg4Encoder, Mpeg4EncoderError, QueueFrameError};

pub struct MP4File {
    tag: &'static str,
    path: PathBuf,
    output: format::context::Output,
    video: Mpeg4Encoder,
    frames_written: u64,
    is_finished: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("{0:?}")]
    Ffmpeg(ffmpeg::Error),
    #[error("Video/{0}")]
    VideoInit(Mpeg4EncoderError),
}

#[derive(thiserror::Error, Debug)]
pub enum FinishError {
    #[error("Already finished")]
    AlreadyFinished,
    #[error("{0}")]
    WriteTrailerFailed(ffmpeg::Error),
}

pub struct FinishResult {
    pub video_finish: Result<(), ffmpeg::Error>,
    pub frames_written: u64,
}

impl MP4File {
    /// Opens `output` for writing. The parent directory must already exist.
    pub fn init(
        tag: &'static str,
        output: PathBuf,
        video: impl FnOnce(&mut format::context::Output) -> Result<Mpeg4Encoder, Mpeg4EncoderError>,
    ) -> Result<Self, InitError> {
        let path = output;
        let mut output = format::output_as(&path, "mp4").map_err(InitError::Ffmpeg)?;

        trace!("{tag}: Preparing encoder for mp4 file");

        let video = video(&mut output).map_err(InitError::VideoInit)?;

        info!(
            "{tag}: Prepared {} encoder ({}) for '{}'",
            video.fourcc(),
            video.config(),
            path.display()
        );

        // make sure this happens after adding all encoders!
        output.write_header().map_err(InitError::Ffmpeg)?;

        Ok(Self {
            tag,
            path,
            output,
            video,
            frames_written: 0,
            is_finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn video_info(&self) -> &VideoInfo {
        self.video.config()
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn queue_video_frame(&mut self, frame: &VideoFrame) -> Result<(), QueueFrameError> {
        if self.is_finished {
            return Ok(());
        }

        self.video.queue_frame(frame, &mut self.output)?;
        self.frames_written += 1;

        Ok(())
    }

    pub fn finish(&mut self) -> Result<FinishResult, FinishError> {
        if self.is_finished {
            return Err(FinishError::AlreadyFinished);
        }

        self.is_finished = true;

        info!("{}: Finishing encoding", self.tag);

        let video_finish = self.video.flush(&mut self.output).inspect_err(|e| {
            error!("{}: Failed to finish video encoder: {e:#}", self.tag);
        });

        debug!("{}: Writing trailer", self.tag);
        self.output
            .write_trailer()
            .map_err(FinishError::WriteTrailerFailed)?;

        Ok(FinishResult {
            video_finish,
            frames_written: self.frames_written,
        })
    }

    pub fn video(&self) -> &Mpeg4Encoder {
        &self.video
    }
}

impl Drop for MP4File {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
