use std::fmt;

use tracing::*;

use super::VideoSink;
use crate::{PreviewSurface, VideoSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Preview,
    Sink,
    Source,
}

impl Resource {
    /// Release order used on every exit path.
    pub const RELEASE_ORDER: [Resource; 3] = [Resource::Preview, Resource::Sink, Resource::Source];
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Preview => "preview",
            Resource::Sink => "sink",
            Resource::Source => "source",
        })
    }
}

#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Resources whose close was attempted, in the order it happened.
    pub released: Vec<Resource>,
    pub failures: Vec<(Resource, anyhow::Error)>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the resources of one recording session and releases each of them
/// exactly once: on [`release`](Self::release) or, failing that, on drop.
pub struct Resources<S: VideoSource, K: VideoSink, P: PreviewSurface> {
    source: Option<S>,
    sink: Option<K>,
    preview: Option<P>,
}

impl<S: VideoSource, K: VideoSink, P: PreviewSurface> Resources<S, K, P> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            sink: None,
            preview: None,
        }
    }

    pub fn attach_sink(&mut self, sink: K) {
        self.sink = Some(sink);
    }

    pub fn attach_preview(&mut self, preview: P) {
        self.preview = Some(preview);
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn sink(&self) -> Option<&K> {
        self.sink.as_ref()
    }

    /// Disjoint access to all three resources, if none has been released yet.
    pub fn parts(&mut self) -> Option<(&mut S, &mut K, &mut P)> {
        match (&mut self.source, &mut self.sink, &mut self.preview) {
            (Some(source), Some(sink), Some(preview)) => Some((source, sink, preview)),
            _ => None,
        }
    }

    pub fn is_released(&self) -> bool {
        self.source.is_none() && self.sink.is_none() && self.preview.is_none()
    }

    /// Closes whatever is still held, preview first, then sink, then source.
    /// Calling this again releases nothing.
    pub fn release(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        if let Some(mut preview) = self.preview.take() {
            record(&mut report, Resource::Preview, preview.close());
        }

        if let Some(mut sink) = self.sink.take() {
            record(&mut report, Resource::Sink, sink.close());
        }

        if let Some(mut source) = self.source.take() {
            record(&mut report, Resource::Source, source.close());
        }

        report
    }
}

fn record(report: &mut TeardownReport, resource: Resource, result: anyhow::Result<()>) {
    match result {
        Ok(()) => debug!("Released {resource}"),
        Err(e) => {
            error!("Failed to release {resource}: {e:#}");
            report.failures.push((resource, e));
        }
    }

    report.released.push(resource);
}

impl<S: VideoSource, K: VideoSink, P: PreviewSurface> Drop for Resources<S, K, P> {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }

        let report = self.release();
        info!(
            "Released {} resource(s) on drop ({} failed)",
            report.released.len(),
            report.failures.len()
        );
    }
}
