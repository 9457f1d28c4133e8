//! Background document loading.
//!
//! One load = one worker thread that owns its decoder and streams
//! progress over a channel. The UI polls the channel once per frame.
//! Starting a new load cancels the previous task's token, so only the
//! newest load can ever reach the session.

use leafthrough_engine::{default_decoder, DocumentSource};
use leafthrough_raster::{rasterize, CancelToken, PageImage, Progress, ProgressCallback,
    RasterizeError};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug)]
pub enum LoadEvent {
    Progress(Progress),
    Finished(Vec<PageImage>),
    Failed(String),
}

/// Handle to one in-flight load.
pub struct LoadTask {
    cancel: CancelToken,
    events: Receiver<LoadEvent>,
}

impl LoadTask {
    /// Spawn a load for `source`, rasterizing at `target_width` pixels.
    /// `repaint` is poked on every event so the UI wakes up promptly.
    pub fn spawn(
        source: DocumentSource,
        target_width: f32,
        repaint: Option<egui::Context>,
    ) -> Self {
        Self::spawn_with(CancelToken::new(), source, target_width, repaint)
    }

    fn spawn_with(
        cancel: CancelToken,
        source: DocumentSource,
        target_width: f32,
        repaint: Option<egui::Context>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker_cancel = cancel.clone();

        thread::spawn(move || {
            run_load(source, target_width, worker_cancel, tx, repaint);
        });

        Self { cancel, events: rx }
    }

    /// Flag the load as superseded. The worker stops at the next page
    /// boundary and its result is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain one pending event, if any.
    pub fn try_next(&self) -> Option<LoadEvent> {
        self.events.try_recv().ok()
    }

    #[cfg(test)]
    fn wait_next(&self, timeout: std::time::Duration) -> Option<LoadEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    #[cfg(test)]
    fn cancelled_before_start(
        source: DocumentSource,
        target_width: f32,
    ) -> Self {
        let cancel = CancelToken::new();
        cancel.cancel();
        Self::spawn_with(cancel, source, target_width, None)
    }
}

fn run_load(
    source: DocumentSource,
    target_width: f32,
    cancel: CancelToken,
    tx: Sender<LoadEvent>,
    repaint: Option<egui::Context>,
) {
    let progress_tx = tx.clone();
    let progress_repaint = repaint.clone();
    let progress: ProgressCallback = Arc::new(move |update| {
        let _ = progress_tx.send(LoadEvent::Progress(update));
        if let Some(ctx) = &progress_repaint {
            ctx.request_repaint();
        }
    });

    let mut decoder = default_decoder();
    let event = match rasterize(decoder.as_mut(), source, target_width, Some(progress), &cancel) {
        Ok(images) => LoadEvent::Finished(images),
        // Superseded loads vanish without a trace.
        Err(RasterizeError::Cancelled) => return,
        Err(err) => LoadEvent::Failed(err.to_string()),
    };

    let _ = tx.send(event);
    if let Some(ctx) = &repaint {
        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafthrough_engine::test_pdf::synthetic_pdf;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(10);

    fn drain(task: &LoadTask) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Some(event) = task.wait_next(WAIT) {
            events.push(event);
        }
        events
    }

    #[test]
    fn load_emits_progress_then_finished() {
        let bytes = synthetic_pdf(3, 600.0, 800.0);
        let task = LoadTask::spawn(DocumentSource::Bytes(bytes), 950.0, None);

        let events = drain(&task);

        let progress_count =
            events.iter().filter(|event| matches!(event, LoadEvent::Progress(_))).count();
        assert_eq!(progress_count, 4); // one per page plus the final update

        match events.last() {
            Some(LoadEvent::Finished(images)) => {
                assert_eq!(images.len(), 3);
                assert!(images.iter().all(|image| image.width() == 950));
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_document_reports_failure() {
        let task =
            LoadTask::spawn(DocumentSource::Bytes(b"%PDF-garbage".to_vec()), 950.0, None);

        let events = drain(&task);
        assert!(matches!(events.last(), Some(LoadEvent::Failed(_))));
    }

    #[test]
    fn invalid_source_reports_failure_without_progress() {
        let task = LoadTask::spawn(DocumentSource::Bytes(Vec::new()), 950.0, None);

        let events = drain(&task);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LoadEvent::Failed(_)));
    }

    #[test]
    fn cancelled_load_sends_nothing() {
        let bytes = synthetic_pdf(5, 600.0, 800.0);
        let task = LoadTask::cancelled_before_start(DocumentSource::Bytes(bytes), 950.0);

        // Channel disconnects without any event reaching the UI.
        assert!(drain(&task).is_empty());
    }
}
