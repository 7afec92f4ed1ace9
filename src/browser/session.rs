// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Capture session
//!
//! One bounded run of interception against one page load. A session moves
//! `Idle -> Running -> {Completed, Failed, Cancelled}` exactly once; the
//! first terminal transition wins and every later signal is ignored.
//!
//! Terminal triggers:
//! - the engine reports [`EngineEvent::Finished`] or `max_requests` is reached
//!   (`Completed`)
//! - the session timeout expires (`Completed` with whatever was captured)
//! - the engine reports [`EngineEvent::Failed`] or `load` errors (`Failed`)
//! - the caller's cancellation token fires (`Cancelled`)

use std::rc::Rc;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::config::InterceptionConfig;
use super::engine::{EngineEvent, RenderingEngine, RequestObserver};
use crate::error::{Error, Result};
use crate::network::{should_capture, InterceptedRequest};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Whether this is a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

/// Final result of a session that was not cancelled
#[derive(Debug)]
pub enum CaptureOutcome {
    Completed(Vec<InterceptedRequest>),
    Failed(Error),
}

#[derive(Debug)]
struct SessionCell {
    status: SessionStatus,
    captured: Vec<InterceptedRequest>,
    error: Option<Error>,
}

#[derive(Debug)]
struct SessionShared {
    config: InterceptionConfig,
    cell: Mutex<SessionCell>,
    resolved: CancellationToken,
}

impl SessionShared {
    /// Single compare-and-set into a terminal state
    fn resolve(&self, status: SessionStatus, error: Option<Error>) -> bool {
        {
            let mut cell = self.cell.lock();
            if cell.status.is_terminal() {
                return false;
            }
            if status == SessionStatus::Completed && cell.status != SessionStatus::Running {
                return false;
            }
            cell.status = status;
            cell.error = error;
        }
        self.resolved.cancel();
        true
    }

    fn on_request(&self, request: InterceptedRequest) {
        if self.resolved.is_cancelled() {
            tracing::trace!(url = %request.url(), "Request after resolution ignored");
            return;
        }
        if !should_capture(&request, &self.config) {
            tracing::trace!(url = %request.url(), "Request filtered out");
            return;
        }

        let captured = {
            let mut cell = self.cell.lock();
            if cell.status != SessionStatus::Running {
                return;
            }
            tracing::debug!(url = %request.url(), method = %request.method(), "Request captured");
            cell.captured.push(request);

            let count = cell.captured.len();
            if self.config.max_requests().is_some_and(|max| count >= max) {
                cell.status = SessionStatus::Completed;
                Some(count)
            } else {
                None
            }
        };

        if let Some(count) = captured {
            tracing::debug!(captured = count, "Capture limit reached");
            self.resolved.cancel();
        }
    }

    fn observe(&self, event: EngineEvent) {
        match event {
            EngineEvent::Request(request) => self.on_request(request),
            EngineEvent::Finished => {
                if self.resolve(SessionStatus::Completed, None) {
                    tracing::debug!("Engine reported interception complete");
                }
            }
            EngineEvent::Failed(error) => {
                tracing::warn!(error = %error, "Engine reported fatal error");
                self.resolve(SessionStatus::Failed, Some(error));
            }
            EngineEvent::LoadingChanged(loading) => tracing::trace!(loading, "Loading state"),
            EngineEvent::TitleChanged(title) => tracing::trace!(title = %title, "Title changed"),
            EngineEvent::HistoryChanged(url) => tracing::trace!(url = %url, "History changed"),
        }
    }
}

/// Handle to one capture session. Clones share the same session.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    shared: Arc<SessionShared>,
}

impl CaptureSession {
    /// Create an idle session
    pub fn new(config: InterceptionConfig) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                config,
                cell: Mutex::new(SessionCell {
                    status: SessionStatus::Idle,
                    captured: Vec::new(),
                    error: None,
                }),
                resolved: CancellationToken::new(),
            }),
        }
    }

    /// Current state
    pub fn status(&self) -> SessionStatus {
        self.shared.cell.lock().status
    }

    /// Whether a terminal state was reached
    pub fn is_resolved(&self) -> bool {
        self.shared.resolved.is_cancelled()
    }

    /// Number of requests captured so far
    pub fn captured_len(&self) -> usize {
        self.shared.cell.lock().captured.len()
    }

    /// Feed one engine event into the session. No-op once resolved.
    pub fn observe(&self, event: EngineEvent) {
        self.shared.observe(event);
    }

    /// Observer to install on the engine
    pub fn observer(&self) -> RequestObserver {
        let shared = self.shared.clone();
        Rc::new(move |event: EngineEvent| shared.observe(event))
    }

    /// Resolve as completed with what was captured. Only from `Running`.
    pub fn complete(&self) -> bool {
        self.shared.resolve(SessionStatus::Completed, None)
    }

    /// Resolve as failed
    pub fn fail(&self, error: Error) -> bool {
        self.shared.resolve(SessionStatus::Failed, Some(error))
    }

    /// Resolve as cancelled
    pub fn cancel(&self) -> bool {
        self.shared.resolve(SessionStatus::Cancelled, None)
    }

    /// Take the outcome of a completed or failed session
    pub fn take_outcome(&self) -> Option<CaptureOutcome> {
        let mut cell = self.shared.cell.lock();
        match cell.status {
            SessionStatus::Completed => {
                Some(CaptureOutcome::Completed(std::mem::take(&mut cell.captured)))
            }
            SessionStatus::Failed => Some(CaptureOutcome::Failed(
                cell.error
                    .take()
                    .unwrap_or_else(|| Error::engine("session failed")),
            )),
            _ => None,
        }
    }

    /// Attach to `engine`, load `url`, and wait for the first terminal
    /// trigger. Must run on the engine thread.
    ///
    /// The observer is detached and the engine told to stop before this
    /// returns, whatever the outcome.
    pub async fn run(
        &self,
        engine: Rc<dyn RenderingEngine>,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<InterceptedRequest>> {
        if cancel.is_cancelled() {
            self.cancel();
            return Err(Error::Cancelled);
        }

        {
            let mut cell = self.shared.cell.lock();
            if cell.status != SessionStatus::Idle {
                return Err(Error::engine("capture session already started"));
            }
            cell.status = SessionStatus::Running;
        }

        let timeout = self.shared.config.timeout();
        tracing::debug!(url = %url, timeout_ms = self.shared.config.timeout_ms(), "Capture session started");

        engine.set_request_observer(Some(self.observer()));
        if let Err(e) = engine.load(url, self.shared.config.page_script()) {
            self.fail(e);
        }

        tokio::select! {
            biased;
            _ = self.shared.resolved.cancelled() => {}
            _ = cancel.cancelled() => {
                if self.cancel() {
                    tracing::debug!(url = %url, "Capture session cancelled");
                }
            }
            _ = tokio::time::sleep(timeout) => {
                if self.complete() {
                    tracing::debug!(
                        url = %url,
                        captured = self.captured_len(),
                        "Capture session timed out"
                    );
                }
            }
        }

        engine.stop_capturing();
        engine.set_request_observer(None);

        match self.take_outcome() {
            Some(CaptureOutcome::Completed(requests)) => {
                tracing::info!(url = %url, captured = requests.len(), "Capture session completed");
                Ok(requests)
            }
            Some(CaptureOutcome::Failed(error)) => Err(error),
            None => Err(Error::Cancelled),
        }
    }
}
