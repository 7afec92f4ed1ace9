// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception orchestrator
//!
//! Public entry point. Validates input, serializes sessions against the shared
//! engine, hands the session over to the engine thread and arms the outer
//! guard timeout.

use std::rc::Rc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::config::{InterceptionConfig, InterceptorConfig};
use super::dispatcher::EngineDispatcher;
use super::engine::{EngineFactory, RenderingEngine};
use super::headless::HeadlessEngine;
use super::session::CaptureSession;
use crate::error::{Error, Result};
use crate::network::InterceptedRequest;

/// Captures requests a page issues while it loads.
///
/// One rendering engine is created lazily and reused across calls. Calls are
/// serialized: a second call waits until the first one resolves.
///
/// # Example
///
/// ```rust,no_run
/// use reqsnoop::{InterceptionConfig, Interceptor};
///
/// #[tokio::main]
/// async fn main() -> reqsnoop::Result<()> {
///     let interceptor = Interceptor::launch()?;
///     let config = InterceptionConfig::builder(10_000)
///         .url_pattern(r"/api/")
///         .build()?;
///
///     for request in interceptor.intercept_requests("https://example.com", config).await? {
///         println!("{} {}", request.method(), request.url());
///     }
///     Ok(())
/// }
/// ```
pub struct Interceptor {
    config: InterceptorConfig,
    dispatcher: EngineDispatcher,
    session_lock: Mutex<()>,
}

impl Interceptor {
    /// Create an interceptor backed by the bundled [`HeadlessEngine`]
    pub fn new(config: InterceptorConfig) -> Result<Self> {
        let engine_config = config.engine.clone();
        let factory: EngineFactory = Box::new(move || {
            HeadlessEngine::new(engine_config.clone())
                .map(|engine| Rc::new(engine) as Rc<dyn RenderingEngine>)
        });
        Self::with_engine_factory(config, factory)
    }

    /// Create an interceptor with default config
    pub fn launch() -> Result<Self> {
        Self::new(InterceptorConfig::default())
    }

    /// Create an interceptor whose engines come from `factory`.
    ///
    /// The factory runs on the engine thread, the first time an engine is
    /// needed and after every invalidation. The outer guard must outlast the
    /// session timeout, so a zero headroom is rejected.
    pub fn with_engine_factory(config: InterceptorConfig, factory: EngineFactory) -> Result<Self> {
        if config.headroom.is_zero() {
            return Err(Error::config("headroom must be greater than zero"));
        }

        let dispatcher = EngineDispatcher::spawn(factory)?;
        Ok(Self {
            config,
            dispatcher,
            session_lock: Mutex::new(()),
        })
    }

    /// Orchestrator configuration
    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    /// Load `url` and return the requests matching `config`, in dispatch order.
    ///
    /// An empty list is a success: nothing matched before the session
    /// timeout. Fails only on engine-fatal errors or when the outer guard
    /// (session timeout plus headroom) fires.
    pub async fn intercept_requests(
        &self,
        url: &str,
        config: InterceptionConfig,
    ) -> Result<Vec<InterceptedRequest>> {
        self.intercept_requests_with_cancel(url, config, CancellationToken::new())
            .await
    }

    /// Like [`intercept_requests`](Self::intercept_requests), stopping with
    /// [`Error::Cancelled`] when `cancel` fires first.
    ///
    /// Dropping the returned future cancels the session as well.
    pub async fn intercept_requests_with_cancel(
        &self,
        url: &str,
        config: InterceptionConfig,
        cancel: CancellationToken,
    ) -> Result<Vec<InterceptedRequest>> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::config("URL must not be empty"));
        }

        let _session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            guard = self.session_lock.lock() => guard,
        };

        let token = cancel.child_token();
        let guard = token.clone().drop_guard();
        let outer = config.timeout() + self.config.headroom;
        let outer_ms = outer.as_millis() as u64;

        let session_url = url.to_string();
        let capture = self.dispatcher.run(move |host| async move {
            let engine = host.acquire()?;
            CaptureSession::new(config).run(engine, &session_url, token).await
        });

        match tokio::time::timeout(outer, capture).await {
            Ok(result) => {
                guard.disarm();
                result?
            }
            Err(_) => {
                tracing::warn!(url = %url, timeout_ms = outer_ms, "Outer interception guard fired");
                drop(guard);
                Err(Error::timeout_with_url("request interception", outer_ms, url))
            }
        }
    }

    /// Drop the cached engine; the next call creates a fresh one.
    /// Returns whether an engine was cached.
    pub async fn invalidate_engine(&self) -> Result<bool> {
        let _session = self.session_lock.lock().await;
        self.dispatcher.run(|host| async move { host.invalidate() }).await
    }

    /// Number of engines created so far
    pub async fn engine_generation(&self) -> Result<u64> {
        self.dispatcher.run(|host| async move { host.generation() }).await
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("config", &self.config)
            .field("engine_running", &self.dispatcher.is_running())
            .finish()
    }
}
