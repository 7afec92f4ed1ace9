// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Rendering engine seam and the cached engine instance

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::network::InterceptedRequest;

/// Something the engine reports while loading a page
#[derive(Debug)]
pub enum EngineEvent {
    /// An outbound request, reported before it is sent
    Request(InterceptedRequest),
    /// The engine expects no further requests for this load
    Finished,
    /// Unrecoverable navigation or script error
    Failed(Error),
    /// Advisory: loading started (`true`) or stopped (`false`)
    LoadingChanged(bool),
    /// Advisory: document title changed
    TitleChanged(String),
    /// Advisory: navigation history changed (e.g. redirect target)
    HistoryChanged(String),
}

/// Callback the engine invokes for every event, on the engine thread
pub type RequestObserver = Rc<dyn Fn(EngineEvent)>;

/// A page-rendering engine.
///
/// Implementations are not required to be `Send`: every method is called on
/// the engine thread owned by the
/// [`EngineDispatcher`](super::dispatcher::EngineDispatcher), and observers are
/// invoked there as well.
pub trait RenderingEngine {
    /// Begin navigation. Progress is reported through the observer.
    fn load(&self, url: &str, page_script: Option<&str>) -> Result<()>;

    /// Install or remove the observer
    fn set_request_observer(&self, observer: Option<RequestObserver>);

    /// Best-effort: halt navigation and stop reporting requests
    fn stop_capturing(&self);

    /// `false` once the instance can no longer be used
    fn is_alive(&self) -> bool {
        true
    }
}

/// Builds engine instances on the engine thread
pub type EngineFactory = Box<dyn FnMut() -> Result<Rc<dyn RenderingEngine>> + Send>;

/// Owns zero or one engine instance.
///
/// `acquire` creates on miss and recreates when the cached instance reports
/// itself dead. `invalidate` drops the cached instance, for example under
/// memory pressure.
pub struct EngineManager {
    factory: EngineFactory,
    engine: Option<Rc<dyn RenderingEngine>>,
    generation: u64,
}

impl EngineManager {
    /// Create a manager with no engine yet
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            factory,
            engine: None,
            generation: 0,
        }
    }

    /// Get the cached engine, creating it if needed
    pub fn acquire(&mut self) -> Result<Rc<dyn RenderingEngine>> {
        if let Some(engine) = &self.engine {
            if engine.is_alive() {
                return Ok(engine.clone());
            }
            tracing::debug!(generation = self.generation, "Cached engine unavailable, recreating");
            self.engine = None;
        }

        let engine = (self.factory)()
            .map_err(|e| Error::engine(format!("failed to create rendering engine: {}", e)))?;
        self.generation += 1;
        self.engine = Some(engine.clone());
        tracing::debug!(generation = self.generation, "Rendering engine created");

        Ok(engine)
    }

    /// Drop the cached engine. Returns whether one was cached.
    pub fn invalidate(&mut self) -> bool {
        let had_engine = self.engine.take().is_some();
        if had_engine {
            tracing::debug!(generation = self.generation, "Rendering engine invalidated");
        }
        had_engine
    }

    /// Whether an engine is currently cached
    pub fn is_cached(&self) -> bool {
        self.engine.is_some()
    }

    /// Number of engines created so far
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
