// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception API
//!
//! Orchestrator, capture sessions, the rendering engine seam and the bundled
//! headless engine.

mod config;
mod dispatcher;
mod engine;
mod extract;
mod headless;
mod interceptor;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{
    EngineConfig, InterceptionConfig, InterceptionConfigBuilder, InterceptionSettings,
    InterceptorConfig, ResourceType, DEFAULT_HEADROOM, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT,
};
pub use dispatcher::{EngineDispatcher, EngineHost};
pub use engine::{EngineEvent, EngineFactory, EngineManager, RenderingEngine, RequestObserver};
pub use extract::{VRF_PARAM, VRF_PATTERN};
pub use headless::HeadlessEngine;
pub use interceptor::Interceptor;
pub use session::{CaptureOutcome, CaptureSession, SessionStatus};
