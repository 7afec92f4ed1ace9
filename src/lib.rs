// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Reqsnoop - Request Interception for Script-Driven Pages
//!
//! Loads a page, observes every request it would dispatch, and returns the
//! ones matching a URL pattern and filter predicate. Built for recovering
//! values (signed tokens, playlist URLs) that only ever appear as a side
//! effect of page scripts running.
//!
//! ## Features
//!
//! - Two-stage filtering: regex URL pattern plus a small `url.includes(...)`
//!   predicate language
//! - Bounded sessions: a timeout returns what was captured so far
//! - Cancellation through `CancellationToken` or by dropping the future
//! - Pluggable rendering engines; the bundled one needs no browser binary
//!   (reqwest + html5ever + boa_engine)
//!
//! ## Example
//!
//! ```rust,no_run
//! use reqsnoop::Interceptor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let interceptor = Interceptor::launch()?;
//!
//!     if let Some(token) = interceptor
//!         .extract_vrf_token("https://example.com/watch/5", 15_000)
//!         .await?
//!     {
//!         println!("vrf = {}", token);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod dom;
pub mod error;
pub mod js;
pub mod network;

// Re-exports for convenience

// Orchestrator and configuration
pub use browser::{
    EngineConfig, InterceptionConfig, InterceptionConfigBuilder, InterceptionSettings, Interceptor,
    InterceptorConfig, ResourceType,
};

// Engine seam
pub use browser::{EngineEvent, HeadlessEngine, RenderingEngine, RequestObserver};

// Sessions
pub use browser::{CaptureOutcome, CaptureSession, SessionStatus};

// Extractors
pub use browser::{VRF_PARAM, VRF_PATTERN};

// Filtering
pub use network::{evaluate, should_capture, FilterScript, InterceptedRequest, UrlPredicate};

// Error types
pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
