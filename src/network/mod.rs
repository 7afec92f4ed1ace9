// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request model and capture filtering
//!
//! Every request the engine reports is classified by URL pattern and filter
//! predicate before it is retained.

mod classifier;
mod predicate;
mod request;

pub use classifier::should_capture;
pub use predicate::{evaluate, Clause, FilterScript, Term, UrlPredicate};
pub use request::InterceptedRequest;
