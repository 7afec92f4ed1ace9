// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JavaScript sandbox using boa_engine
//!
//! Runs page scripts with a stubbed browser surface that records outbound
//! requests instead of performing them.

mod sandbox;

pub use sandbox::{ScriptRequest, ScriptSandbox};
