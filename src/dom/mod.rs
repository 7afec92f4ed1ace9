// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML resource discovery

mod parser;

pub use parser::{parse_page, PageResources, PageScript, Resource};
