// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request classification: URL pattern AND predicate

use crate::browser::InterceptionConfig;

use super::request::InterceptedRequest;

/// Decide whether a request observed during a session is retained.
///
/// Pattern and predicate are both optional (absent matches). A predicate
/// error counts as a non-match for this request only.
pub fn should_capture(request: &InterceptedRequest, config: &InterceptionConfig) -> bool {
    let url = request.url();

    if let Some(pattern) = config.url_pattern() {
        if !pattern.is_match(url) {
            return false;
        }
    }

    match config.predicate() {
        None => true,
        Some(predicate) => match predicate.test(url) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Filter predicate failed, skipping request");
                false
            }
        },
    }
}
