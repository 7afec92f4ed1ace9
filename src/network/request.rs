// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Intercepted request model

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An outbound request observed by the rendering engine before it was sent.
///
/// Immutable once captured. Header names are stored lowercased so lookups are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    url: String,
    method: String,
    headers: HashMap<String, String>,
    body: Option<Bytes>,
    captured_at: DateTime<Utc>,
}

impl InterceptedRequest {
    /// Create a new request with the given method and URL
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into().to_uppercase(),
            headers: HashMap::new(),
            body: None,
            captured_at: Utc::now(),
        }
    }

    /// Shorthand for a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Add a header
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Add several headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Attach a body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Request URL as dispatched by the engine
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP method (uppercase)
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Look up a header value, ignoring case
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All headers, keyed by lowercase name
    pub fn header_map(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Request body, if any
    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// When the engine reported the request
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// First value of the named query parameter.
    ///
    /// Works on absolute and relative URLs; values are percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let without_fragment = self.url.split('#').next().unwrap_or_default();
        let query = without_fragment.split_once('?')?.1;

        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_relative_url() {
        let req = InterceptedRequest::get("/ajax/read/5?vrf=ZZZ&page=2");

        assert_eq!(req.query_param("vrf").as_deref(), Some("ZZZ"));
        assert_eq!(req.query_param("page").as_deref(), Some("2"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_query_param_ignores_fragment() {
        let req = InterceptedRequest::get("/a#x?vrf=1");
        assert_eq!(req.query_param("vrf"), None);

        let req = InterceptedRequest::get("/ajax/read/5?vrf=ZZZ#vrf=frag");
        assert_eq!(req.query_param("vrf").as_deref(), Some("ZZZ"));
    }

    #[test]
    fn test_query_param_first_match_wins() {
        let req = InterceptedRequest::get("https://example.com/a?x=1&x=2#x=3");
        assert_eq!(req.query_param("x").as_deref(), Some("1"));
    }

    #[test]
    fn test_query_param_decoded() {
        let req = InterceptedRequest::get("https://example.com/a?vrf=ab%2Bc%3D%3D");
        assert_eq!(req.query_param("vrf").as_deref(), Some("ab+c=="));
    }

    #[test]
    fn test_query_param_without_query() {
        let req = InterceptedRequest::get("https://example.com/a");
        assert_eq!(req.query_param("vrf"), None);
    }

    #[test]
    fn test_headers_case_insensitive() {
        let req = InterceptedRequest::new("post", "https://example.com/api")
            .header("X-Requested-With", "XMLHttpRequest")
            .body("a=1");

        assert_eq!(req.method(), "POST");
        assert_eq!(req.header_value("x-requested-with"), Some("XMLHttpRequest"));
        assert_eq!(req.header_value("X-REQUESTED-WITH"), Some("XMLHttpRequest"));
        assert_eq!(req.body_bytes().map(|b| b.as_ref()), Some(&b"a=1"[..]));
    }
}
