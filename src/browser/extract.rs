// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Derived extractors built on [`Interceptor::intercept_requests`]

use super::config::InterceptionConfig;
use super::interceptor::Interceptor;
use crate::error::Result;

/// Path and query shape of the request that carries the VRF token
pub const VRF_PATTERN: &str = r"/ajax/read/.*[?&]vrf=([^&]+)";

/// Query parameter holding the VRF token
pub const VRF_PARAM: &str = "vrf";

impl Interceptor {
    /// URLs of every request matching `pattern`, in dispatch order
    pub async fn capture_urls(&self, url: &str, pattern: &str, timeout_ms: u64) -> Result<Vec<String>> {
        let config = InterceptionConfig::builder(timeout_ms)
            .url_pattern(pattern)
            .build()?;

        let requests = self.intercept_requests(url, config).await?;
        Ok(requests.into_iter().map(|r| r.url().to_string()).collect())
    }

    /// Query parameter `param` of the first request matching `pattern`.
    ///
    /// The session stops at the first match. `None` when nothing matched
    /// before the timeout, or the match lacks the parameter.
    pub async fn extract_query_param(
        &self,
        url: &str,
        pattern: &str,
        param: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>> {
        let config = InterceptionConfig::builder(timeout_ms)
            .url_pattern(pattern)
            .max_requests(1)
            .build()?;

        let requests = self.intercept_requests(url, config).await?;
        let value = requests.first().and_then(|r| r.query_param(param));
        match &value {
            Some(_) => tracing::info!(url = %url, param, "Query parameter recovered"),
            None => tracing::info!(url = %url, param, "No matching request carried the parameter"),
        }
        Ok(value)
    }

    /// VRF token the page sends to `/ajax/read/...`
    pub async fn extract_vrf_token(&self, url: &str, timeout_ms: u64) -> Result<Option<String>> {
        self.extract_query_param(url, VRF_PATTERN, VRF_PARAM, timeout_ms)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::*;
    use crate::browser::config::InterceptorConfig;
    use crate::browser::testing::{scripted_factory, EngineProbe, Step};

    fn interceptor(steps: Vec<Step>) -> (Interceptor, Arc<EngineProbe>) {
        let probe = EngineProbe::new();
        let interceptor = Interceptor::with_engine_factory(
            InterceptorConfig::default(),
            scripted_factory(steps, probe.clone()),
        )
        .unwrap();
        (interceptor, probe)
    }

    #[tokio::test]
    async fn test_extract_vrf_token() {
        let (interceptor, probe) = interceptor(vec![
            Step::request("/a?x=1"),
            Step::request("/ajax/read/5?vrf=ZZZ"),
            Step::request("/ajax/read/6?vrf=YYY"),
            Step::Finish,
        ]);

        let token = interceptor
            .extract_vrf_token("https://site.to/watch/5", 5_000)
            .await
            .unwrap();

        assert_eq!(token.as_deref(), Some("ZZZ"));
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_vrf_token_decoded() {
        let (interceptor, _probe) = interceptor(vec![Step::request(
            "https://site.to/ajax/read/9?lang=en&vrf=a%2Bb%3D",
        )]);

        let token = interceptor
            .extract_vrf_token("https://site.to/watch/9", 5_000)
            .await
            .unwrap();

        assert_eq!(token.as_deref(), Some("a+b="));
    }

    #[tokio::test]
    async fn test_no_token_is_none() {
        let (interceptor, _probe) = interceptor(vec![Step::request("/a?x=1"), Step::Finish]);

        let token = interceptor
            .extract_vrf_token("https://site.to/watch/5", 1_000)
            .await
            .unwrap();

        assert!(token.is_none());
    }

    #[tokio::test]
    async fn test_token_failure_propagates() {
        let (interceptor, _probe) = interceptor(vec![Step::Fail("connection reset".into())]);

        let err = interceptor
            .extract_vrf_token("https://site.to/watch/5", 1_000)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_capture_urls() {
        let (interceptor, _probe) = interceptor(vec![
            Step::request("https://cdn.site.to/v/1.m3u8"),
            Step::request("https://site.to/poster.jpg"),
            Step::request("https://cdn.site.to/v/2.m3u8"),
            Step::Finish,
        ]);

        let urls = interceptor
            .capture_urls("https://site.to/watch/5", r"\.m3u8$", 1_000)
            .await
            .unwrap();

        assert_eq!(
            urls,
            vec!["https://cdn.site.to/v/1.m3u8", "https://cdn.site.to/v/2.m3u8"]
        );
    }

    #[tokio::test]
    async fn test_capture_urls_bad_pattern() {
        let (interceptor, probe) = interceptor(vec![Step::Finish]);

        let err = interceptor
            .capture_urls("https://site.to/", "(unclosed", 1_000)
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert_eq!(probe.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extract_generic_param() {
        let (interceptor, _probe) = interceptor(vec![
            Step::request("/api/session?sid=abc&ts=1"),
            Step::Finish,
        ]);

        let sid = interceptor
            .extract_query_param("https://site.to/", r"/api/session", "sid", 1_000)
            .await
            .unwrap();
        assert_eq!(sid.as_deref(), Some("abc"));
    }
}
