// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Bundled headless engine
//!
//! Emulates a page load without a real browser: the document is fetched with
//! reqwest, sub-resources are discovered with html5ever, and page scripts run
//! in a boa sandbox whose network APIs only record. Every request the page
//! would dispatch is reported to the observer before anything else happens
//! with it; only the document and external scripts are actually fetched.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Client;
use tokio::task::JoinHandle;
use url::Url;

use super::config::{EngineConfig, ResourceType};
use super::engine::{EngineEvent, RenderingEngine, RequestObserver};
use crate::dom::{parse_page, PageScript};
use crate::error::{Error, Result};
use crate::js::{ScriptRequest, ScriptSandbox};
use crate::network::InterceptedRequest;

const MAX_REDIRECTS: usize = 10;

/// Observer slot and capture flag shared with the load task
#[derive(Default)]
struct EngineState {
    observer: RefCell<Option<RequestObserver>>,
    capturing: Cell<bool>,
}

impl EngineState {
    fn emit(&self, event: EngineEvent) {
        if !self.capturing.get() {
            return;
        }
        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(event);
        }
    }
}

/// Headless rendering engine. Not `Send`: create and drive it on the engine
/// thread.
pub struct HeadlessEngine {
    config: Rc<EngineConfig>,
    client: Client,
    state: Rc<EngineState>,
    task: RefCell<Option<JoinHandle<()>>>,
}

impl HeadlessEngine {
    /// Create an engine and its HTTP client
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(config.ignore_https_errors)
            .default_headers(headers)
            .cookie_store(true);

        if let Some(ref proxy_url) = config.proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy_url)
                    .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?,
            );
        }

        Ok(Self {
            config: Rc::new(config),
            client: builder.build()?,
            state: Rc::new(EngineState::default()),
            task: RefCell::new(None),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn abort_task(&self) {
        if let Some(handle) = self.task.borrow_mut().take() {
            handle.abort();
        }
    }
}

impl RenderingEngine for HeadlessEngine {
    fn load(&self, url: &str, page_script: Option<&str>) -> Result<()> {
        let url = Url::parse(url)?;
        self.abort_task();
        self.state.capturing.set(true);

        let load = PageLoad {
            url,
            page_script: page_script.map(String::from),
            client: self.client.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
        };
        *self.task.borrow_mut() = Some(tokio::task::spawn_local(load.run()));

        Ok(())
    }

    fn set_request_observer(&self, observer: Option<RequestObserver>) {
        *self.state.observer.borrow_mut() = observer;
    }

    fn stop_capturing(&self) {
        self.state.capturing.set(false);
        self.abort_task();
    }
}

/// One navigation, run as a local task
struct PageLoad {
    url: Url,
    page_script: Option<String>,
    client: Client,
    config: Rc<EngineConfig>,
    state: Rc<EngineState>,
}

impl PageLoad {
    async fn run(self) {
        self.state.emit(EngineEvent::LoadingChanged(true));
        let result = self.navigate().await;
        self.state.emit(EngineEvent::LoadingChanged(false));

        match result {
            Ok(()) => self.state.emit(EngineEvent::Finished),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Page load failed");
                self.state.emit(EngineEvent::Failed(e));
            }
        }
    }

    async fn navigate(&self) -> Result<()> {
        let mut document = InterceptedRequest::get(self.url.as_str())
            .header("user-agent", self.config.user_agent.as_str());
        for (name, value) in &self.config.default_headers {
            document = document.header(name, value.as_str());
        }
        self.state.emit(EngineEvent::Request(document));

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::navigation_failed(self.url.as_str(), None, e.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(Error::navigation_failed(
                self.url.as_str(),
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("HTTP error"),
            ));
        }

        let page_url = response.url().clone();
        if page_url != self.url {
            self.state.emit(EngineEvent::HistoryChanged(page_url.to_string()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::navigation_failed(page_url.as_str(), Some(status.as_u16()), e.to_string()))?;
        let page = parse_page(&html, &page_url)?;
        if let Some(title) = &page.title {
            self.state.emit(EngineEvent::TitleChanged(title.clone()));
        }

        for resource in &page.resources {
            self.dispatch(InterceptedRequest::get(resource.url.as_str()), &resource.url, resource.kind);
        }

        if !self.config.javascript_enabled {
            return Ok(());
        }

        let mut sandbox = ScriptSandbox::new(&page_url, &self.config.user_agent, page.title.as_deref())?;

        for script in &page.scripts {
            let source = match script {
                PageScript::Inline(code) => code.clone(),
                PageScript::External(src) => match self.fetch_script(src).await {
                    Some(code) => code,
                    None => continue,
                },
            };
            if let Err(e) = sandbox.execute(&source) {
                tracing::debug!(url = %page_url, error = %e, "Page script failed");
            }
            self.drain(&mut sandbox, &page_url);
        }

        if let Some(code) = &self.page_script {
            if let Err(e) = sandbox.execute(code) {
                tracing::warn!(url = %page_url, error = %e, "Injected script failed");
            }
            self.drain(&mut sandbox, &page_url);
        }

        for round in 0..self.config.max_timer_rounds {
            let ran = match sandbox.flush_timers() {
                Ok(ran) => ran,
                Err(e) => {
                    tracing::debug!(error = %e, "Timer flush failed");
                    break;
                }
            };
            self.drain(&mut sandbox, &page_url);
            if ran == 0 {
                break;
            }
            tracing::trace!(round, ran, "Timers flushed");
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    async fn fetch_script(&self, src: &Url) -> Option<String> {
        if !self.config.allows(src, ResourceType::Script) {
            return None;
        }

        let response = self
            .client
            .get(src.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let text = match response {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };

        match text {
            Ok(code) => Some(code),
            Err(e) => {
                tracing::debug!(url = %src, error = %e, "External script fetch failed");
                None
            }
        }
    }

    fn drain(&self, sandbox: &mut ScriptSandbox, page_url: &Url) {
        let requests = match sandbox.drain_requests() {
            Ok(requests) => requests,
            Err(e) => {
                tracing::debug!(error = %e, "Could not read script requests");
                return;
            }
        };

        for recorded in requests {
            let kind = script_resource_type(&recorded);
            let request = recorded.into_request(page_url);
            match Url::parse(request.url()) {
                Ok(url) => self.dispatch(request, &url, kind),
                Err(_) => tracing::trace!(url = %request.url(), "Unresolvable script request skipped"),
            }
        }
    }

    fn dispatch(&self, request: InterceptedRequest, url: &Url, kind: ResourceType) {
        if !matches!(url.scheme(), "http" | "https") {
            return;
        }
        if !self.config.allows(url, kind) {
            tracing::trace!(url = %url, ?kind, "Request blocked");
            return;
        }
        self.state.emit(EngineEvent::Request(request));
    }
}

fn script_resource_type(request: &ScriptRequest) -> ResourceType {
    match request.kind.as_str() {
        "script" => ResourceType::Script,
        "image" => ResourceType::Image,
        _ => ResourceType::Xhr,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::LocalSet;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::browser::config::InterceptionConfig;
    use crate::browser::session::CaptureSession;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Episode 5</title>
  <script src="/static/app.js"></script>
  <link rel="stylesheet" href="/static/site.css">
</head>
<body>
  <img src="/img/poster.jpg">
  <script>
    var id = 5;
    setTimeout(function () { fetch('/ajax/read/' + id + '?vrf=' + btoa('tok')); }, 100);
  </script>
</body>
</html>"#;

    async fn site() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch/5"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/static/app.js"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("fetch('/ajax/episode/list/' + 5);", "application/javascript"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    async fn capture(
        engine: HeadlessEngine,
        url: &str,
        config: InterceptionConfig,
    ) -> Result<Vec<InterceptedRequest>> {
        let engine: Rc<dyn RenderingEngine> = Rc::new(engine);
        CaptureSession::new(config)
            .run(engine, url, CancellationToken::new())
            .await
    }

    fn paths(requests: &[InterceptedRequest]) -> Vec<String> {
        requests
            .iter()
            .map(|r| {
                let url = Url::parse(r.url()).unwrap();
                match url.query() {
                    Some(q) => format!("{}?{}", url.path(), q),
                    None => url.path().to_string(),
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_reports_page_and_script_requests() {
        let server = site().await;
        let url = format!("{}/watch/5", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::for_token_capture()).unwrap();
                let requests = capture(engine, &url, InterceptionConfig::with_timeout(5_000).unwrap())
                    .await
                    .unwrap();

                assert_eq!(
                    paths(&requests),
                    vec![
                        "/watch/5",
                        "/static/app.js",
                        "/ajax/episode/list/5",
                        "/ajax/read/5?vrf=dG9r",
                    ]
                );
                assert!(requests[0].header_value("user-agent").is_some());
            })
            .await;
    }

    #[tokio::test]
    async fn test_vrf_request_captured() {
        let server = site().await;
        let url = format!("{}/watch/5", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::for_token_capture()).unwrap();
                let config = InterceptionConfig::builder(5_000)
                    .url_pattern(r"/ajax/read/.*[?&]vrf=([^&]+)")
                    .max_requests(1)
                    .build()
                    .unwrap();

                let requests = capture(engine, &url, config).await.unwrap();

                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].query_param("vrf").as_deref(), Some("dG9r"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_unblocked_resources_reported() {
        let server = site().await;
        let url = format!("{}/watch/5", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::default().javascript_enabled(false)).unwrap();
                let requests = capture(engine, &url, InterceptionConfig::with_timeout(5_000).unwrap())
                    .await
                    .unwrap();

                assert_eq!(
                    paths(&requests),
                    vec!["/watch/5", "/static/app.js", "/static/site.css", "/img/poster.jpg"]
                );
            })
            .await;
    }

    #[tokio::test]
    async fn test_page_script_runs_after_page() {
        let server = site().await;
        let url = format!("{}/watch/5", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::for_token_capture()).unwrap();
                let config = InterceptionConfig::builder(5_000)
                    .filter_script("return url.includes('/player/')")
                    .page_script("var x = new XMLHttpRequest(); x.open('GET', '/player/' + id); x.send();")
                    .build()
                    .unwrap();

                let requests = capture(engine, &url, config).await.unwrap();

                assert_eq!(paths(&requests), vec!["/player/5"]);
            })
            .await;
    }

    #[tokio::test]
    async fn test_http_error_fails_session() {
        let server = site().await;
        let url = format!("{}/gone", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::default()).unwrap();
                let err = capture(engine, &url, InterceptionConfig::with_timeout(5_000).unwrap())
                    .await
                    .unwrap_err();

                assert_eq!(err.status_code(), Some(404));
            })
            .await;
    }

    #[tokio::test]
    async fn test_invalid_url_fails_session() {
        LocalSet::new()
            .run_until(async {
                let engine = HeadlessEngine::new(EngineConfig::default()).unwrap();
                let err = capture(engine, "not a url", InterceptionConfig::with_timeout(1_000).unwrap())
                    .await
                    .unwrap_err();

                assert!(matches!(err, Error::Url(_)));
            })
            .await;
    }

    #[tokio::test]
    async fn test_stop_suppresses_events() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<script>fetch('/late')</script>", "text/html")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        let url = format!("{}/slow", server.uri());

        LocalSet::new()
            .run_until(async move {
                let engine = HeadlessEngine::new(EngineConfig::default()).unwrap();
                let events = Rc::new(RefCell::new(Vec::new()));
                let sink = events.clone();
                engine.set_request_observer(Some(Rc::new(move |event: EngineEvent| {
                    sink.borrow_mut().push(format!("{:?}", event));
                })));

                engine.load(&url, None).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
                engine.stop_capturing();
                let seen = events.borrow().len();

                tokio::time::sleep(Duration::from_millis(700)).await;
                assert_eq!(events.borrow().len(), seen);
                assert!(events.borrow().iter().all(|e| !e.contains("late")));
            })
            .await;
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let err = HeadlessEngine::new(EngineConfig::default().proxy("::not a proxy::"))
            .err()
            .unwrap();
        assert!(err.is_config());
    }
}
