// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Script sandbox using boa_engine
//!
//! One sandbox per page load. All scripts of the page share its global
//! object, and requests they issue through `fetch`, `XMLHttpRequest`,
//! `navigator.sendBeacon` or dynamic `<script>`/`<img>` elements are recorded
//! and drained by the engine.

use std::collections::HashMap;

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use boa_engine::{Context, JsError, JsNativeError, JsResult, JsString, JsValue, NativeFunction, Source};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::network::InterceptedRequest;

const PRELUDE: &str = include_str!("prelude.js");

/// Iteration cap for a single loop, so a hostile script cannot hang the engine
const LOOP_ITERATION_LIMIT: u64 = 10_000_000;

/// `atob` accepts input with or without padding
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A request recorded inside the sandbox
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptRequest {
    pub kind: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl ScriptRequest {
    /// Convert to an intercepted request, resolving the URL against `base`
    pub fn into_request(self, base: &Url) -> InterceptedRequest {
        let url = base
            .join(&self.url)
            .map(|u| u.to_string())
            .unwrap_or(self.url);

        let request = InterceptedRequest::new(self.method, url).headers(self.headers);
        match self.body {
            Some(body) => request.body(body),
            None => request,
        }
    }
}

/// Page script sandbox (not `Send`; lives on the engine thread)
pub struct ScriptSandbox {
    context: Context,
}

impl ScriptSandbox {
    /// Create a sandbox whose `location` reflects `page_url`
    pub fn new(page_url: &Url, user_agent: &str, title: Option<&str>) -> Result<Self> {
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(LOOP_ITERATION_LIMIT);

        let env = serde_json::json!({
            "userAgent": user_agent,
            "title": title,
            "location": {
                "href": page_url.as_str(),
                "origin": page_url.origin().ascii_serialization(),
                "protocol": format!("{}:", page_url.scheme()),
                "host": match page_url.port() {
                    Some(port) => format!("{}:{}", page_url.host_str().unwrap_or_default(), port),
                    None => page_url.host_str().unwrap_or_default().to_string(),
                },
                "hostname": page_url.host_str().unwrap_or_default(),
                "port": page_url.port().map(|p| p.to_string()).unwrap_or_default(),
                "pathname": page_url.path(),
                "search": page_url.query().map(|q| format!("?{}", q)).unwrap_or_default(),
                "hash": page_url.fragment().map(|f| format!("#{}", f)).unwrap_or_default(),
            },
        });

        install_base64(&mut context)?;

        let bootstrap = format!("var __reqsnoopEnv = {};\n{}", env, PRELUDE);
        eval(&mut context, &bootstrap)?;

        Ok(Self { context })
    }

    /// Run a script and any promise jobs it queued
    pub fn execute(&mut self, code: &str) -> Result<()> {
        let result = eval(&mut self.context, code);
        self.context.run_jobs();
        result.map(|_| ())
    }

    /// Run every queued timer once. Returns how many ran.
    pub fn flush_timers(&mut self) -> Result<usize> {
        let ran = eval(&mut self.context, "__reqsnoop.flushTimers()")?;
        self.context.run_jobs();
        Ok(ran.as_number().unwrap_or_default() as usize)
    }

    /// Take every request recorded since the last drain, in issue order
    pub fn drain_requests(&mut self) -> Result<Vec<ScriptRequest>> {
        let value = eval(&mut self.context, "__reqsnoop.drain()")?;
        let json = value
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| Error::js("request log is not a string"))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Register `btoa`/`atob` as natives
fn install_base64(context: &mut Context) -> Result<()> {
    context
        .register_global_builtin_callable("btoa".into(), 1, NativeFunction::from_fn_ptr(btoa))
        .map_err(|e| Error::js(format!("Failed to register btoa: {:?}", e)))?;
    context
        .register_global_builtin_callable("atob".into(), 1, NativeFunction::from_fn_ptr(atob))
        .map_err(|e| Error::js(format!("Failed to register atob: {:?}", e)))?;
    Ok(())
}

fn string_arg(args: &[JsValue], context: &mut Context) -> JsResult<JsString> {
    args.first().cloned().unwrap_or_else(JsValue::undefined).to_string(context)
}

fn invalid_character(message: &'static str) -> JsError {
    JsNativeError::error()
        .with_message(format!("InvalidCharacterError: {}", message))
        .into()
}

/// Latin-1 string to base64; anything above U+00FF throws
fn btoa(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input = string_arg(args, context)?
        .to_std_string()
        .map_err(|_| invalid_character("btoa: string contains unpaired surrogates"))?;

    let bytes = input
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| invalid_character("btoa: string contains characters outside of the Latin1 range"))?;

    Ok(JsValue::from(JsString::from(STANDARD.encode(bytes).as_str())))
}

/// base64 to a Latin-1 string; malformed input throws
fn atob(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let input: String = string_arg(args, context)?
        .to_std_string_escaped()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = FORGIVING
        .decode(input.as_bytes())
        .map_err(|_| invalid_character("atob: string is not correctly encoded"))?;

    let decoded: String = bytes.into_iter().map(char::from).collect();
    Ok(JsValue::from(JsString::from(decoded.as_str())))
}

fn eval(context: &mut Context, code: &str) -> Result<JsValue> {
    context
        .eval(Source::from_bytes(code))
        .map_err(|e| Error::js(e.to_string()))
}
