// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reqsnoop CLI - Request Interception for Script-Driven Pages

use std::env;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use reqsnoop::browser::DEFAULT_TIMEOUT_MS;
use reqsnoop::{
    EngineConfig, InterceptedRequest, InterceptionConfig, InterceptionSettings, Interceptor,
    InterceptorConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reqsnoop=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    let result = match args[1].as_str() {
        "intercept" => intercept(&args[2..]).await,
        "urls" => capture_urls(&args[2..]).await,
        "token" => extract_token(&args[2..]).await,
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(ExitCode::SUCCESS)
        }
        "--version" | "-v" | "version" => {
            println!("reqsnoop {}", reqsnoop::VERSION);
            Ok(ExitCode::SUCCESS)
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            Ok(ExitCode::from(1))
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Reqsnoop - Capture the requests a page's scripts send

USAGE:
    reqsnoop <COMMAND> [OPTIONS]

COMMANDS:
    intercept <url>            Load a page and list matching requests
    urls <url> <pattern>       List URLs of requests matching a pattern
    token <url>                Recover the vrf token from /ajax/read requests
    help                       Show this help message
    version                    Show version information

OPTIONS (intercept):
    --pattern <regex>          Only keep requests whose URL matches
    --filter <script>          Filter predicate, e.g. "return url.includes('api')"
    --timeout <ms>             Session timeout (default 15000)
    --max <n>                  Stop after n matching requests
    --script <js>              Script to run once the page has loaded
    --config <file>            Load interception settings from a JSON file
    --json                     Print requests as JSON

OPTIONS (urls, token):
    --timeout <ms>             Session timeout (default 15000)

EXIT CODES:
    0  success
    1  failure
    2  token not found

EXAMPLES:
    reqsnoop intercept https://example.com --pattern '/api/' --max 5
    reqsnoop urls https://example.com/watch/1 '\.m3u8'
    reqsnoop token https://example.com/watch/1 --timeout 20000
"#
    );
}

/// Parsed command-line options following the positional arguments
#[derive(Debug, Default)]
struct Options {
    positional: Vec<String>,
    pattern: Option<String>,
    filter: Option<String>,
    timeout_ms: Option<u64>,
    max_requests: Option<usize>,
    script: Option<String>,
    config: Option<String>,
    json: bool,
}

impl Options {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut options = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{} requires a value", name))
            };

            match arg.as_str() {
                "--pattern" => options.pattern = Some(value("--pattern")?),
                "--filter" => options.filter = Some(value("--filter")?),
                "--script" => options.script = Some(value("--script")?),
                "--config" => options.config = Some(value("--config")?),
                "--timeout" => {
                    let raw = value("--timeout")?;
                    options.timeout_ms =
                        Some(raw.parse().with_context(|| format!("invalid timeout '{}'", raw))?);
                }
                "--max" => {
                    let raw = value("--max")?;
                    options.max_requests =
                        Some(raw.parse().with_context(|| format!("invalid count '{}'", raw))?);
                }
                "--json" => options.json = true,
                flag if flag.starts_with("--") => bail!("unknown option {}", flag),
                _ => options.positional.push(arg.clone()),
            }
        }

        Ok(options)
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    /// Settings file first, then flags on top
    fn interception_config(&self) -> anyhow::Result<InterceptionConfig> {
        let mut settings = match &self.config {
            Some(path) => InterceptionSettings::from_file(path)
                .with_context(|| format!("failed to load settings from {}", path))?,
            None => InterceptionSettings::default(),
        };

        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if self.pattern.is_some() {
            settings.url_pattern = self.pattern.clone();
        }
        if self.filter.is_some() {
            settings.filter_script = self.filter.clone();
        }
        if self.max_requests.is_some() {
            settings.max_requests = self.max_requests;
        }
        if self.script.is_some() {
            settings.page_script = self.script.clone();
        }

        Ok(settings.into_config()?)
    }
}

fn launch() -> anyhow::Result<Interceptor> {
    let config = InterceptorConfig::new().engine(EngineConfig::for_token_capture());
    Interceptor::new(config).context("failed to start rendering engine")
}

fn required<'a>(options: &'a Options, index: usize, usage: &str) -> anyhow::Result<&'a str> {
    options
        .positional
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Usage: {}", usage))
}

async fn intercept(args: &[String]) -> anyhow::Result<ExitCode> {
    let options = Options::parse(args)?;
    let url = required(&options, 0, "reqsnoop intercept <url> [OPTIONS]")?;
    let config = options.interception_config()?;

    let interceptor = launch()?;
    let requests = interceptor.intercept_requests(url, config).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&requests)?);
    } else {
        print_requests(&requests);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_requests(requests: &[InterceptedRequest]) {
    println!("=== Captured Requests ({}) ===", requests.len());
    for request in requests {
        println!("  {} {}", request.method(), request.url());
        if let Some(body) = request.body_bytes() {
            println!("    body: {} bytes", body.len());
        }
    }
}

async fn capture_urls(args: &[String]) -> anyhow::Result<ExitCode> {
    let options = Options::parse(args)?;
    let usage = "reqsnoop urls <url> <pattern> [--timeout MS]";
    let url = required(&options, 0, usage)?;
    let pattern = required(&options, 1, usage)?;

    let interceptor = launch()?;
    let urls = interceptor
        .capture_urls(url, pattern, options.timeout_ms())
        .await?;

    for url in &urls {
        println!("{}", url);
    }

    Ok(ExitCode::SUCCESS)
}

async fn extract_token(args: &[String]) -> anyhow::Result<ExitCode> {
    let options = Options::parse(args)?;
    let url = required(&options, 0, "reqsnoop token <url> [--timeout MS]")?;

    let interceptor = launch()?;
    match interceptor.extract_vrf_token(url, options.timeout_ms()).await? {
        Some(token) => {
            println!("{}", token);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No vrf token found");
            Ok(ExitCode::from(2))
        }
    }
}
