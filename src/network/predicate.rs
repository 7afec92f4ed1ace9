// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Filter-script predicates
//!
//! A filter script is a small script fragment whose `return` expression is an
//! OR of ANDs of `url.includes('...')` tests, e.g.
//!
//! ```text
//! return url.includes('/ajax/') && url.includes('vrf=') || url.includes('token');
//! ```
//!
//! Only that shape is understood. Parsing never fails: a missing or empty
//! `return` expression matches every URL, and a term of any other shape makes
//! its clause false without affecting the other clauses.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;

lazy_static! {
    static ref INCLUDES_TERM: Regex =
        Regex::new(r#"^url\.includes\(\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#)
            .expect("includes term regex");
    static ref RETURN_KEYWORD: Regex = Regex::new(r"\breturn\b").expect("return keyword regex");
}

/// A URL predicate applied to every observed request.
///
/// Errors returned from [`UrlPredicate::test`] are never fatal: the classifier
/// treats them as a non-match for that single request.
pub trait UrlPredicate: Send + Sync + fmt::Debug {
    /// Decide whether `url` matches
    fn test(&self, url: &str) -> Result<bool>;
}

/// Single test inside a clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `url.includes('needle')`
    Includes(String),
    /// Anything else; always false
    Unrecognized(String),
}

impl Term {
    fn parse(text: &str) -> Self {
        match INCLUDES_TERM.captures(text) {
            Some(caps) => {
                let needle = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                Term::Includes(needle.to_string())
            }
            None => Term::Unrecognized(text.to_string()),
        }
    }

    fn eval(&self, url: &str) -> bool {
        match self {
            Term::Includes(needle) => url.contains(needle.as_str()),
            Term::Unrecognized(_) => false,
        }
    }
}

/// Conjunction of terms. An empty clause is vacuously true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    terms: Vec<Term>,
}

impl Clause {
    fn parse(text: &str) -> Self {
        let text = strip_outer_parens(text.trim());
        let terms = text
            .split("&&")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Term::parse)
            .collect();
        Self { terms }
    }

    /// Terms of this clause
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn eval(&self, url: &str) -> bool {
        self.terms.iter().all(|t| t.eval(url))
    }
}

/// Parsed filter script: OR of [`Clause`]s, or match-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterScript {
    source: String,
    clauses: Option<Vec<Clause>>,
}

impl FilterScript {
    /// Parse a filter script. Never fails.
    pub fn parse(script: &str) -> Self {
        let clauses = return_expression(script).map(|expr| {
            expr.split("||").map(Clause::parse).collect::<Vec<_>>()
        });

        Self {
            source: script.to_string(),
            clauses,
        }
    }

    /// Original script text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this script matches every URL
    pub fn matches_all(&self) -> bool {
        self.clauses.is_none()
    }

    /// Parsed clauses, `None` for match-all
    pub fn clauses(&self) -> Option<&[Clause]> {
        self.clauses.as_deref()
    }

    /// Evaluate against a URL
    pub fn matches(&self, url: &str) -> bool {
        match &self.clauses {
            None => true,
            Some(clauses) => clauses.iter().any(|c| c.eval(url)),
        }
    }
}

impl UrlPredicate for FilterScript {
    fn test(&self, url: &str) -> Result<bool> {
        Ok(self.matches(url))
    }
}

/// Evaluate `expression` against `url` in one step
pub fn evaluate(expression: &str, url: &str) -> bool {
    FilterScript::parse(expression).matches(url)
}

/// Text after the last `return` keyword up to the first `;`, trimmed.
fn return_expression(script: &str) -> Option<&str> {
    let start = RETURN_KEYWORD.find_iter(script).last()?.end();
    let rest = &script[start..];
    let expr = rest.split(';').next().unwrap_or_default().trim();
    if expr.is_empty() {
        None
    } else {
        Some(expr)
    }
}

fn strip_outer_parens(text: &str) -> &str {
    match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => inner.trim(),
        None => text,
    }
}
