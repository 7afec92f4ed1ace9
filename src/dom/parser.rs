// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML parser using html5ever
//!
//! Walks the parsed tree once and collects what the engine needs to emulate a
//! page load: title, sub-resources in document order, and scripts.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

use crate::browser::ResourceType;
use crate::error::Result;

/// A sub-resource referenced by the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub url: Url,
    pub kind: ResourceType,
}

/// A script in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    /// Inline `<script>` body
    Inline(String),
    /// `<script src>`; also listed in [`PageResources::resources`]
    External(Url),
}

/// Everything discovered in one document
#[derive(Debug, Clone, Default)]
pub struct PageResources {
    pub title: Option<String>,
    pub resources: Vec<Resource>,
    pub scripts: Vec<PageScript>,
}

/// Parse HTML and collect resources, resolving URLs against `page_url`
/// (or a `<base href>` if the document has one).
pub fn parse_page(html: &str, page_url: &Url) -> Result<PageResources> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let mut walker = Walker {
        base: page_url.clone(),
        page: PageResources::default(),
    };
    walker.walk(&dom.document);

    Ok(walker.page)
}

struct Walker {
    base: Url,
    page: PageResources,
}

impl Walker {
    fn walk(&mut self, handle: &Handle) {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = handle.data
        {
            let attr = |wanted: &str| {
                attrs
                    .borrow()
                    .iter()
                    .find(|a| &*a.name.local == wanted)
                    .map(|a| a.value.trim().to_string())
                    .filter(|v| !v.is_empty())
            };

            match &*name.local {
                "base" => {
                    if let Some(href) = attr("href") {
                        if let Ok(base) = self.base.join(&href) {
                            self.base = base;
                        }
                    }
                }
                "title" if self.page.title.is_none() => {
                    let title = text_content(handle);
                    let title = title.trim();
                    if !title.is_empty() {
                        self.page.title = Some(title.to_string());
                    }
                }
                "script" => {
                    if is_javascript(attr("type").as_deref()) {
                        match attr("src") {
                            Some(src) => {
                                if let Some(url) = self.resolve(&src) {
                                    self.push(url.clone(), ResourceType::Script);
                                    self.page.scripts.push(PageScript::External(url));
                                }
                            }
                            None => {
                                let code = text_content(handle);
                                if !code.trim().is_empty() {
                                    self.page.scripts.push(PageScript::Inline(code));
                                }
                            }
                        }
                    }
                    // Script bodies are text, not markup
                    return;
                }
                "img" => self.push_attr(attr("src"), ResourceType::Image),
                "iframe" | "frame" => self.push_attr(attr("src"), ResourceType::Frame),
                "video" | "audio" | "source" => self.push_attr(attr("src"), ResourceType::Media),
                "link" => {
                    let rel = attr("rel").unwrap_or_default().to_ascii_lowercase();
                    let kind = if rel.contains("stylesheet") {
                        Some(ResourceType::Stylesheet)
                    } else if rel.contains("icon") {
                        Some(ResourceType::Image)
                    } else if rel.contains("preload") {
                        Some(match attr("as").as_deref() {
                            Some("script") => ResourceType::Script,
                            Some("font") => ResourceType::Font,
                            Some("style") => ResourceType::Stylesheet,
                            Some("image") => ResourceType::Image,
                            _ => ResourceType::Other,
                        })
                    } else {
                        None
                    };
                    if let Some(kind) = kind {
                        self.push_attr(attr("href"), kind);
                    }
                }
                _ => {}
            }
        }

        for child in handle.children.borrow().iter() {
            self.walk(child);
        }
    }

    fn resolve(&self, reference: &str) -> Option<Url> {
        let url = self.base.join(reference).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }

    fn push_attr(&mut self, reference: Option<String>, kind: ResourceType) {
        if let Some(url) = reference.and_then(|r| self.resolve(&r)) {
            self.push(url, kind);
        }
    }

    fn push(&mut self, url: Url, kind: ResourceType) {
        self.page.resources.push(Resource { url, kind });
    }
}

fn is_javascript(script_type: Option<&str>) -> bool {
    match script_type {
        None => true,
        Some(t) => {
            let t = t.to_ascii_lowercase();
            t.is_empty() || t.contains("javascript") || t.contains("ecmascript")
        }
    }
}

fn text_content(handle: &Handle) -> String {
    let mut text = String::new();
    for child in handle.children.borrow().iter() {
        if let NodeData::Text { ref contents } = child.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}
