// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Scripted engine for tests
//!
//! Replays a fixed list of steps on every `load`, on the engine thread's
//! `LocalSet`. Counters live in a shared [`EngineProbe`] so tests on other
//! threads can inspect them.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::engine::{EngineEvent, EngineFactory, RenderingEngine, RequestObserver};
use crate::error::{Error, Result};
use crate::network::InterceptedRequest;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Request(String),
    Finish,
    Fail(String),
    Title(String),
    Wait(Duration),
}

impl Step {
    pub(crate) fn request(url: &str) -> Self {
        Step::Request(url.to_string())
    }

    pub(crate) fn wait_ms(ms: u64) -> Self {
        Step::Wait(Duration::from_millis(ms))
    }
}

#[derive(Debug, Default)]
pub(crate) struct EngineProbe {
    pub created: AtomicUsize,
    pub loads: AtomicUsize,
    pub stops: AtomicUsize,
    pub detaches: AtomicUsize,
    pub delivered: AtomicUsize,
    pub alive: AtomicBool,
    pub last_page_script: parking_lot::Mutex<Option<String>>,
}

impl EngineProbe {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            alive: AtomicBool::new(true),
            ..Default::default()
        })
    }
}

pub(crate) struct ScriptedEngine {
    steps: Vec<Step>,
    observer: Rc<RefCell<Option<RequestObserver>>>,
    replay: RefCell<Option<JoinHandle<()>>>,
    probe: Arc<EngineProbe>,
}

impl ScriptedEngine {
    pub(crate) fn new(steps: Vec<Step>, probe: Arc<EngineProbe>) -> Self {
        Self {
            steps,
            observer: Rc::new(RefCell::new(None)),
            replay: RefCell::new(None),
            probe,
        }
    }

    fn abort_replay(&self) {
        if let Some(handle) = self.replay.borrow_mut().take() {
            handle.abort();
        }
    }
}

impl RenderingEngine for ScriptedEngine {
    fn load(&self, _url: &str, page_script: Option<&str>) -> Result<()> {
        self.probe.loads.fetch_add(1, Ordering::SeqCst);
        *self.probe.last_page_script.lock() = page_script.map(String::from);
        self.abort_replay();

        let steps = self.steps.clone();
        let slot = self.observer.clone();
        let probe = self.probe.clone();

        let handle = tokio::task::spawn_local(async move {
            for step in steps {
                let event = match step {
                    Step::Wait(duration) => {
                        tokio::time::sleep(duration).await;
                        continue;
                    }
                    Step::Request(url) => EngineEvent::Request(InterceptedRequest::get(url)),
                    Step::Finish => EngineEvent::Finished,
                    Step::Fail(reason) => EngineEvent::Failed(Error::navigation_failed(
                        "scripted://page",
                        None,
                        reason,
                    )),
                    Step::Title(title) => EngineEvent::TitleChanged(title),
                };

                let observer = slot.borrow().clone();
                if let Some(observer) = observer {
                    probe.delivered.fetch_add(1, Ordering::SeqCst);
                    observer(event);
                }
            }
        });
        *self.replay.borrow_mut() = Some(handle);

        Ok(())
    }

    fn set_request_observer(&self, observer: Option<RequestObserver>) {
        if observer.is_none() {
            self.probe.detaches.fetch_add(1, Ordering::SeqCst);
        }
        *self.observer.borrow_mut() = observer;
    }

    fn stop_capturing(&self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.abort_replay();
    }

    fn is_alive(&self) -> bool {
        self.probe.alive.load(Ordering::SeqCst)
    }
}

pub(crate) fn scripted_factory(steps: Vec<Step>, probe: Arc<EngineProbe>) -> EngineFactory {
    Box::new(move || {
        probe.created.fetch_add(1, Ordering::SeqCst);
        probe.alive.store(true, Ordering::SeqCst);
        Ok(Rc::new(ScriptedEngine::new(steps.clone(), probe.clone())) as Rc<dyn RenderingEngine>)
    })
}
