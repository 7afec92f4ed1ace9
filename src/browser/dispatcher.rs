// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Engine thread
//!
//! Rendering engines are not thread-safe (the bundled one holds a boa
//! `Context`), so every engine operation runs on one dedicated thread with a
//! current-thread runtime and a `LocalSet`. Callers on any runtime hand work
//! over with [`EngineDispatcher::run`] and await the result.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::LocalSet;

use super::engine::{EngineFactory, EngineManager, RenderingEngine};
use crate::error::{Error, Result};

type Job = Box<dyn FnOnce(Rc<EngineHost>) -> LocalBoxFuture<'static, ()> + Send>;

/// Engine-thread state handed to every job
pub struct EngineHost {
    manager: RefCell<EngineManager>,
}

impl EngineHost {
    fn new(factory: EngineFactory) -> Self {
        Self {
            manager: RefCell::new(EngineManager::new(factory)),
        }
    }

    /// Cached engine, created on miss
    pub fn acquire(&self) -> Result<Rc<dyn RenderingEngine>> {
        self.manager.borrow_mut().acquire()
    }

    /// Drop the cached engine
    pub fn invalidate(&self) -> bool {
        self.manager.borrow_mut().invalidate()
    }

    /// Number of engines created so far
    pub fn generation(&self) -> u64 {
        self.manager.borrow().generation()
    }
}

/// Handle to the engine thread. Dropping it shuts the thread down.
pub struct EngineDispatcher {
    jobs: mpsc::UnboundedSender<Job>,
}

impl EngineDispatcher {
    /// Start the engine thread. The factory runs there, lazily.
    pub fn spawn(factory: EngineFactory) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();

        std::thread::Builder::new()
            .name("reqsnoop-engine".to_string())
            .spawn(move || {
                let host = Rc::new(EngineHost::new(factory));
                let local = LocalSet::new();
                local.block_on(&runtime, async move {
                    while let Some(job) = rx.recv().await {
                        tokio::task::spawn_local(job(host.clone()));
                    }
                });
                tracing::debug!("Engine thread stopped");
            })?;

        Ok(Self { jobs })
    }

    /// Run `f` on the engine thread and return its output
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Rc<EngineHost>) -> Fut + Send + 'static,
        Fut: Future<Output = T> + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |host: Rc<EngineHost>| {
            async move {
                let _ = tx.send(f(host).await);
            }
            .boxed_local()
        });

        self.jobs.send(job).map_err(|_| Error::EngineClosed)?;
        rx.await.map_err(|_| Error::EngineClosed)
    }

    /// Whether the engine thread is still accepting work
    pub fn is_running(&self) -> bool {
        !self.jobs.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::browser::testing::{scripted_factory, EngineProbe};

    #[tokio::test]
    async fn test_jobs_run_on_engine_thread() {
        let dispatcher = EngineDispatcher::spawn(scripted_factory(vec![], EngineProbe::new())).unwrap();

        let name = dispatcher
            .run(|_host| async { std::thread::current().name().map(String::from) })
            .await
            .unwrap();

        assert_eq!(name.as_deref(), Some("reqsnoop-engine"));
        assert!(dispatcher.is_running());
    }

    #[tokio::test]
    async fn test_engine_cached_across_jobs() {
        let probe = EngineProbe::new();
        let dispatcher = EngineDispatcher::spawn(scripted_factory(vec![], probe.clone())).unwrap();

        for _ in 0..3 {
            dispatcher
                .run(|host| async move { host.acquire().map(|_| ()) })
                .await
                .unwrap()
                .unwrap();
        }
        assert_eq!(probe.created.load(Ordering::SeqCst), 1);

        let dropped = dispatcher.run(|host| async move { host.invalidate() }).await.unwrap();
        assert!(dropped);

        let generation = dispatcher
            .run(|host| async move {
                let _ = host.acquire();
                host.generation()
            })
            .await
            .unwrap();
        assert_eq!(generation, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_from_multi_thread_runtime() {
        let dispatcher = EngineDispatcher::spawn(scripted_factory(vec![], EngineProbe::new())).unwrap();

        let value = dispatcher
            .run(|_host| async {
                tokio::task::yield_now().await;
                41 + 1
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let dispatcher = EngineDispatcher::spawn(scripted_factory(vec![], EngineProbe::new())).unwrap();

        let created = tokio_test::block_on(dispatcher.run(|host| async move { host.acquire().is_ok() }))
            .unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn test_panicking_job_reports_closed() {
        let dispatcher = EngineDispatcher::spawn(scripted_factory(vec![], EngineProbe::new())).unwrap();

        let err = dispatcher
            .run(|_host| async {
                if true {
                    panic!("engine crashed");
                }
                0u8
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EngineClosed));

        // The engine thread keeps serving later jobs
        assert_eq!(dispatcher.run(|_host| async { 7u8 }).await.unwrap(), 7);
    }
}
