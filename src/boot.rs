//! Boot sequence: an ordered list of startup hooks, run once by the host.

use crate::{probe::ConnectivityProbe, queries, tls::TlsConfig};
use anyhow::Result;
use async_trait::async_trait;
use dsn::DSN;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

/// A named, zero-argument startup hook.
///
/// Hooks are best-effort by contract: `run` never returns an error and never
/// stops the boot sequence.
#[async_trait]
pub trait StartupHook: Send + Sync {
    /// Hook name, used in log lines.
    fn name(&self) -> &'static str;

    /// Invoked exactly once during startup.
    async fn run(&self);
}

/// Startup hooks in registration order.
#[derive(Default)]
pub struct StartupSequence {
    hooks: Vec<Box<dyn StartupHook>>,
}

impl StartupSequence {
    #[must_use]
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Append a hook; hooks run in the order they were registered.
    pub fn register(&mut self, hook: Box<dyn StartupHook>) {
        self.hooks.push(hook);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook once. A panicking hook is contained and logged; the
    /// remaining hooks still run.
    pub async fn run(&self) {
        for hook in &self.hooks {
            debug!(hook = hook.name(), "running startup hook");

            if AssertUnwindSafe(hook.run()).catch_unwind().await.is_err() {
                warn!(hook = hook.name(), "startup hook panicked");
            }
        }
    }
}

/// Build the client handle for the DSN and run the boot sequence.
///
/// Hook failures never surface here: once the configuration is usable the
/// sequence completes and the process exits cleanly.
///
/// # Errors
///
/// Returns an error if the DSN names an unsupported driver.
pub async fn start(dsn: &DSN, tls: &TlsConfig) -> Result<()> {
    let source = queries::source(dsn, tls)?;

    let mut sequence = StartupSequence::new();
    sequence.register(Box::new(ConnectivityProbe::new(source)));

    info!(
        driver = %dsn.driver,
        hooks = sequence.len(),
        "startup sequence starting"
    );

    sequence.run().await;

    info!("startup sequence complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    };

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl StartupHook for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    struct Counter {
        hits: Arc<AtomicU32>,
    }

    #[async_trait]
    impl StartupHook for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn run(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Exploding;

    #[async_trait]
    impl StartupHook for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        async fn run(&self) {
            panic!("hook exploded");
        }
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut sequence = StartupSequence::new();
        sequence.register(Box::new(Recorder {
            name: "first",
            log: Arc::clone(&log),
        }));
        sequence.register(Box::new(Recorder {
            name: "second",
            log: Arc::clone(&log),
        }));
        sequence.register(Box::new(Recorder {
            name: "third",
            log: Arc::clone(&log),
        }));

        sequence.run().await;

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_hook_runs_exactly_once() {
        let hits = Arc::new(AtomicU32::new(0));

        let mut sequence = StartupSequence::new();
        sequence.register(Box::new(Counter {
            hits: Arc::clone(&hits),
        }));

        sequence.run().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_hook_does_not_stop_sequence() {
        let hits = Arc::new(AtomicU32::new(0));

        let mut sequence = StartupSequence::new();
        sequence.register(Box::new(Exploding));
        sequence.register(Box::new(Counter {
            hits: Arc::clone(&hits),
        }));

        sequence.run().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_sequence_completes() {
        let sequence = StartupSequence::new();
        assert!(sequence.is_empty());
        sequence.run().await;
    }

    #[tokio::test]
    async fn test_start_rejects_unsupported_driver() {
        let dsn = dsn::parse("redis://localhost/0").unwrap();
        let result = start(&dsn, &TlsConfig::default()).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("unsupported driver")
        );
    }
}
