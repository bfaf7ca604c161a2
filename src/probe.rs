//! Startup connectivity probe.
//!
//! One best-effort round trip against the configured database: read the name
//! of the bound database, enumerate its namespaces (tables), log the result.
//! Any failure is collapsed into a single log line; the probe never fails
//! the boot sequence.

use crate::boot::StartupHook;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Read-only view over a database client: the two metadata queries the probe
/// needs, nothing more.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Name of the database the handle is bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// server rejects the query.
    async fn database_name(&self) -> Result<String>;

    /// Names of the namespaces (tables) in the bound database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// server rejects the query.
    async fn namespaces(&self) -> Result<BTreeSet<String>>;
}

/// Outcome of one probe invocation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Collapsed error message, present only on failure.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure(message) => Some(message),
        }
    }
}

/// Result of one probe invocation
#[derive(Serialize, Deserialize, Debug)]
pub struct ConnectivityReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub namespaces: BTreeSet<String>,
    pub outcome: Outcome,
    pub time: String,
    pub runtime_ms: i64,
}

impl ConnectivityReport {
    #[must_use]
    pub fn success(database: String, namespaces: BTreeSet<String>, started: DateTime<Utc>) -> Self {
        let (time, runtime_ms) = stamp(started);

        Self {
            database: Some(database),
            namespaces,
            outcome: Outcome::Success,
            time,
            runtime_ms,
        }
    }

    #[must_use]
    pub fn failure(database: Option<String>, message: String, started: DateTime<Utc>) -> Self {
        let (time, runtime_ms) = stamp(started);

        Self {
            database,
            namespaces: BTreeSet::new(),
            outcome: Outcome::Failure(message),
            time,
            runtime_ms,
        }
    }

    /// Render the report as a single JSON line.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn stamp(started: DateTime<Utc>) -> (String, i64) {
    (
        started.to_rfc3339_opts(SecondsFormat::Secs, true),
        Utc::now().signed_duration_since(started).num_milliseconds(),
    )
}

/// One-shot connectivity check registered on the boot sequence.
///
/// The host constructs the client handle and passes it in. On success two
/// info lines are emitted, the database name and the namespace listing; on
/// failure a single warn line carries the collapsed error message. `run`
/// returns unconditionally so an unreachable database never blocks startup.
pub struct ConnectivityProbe {
    source: Box<dyn MetadataSource>,
}

impl ConnectivityProbe {
    #[must_use]
    pub fn new(source: Box<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Run both metadata queries, collapsing any error into the outcome.
    #[must_use]
    pub async fn check(&self) -> ConnectivityReport {
        let started = Utc::now();

        let database = match self.source.database_name().await {
            Ok(name) => name,
            Err(e) => return ConnectivityReport::failure(None, format!("{e:#}"), started),
        };

        match self.source.namespaces().await {
            Ok(namespaces) => ConnectivityReport::success(database, namespaces, started),
            Err(e) => ConnectivityReport::failure(Some(database), format!("{e:#}"), started),
        }
    }
}

#[async_trait]
impl StartupHook for ConnectivityProbe {
    fn name(&self) -> &'static str {
        "connectivity-probe"
    }

    async fn run(&self) {
        let report = self.check().await;

        match &report.outcome {
            Outcome::Success => {
                let database = report.database.as_deref().unwrap_or_default();
                info!(%database, "database connection established");
                info!(
                    count = report.namespaces.len(),
                    namespaces = ?report.namespaces,
                    "database namespaces enumerated"
                );
            }
            Outcome::Failure(error) => {
                warn!(%error, "database connectivity check failed");
            }
        }

        let json = report.to_json();
        debug!("connectivity report: {json}");
    }
}
