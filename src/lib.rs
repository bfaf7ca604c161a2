//! Startup connectivity probe for `MySQL`/`MariaDB` and `PostgreSQL`.
//!
//! dbprobe runs once at startup: it connects to the database named by the
//! DSN, reads the database name, enumerates its tables and logs the result.
//! An unreachable database is reported in a single log line and never fails
//! the run.

pub mod boot;
pub mod cli;
pub mod probe;
pub mod queries;
pub mod telemetry;
pub mod tls;
