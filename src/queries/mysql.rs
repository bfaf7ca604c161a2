use anyhow::{Context, Result};
use async_trait::async_trait;
use dsn::DSN;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use std::collections::BTreeSet;

use crate::probe::MetadataSource;
use crate::tls::{TlsConfig, TlsMode};

/// `MySQL`/`MariaDB` metadata source.
pub struct MySqlSource {
    pool: MySqlPool,
}

impl MySqlSource {
    /// Build the source from a DSN without touching the network; the single
    /// pooled connection is established on first use.
    #[must_use]
    pub fn connect_lazy(dsn: &DSN, tls: &TlsConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .username(dsn.username.clone().unwrap_or_default().as_ref())
            .password(dsn.password.clone().unwrap_or_default().as_str())
            .database(dsn.database.clone().unwrap_or_default().as_ref());

        if let Some(host) = &dsn.host {
            options = options.host(host.as_str()).port(dsn.port.unwrap_or(3306));
        } else if let Some(socket) = &dsn.socket {
            options = options.socket(socket.as_str());
        }

        // Apply TLS configuration
        options = match tls.mode {
            TlsMode::Disable => options.ssl_mode(MySqlSslMode::Disabled),
            TlsMode::Require => options.ssl_mode(MySqlSslMode::Required),
            TlsMode::VerifyCA => {
                let mut opts = options.ssl_mode(MySqlSslMode::VerifyCa);
                if let Some(ca_path) = &tls.ca {
                    opts = opts.ssl_ca(ca_path);
                }
                opts
            }
            TlsMode::VerifyFull => {
                let mut opts = options.ssl_mode(MySqlSslMode::VerifyIdentity);
                if let Some(ca_path) = &tls.ca {
                    opts = opts.ssl_ca(ca_path);
                }
                opts
            }
        };

        // Apply client certificate if provided
        if let (Some(cert_path), Some(key_path)) = (&tls.cert, &tls.key) {
            options = options.ssl_client_cert(cert_path).ssl_client_key(key_path);
        }

        // One connection is all the probe ever queries on
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(options);

        Self { pool }
    }
}

#[async_trait]
impl MetadataSource for MySqlSource {
    async fn database_name(&self) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar("SELECT DATABASE()")
            .fetch_one(&self.pool)
            .await
            .context("Failed to fetch database name")?;

        // SELECT DATABASE() is NULL when the DSN carries no schema
        name.context("Connection has no default schema selected")
    }

    async fn namespaces(&self) -> Result<BTreeSet<String>> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list tables")?;

        Ok(tables.into_iter().collect())
    }
}
