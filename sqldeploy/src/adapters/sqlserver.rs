//! SQL Server connector with access-token authentication.
//!
//! This module provides the tiberius-backed implementation of the
//! deployment connection capabilities:
//! - Token passed in the login packet, never in a connection string
//! - Encryption required and the server certificate validated
//! - One Azure SQL gateway redirect followed
//! - Sessions left in autocommit mode, so each batch commits on its own
//! - Batches sent as plain SQL batches, so `USE` and `SET` options carry
//!   over to the batches that follow

use async_trait::async_trait;
use sqldeploy_core::{
    Connection, ConnectionTarget, Connector, DeployError, EncodedToken, ExecutionError, Result,
};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type SqlClient = Client<Compat<TcpStream>>;

/// Opens SQL Server sessions authenticated with an access token.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerConnector;

impl SqlServerConnector {
    /// Builds the tiberius configuration for `target`.
    ///
    /// # Errors
    /// Returns an authentication error if the token payload is malformed.
    pub fn build_config(target: &ConnectionTarget, token: &EncodedToken) -> Result<Config> {
        let secret = token
            .decode_secret()
            .map_err(|e| DeployError::authentication("Token payload is malformed", e))?;

        let mut config = Config::new();
        config.host(&target.server);
        config.port(target.port);
        config.database(&target.database);
        config.encryption(EncryptionLevel::Required);
        config.application_name("sqldeploy");
        config.authentication(AuthMethod::aad_token(secret.as_str()));

        Ok(config)
    }
}

#[async_trait]
impl Connector for SqlServerConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        token: &EncodedToken,
    ) -> Result<Box<dyn Connection>> {
        let config = Self::build_config(target, token)?;

        let client = tokio::time::timeout(target.connect_timeout, open(config))
            .await
            .map_err(|_| {
                DeployError::connection(format!(
                    "No session established within {:?}",
                    target.connect_timeout
                ))
            })??;

        tracing::debug!("Connected to {}", target.safe_description());

        Ok(Box::new(SqlServerConnection {
            client: Some(client),
        }))
    }
}

/// Connects, following a single gateway redirect.
async fn open(mut config: Config) -> Result<SqlClient> {
    let tcp = tcp_connect(&config).await?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        Err(tiberius::error::Error::Routing { host, port }) => {
            tracing::debug!("Gateway redirected session to {}:{}", host, port);
            config.host(&host);
            config.port(port);

            let tcp = tcp_connect(&config).await?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| DeployError::connection_failed("Login after redirect failed", e))
        }
        Err(e) => Err(DeployError::connection_failed("Login failed", e)),
    }
}

async fn tcp_connect(config: &Config) -> Result<TcpStream> {
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|e| DeployError::connection_failed("TCP connect failed", e))?;

    tcp.set_nodelay(true)
        .map_err(|e| DeployError::connection_failed("TCP configuration failed", e))?;

    Ok(tcp)
}

/// Open SQL Server session.
struct SqlServerConnection {
    client: Option<SqlClient>,
}

#[async_trait]
impl Connection for SqlServerConnection {
    async fn execute(&mut self, sql: &str) -> std::result::Result<Option<u64>, ExecutionError> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| ExecutionError::new("Connection already closed"))?;

        // Not `Client::execute`: it wraps the batch in sp_executesql, which
        // scopes session settings to the call.
        client
            .simple_query(sql)
            .await
            .map_err(|e| ExecutionError::new(describe(&e)))?
            .into_results()
            .await
            .map_err(|e| ExecutionError::new(describe(&e)))?;

        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| DeployError::connection_failed("Closing session failed", e))?;
        }
        Ok(())
    }
}

/// Engine error text without the driver's wrapping.
fn describe(error: &tiberius::error::Error) -> String {
    match error {
        tiberius::error::Error::Server(token) => format!(
            "{} (code {}, line {})",
            token.message(),
            token.code(),
            token.line()
        ),
        other => other.to_string(),
    }
}
