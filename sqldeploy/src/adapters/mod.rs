//! Concrete credential and database adapters.
//!
//! - [`azure_cli`]: tokens from the signed-in Azure CLI session
//! - [`sqlserver`]: tiberius-backed SQL Server connector (feature `mssql`)

pub mod azure_cli;

#[cfg(feature = "mssql")]
pub mod sqlserver;

use sqldeploy_core::{Connector, Deployer, Result, TokenProvider};

/// Token provider used for real deployments.
pub fn create_provider() -> Box<dyn TokenProvider> {
    Box::new(azure_cli::AzureCliCredential::default())
}

/// Database connector used for real deployments.
///
/// # Errors
/// Returns a configuration error when built without the `mssql` feature.
pub fn create_connector() -> Result<Box<dyn Connector>> {
    #[cfg(feature = "mssql")]
    {
        Ok(Box::new(sqlserver::SqlServerConnector))
    }
    #[cfg(not(feature = "mssql"))]
    {
        Err(sqldeploy_core::DeployError::configuration(
            "SQL Server support not available. Compile with --features mssql",
        ))
    }
}

/// Deployer wired to the Azure CLI and SQL Server.
///
/// # Errors
/// Returns a configuration error when no connector is available.
pub fn create_deployer() -> Result<Deployer> {
    Ok(Deployer::new(create_provider(), create_connector()?))
}
