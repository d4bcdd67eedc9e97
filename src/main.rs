use autoschematic_core::tarpc_bridge::tarpc_connector_main;
use connector::SnowflakeGrantConnector;

pub mod addr;
pub mod config;
pub mod connector;
pub mod error;
pub mod grant;
pub mod grant_id;
pub mod op;
pub mod plan;
pub mod resource;
pub mod util;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tarpc_connector_main::<SnowflakeGrantConnector>().await?;
    Ok(())
}
