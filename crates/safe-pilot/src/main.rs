//! Safe-Pilot: drives one Safe transaction-lifecycle operation per run.

use eyre::WrapErr;

use safe_pilot_adapters::{
    AppConfig, ChainClient, CustodySigner, Operation, RelayClient, TxServiceClient,
};
use safe_pilot_core::{Orchestrator, SafeHasher};

mod ops;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = AppConfig::from_env().wrap_err("configuration")?;
    tracing::info!(
        chain_id = config.chain_id,
        operation = ?config.operation,
        strategy = ?config.strategy,
        "starting safe-pilot"
    );

    let signer = CustodySigner::connect(&config.vault, config.chain_id)
        .await
        .wrap_err("vault signer")?;
    let chain = ChainClient::connect(&config.rpc_url, signer.clone()).wrap_err("chain client")?;
    let tx_service = TxServiceClient::new(&config.tx_service_url);
    let relay = RelayClient::new(&config.relay_url, config.chain_id, config.relay_api_key.clone());
    let orchestrator =
        Orchestrator::new(signer, chain, tx_service, relay, SafeHasher, config.chain_id);

    match config.operation {
        Operation::Deploy => ops::deploy(&orchestrator).await,
        Operation::Propose => ops::propose(&orchestrator, &config).await,
        Operation::Confirm => ops::confirm(&orchestrator, &config).await,
        Operation::Execute => ops::execute(&orchestrator, &config).await,
        Operation::Pending => ops::pending(&orchestrator, &config).await,
        Operation::Status => ops::status(&orchestrator, &config).await,
    }
}
