use kaspa_payment_engine::{
    checker::PaymentChecker,
    deriver::KpubAddressDeriver,
    events::EventProducers,
    PaymentFlowApi,
    SqliteDatabase,
};
use kpg_common::Sompi;
use log::*;
use tokio::task::JoinHandle;

use crate::{config::ServerConfig, errors::ServerError, integrations::ChainClient, server::flow_config};

/// Starts the payment sweep worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// The worker is the only background poller: one tick checks at most a batch of awaiting-payment
/// orders against the indexer, and ticks never overlap because the loop awaits each sweep before
/// taking the next tick.
pub fn start_sweep_worker(
    db: SqliteDatabase,
    config: ServerConfig,
    producers: EventProducers,
) -> Result<JoinHandle<()>, ServerError> {
    let kpub = config.require_kpub()?;
    let chain = ChainClient::new(config.chain_api.clone())?;
    let checker = PaymentChecker::new(chain, Sompi::new(config.amount_tolerance));
    let api = PaymentFlowApi::new(db, KpubAddressDeriver::new(), checker, kpub, producers, flow_config(&config));
    let poll_interval = config.poll_interval;
    Ok(tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        info!("🕰️ Payment sweep worker started (tick every {}s)", poll_interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running payment sweep");
            match api.sweep_once().await {
                Ok(result) => {
                    if result.checked > 0 {
                        info!(
                            "🕰️ Sweep complete: {} checked, {} confirmed, {} abandoned, {} check failures{}",
                            result.checked,
                            result.confirmed,
                            result.abandoned,
                            result.check_failures,
                            if result.budget_exhausted { " (budget exhausted)" } else { "" }
                        );
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running payment sweep: {e}");
                },
            }
        }
    }))
}
