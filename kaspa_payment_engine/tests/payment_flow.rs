//! End-to-end tests for the payment flow: initiation, detection, confirmation, abandonment and
//! the background sweep, against a real SQLite store and a scripted chain indexer.
mod support;

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chrono::{Duration, Utc};
use kaspa_payment_engine::{
    checker::PaymentChecker,
    db_types::{KaspaAddress, OrderId, PaymentStatusType, WatchOnlyKey},
    deriver::KpubAddressDeriver,
    events::{EventHandlers, EventHooks, EventProducers},
    traits::{ChainIndexer, ChainIndexerError, ChainTransaction, ChainTxOutput, PaymentGatewayError},
    ExchangeRate,
    FlowConfig,
    OrderCheckResult,
    PaymentFlowApi,
    SqliteDatabase,
};
use kpg_common::Sompi;
use support::new_test_db;
use tokio::sync::Mutex;

fn test_key() -> WatchOnlyKey {
    WatchOnlyKey::try_new(format!("kpub{}", "A1b2".repeat(27))).unwrap()
}

fn usd_rate(rate: f64) -> ExchangeRate {
    ExchangeRate::new("USD".to_string(), rate, None)
}

/// A scripted indexer. Tests land payments by inserting transactions keyed by address.
#[derive(Clone, Default)]
struct ScriptedIndexer {
    transactions: Arc<Mutex<HashMap<String, Vec<ChainTransaction>>>>,
    down: Arc<Mutex<bool>>,
}

impl ScriptedIndexer {
    async fn land_payment(&self, address: &KaspaAddress, txid: &str, amount: Sompi) {
        let tx = ChainTransaction {
            txid: txid.to_string(),
            observed_at: Some(Utc::now() + Duration::seconds(1)),
            accepted: true,
            outputs: vec![ChainTxOutput { address: address.as_str().to_string(), amount }],
        };
        self.transactions.lock().await.entry(address.as_str().to_string()).or_default().push(tx);
    }

    async fn set_down(&self, down: bool) {
        *self.down.lock().await = down;
    }
}

impl ChainIndexer for ScriptedIndexer {
    async fn balance_of(&self, address: &KaspaAddress) -> Result<Sompi, ChainIndexerError> {
        Ok(self.transactions_for(address).await?.iter().map(|t| t.amount_to(address)).sum())
    }

    async fn transactions_for(&self, address: &KaspaAddress) -> Result<Vec<ChainTransaction>, ChainIndexerError> {
        if *self.down.lock().await {
            return Err(ChainIndexerError::ApiError("indexer down".to_string()));
        }
        Ok(self.transactions.lock().await.get(address.as_str()).cloned().unwrap_or_default())
    }
}

type TestApi = PaymentFlowApi<SqliteDatabase, KpubAddressDeriver, ScriptedIndexer>;

async fn new_api(indexer: ScriptedIndexer, producers: EventProducers, config: FlowConfig) -> TestApi {
    let db = new_test_db().await;
    let checker = PaymentChecker::new(indexer, Sompi::new(1));
    PaymentFlowApi::new(db, KpubAddressDeriver::new(), checker, test_key(), producers, config)
}

#[tokio::test]
async fn happy_path_from_checkout_to_confirmation() {
    let indexer = ScriptedIndexer::default();
    let api = new_api(indexer.clone(), EventProducers::default(), FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());

    // $25.00 at $0.10/KAS: the customer owes 250 KAS.
    let init = api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    assert!(init.newly_created);
    assert_eq!(init.record.status, PaymentStatusType::AwaitingPayment);
    assert_eq!(init.record.expected_amount, Sompi::from_kas(250));
    let address = init.record.payment_address.clone().expect("address should be assigned at initiation");

    // Nothing on chain yet.
    let result = api.check_order_now(&order_id).await.unwrap();
    assert!(matches!(result, OrderCheckResult::Pending(_)));

    // The payment lands, one sompi under the expected amount: within tolerance.
    indexer.land_payment(&address, "tx-real", Sompi::from_kas(250) - Sompi::new(1)).await;
    let result = api.check_order_now(&order_id).await.unwrap();
    let record = match result {
        OrderCheckResult::ConfirmedNow(r) => r,
        other => panic!("expected confirmation, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatusType::Confirmed);
    assert_eq!(record.confirmed_txid.as_deref(), Some("tx-real"));

    // Further checks are no-ops that report the settled record.
    let result = api.check_order_now(&order_id).await.unwrap();
    assert!(matches!(result, OrderCheckResult::Completed(_)));
}

#[tokio::test]
async fn repeat_initiation_returns_the_same_address_and_amount() {
    let api = new_api(ScriptedIndexer::default(), EventProducers::default(), FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());
    let first = api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    // The rate has moved since checkout; the original snapshot must stand.
    let second = api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.20)).await.unwrap();
    assert!(!second.newly_created);
    assert_eq!(second.record.payment_address, first.record.payment_address);
    assert_eq!(second.record.expected_amount, first.record.expected_amount);
    assert_eq!(second.record.rate, 0.1);
}

#[tokio::test]
async fn distinct_orders_get_distinct_addresses() {
    let api = new_api(ScriptedIndexer::default(), EventProducers::default(), FlowConfig::default()).await;
    let a = api.initiate_payment(OrderId("1".to_string()), "c".to_string(), 100, &usd_rate(0.1)).await.unwrap();
    let b = api.initiate_payment(OrderId("2".to_string()), "c".to_string(), 100, &usd_rate(0.1)).await.unwrap();
    assert_ne!(a.record.payment_address, b.record.payment_address);
    assert_ne!(a.record.derivation_index, b.record.derivation_index);
}

#[tokio::test]
async fn underpayment_beyond_tolerance_never_confirms() {
    let indexer = ScriptedIndexer::default();
    let api = new_api(indexer.clone(), EventProducers::default(), FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());
    let init = api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    let address = init.record.payment_address.unwrap();

    indexer.land_payment(&address, "tx-short", Sompi::from_kas(250) - Sompi::new(2)).await;
    let result = api.check_order_now(&order_id).await.unwrap();
    assert!(matches!(result, OrderCheckResult::Pending(_)));
}

#[tokio::test]
async fn indexer_outage_leaves_the_order_untouched() {
    let indexer = ScriptedIndexer::default();
    let api = new_api(indexer.clone(), EventProducers::default(), FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());
    api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();

    indexer.set_down(true).await;
    let result = api.check_order_now(&order_id).await.unwrap();
    assert!(matches!(result, OrderCheckResult::CheckFailed(_)));
    let record = api.payment_record(&order_id).await.unwrap();
    assert_eq!(record.status, PaymentStatusType::AwaitingPayment);

    // Once the indexer recovers, checking resumes where it left off.
    indexer.set_down(false).await;
    let result = api.check_order_now(&order_id).await.unwrap();
    assert!(matches!(result, OrderCheckResult::Pending(_)));
}

#[tokio::test]
async fn stale_orders_are_abandoned_without_a_chain_call() {
    let indexer = ScriptedIndexer::default();
    // A zero ceiling makes every order instantly stale. The indexer is down, which must not
    // matter: abandonment never consults the chain.
    let config = FlowConfig { abandon_after: Duration::zero(), ..FlowConfig::default() };
    let api = new_api(indexer.clone(), EventProducers::default(), config).await;
    let order_id = OrderId("1001".to_string());
    api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    indexer.set_down(true).await;

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let result = api.check_order_now(&order_id).await.unwrap();
    let record = match result {
        OrderCheckResult::Abandoned(r) => r,
        other => panic!("expected abandonment, got {other:?}"),
    };
    assert_eq!(record.status, PaymentStatusType::Abandoned);
}

#[tokio::test]
async fn manual_confirmation_is_idempotent_and_gated() {
    let api = new_api(ScriptedIndexer::default(), EventProducers::default(), FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());
    api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();

    let record = api.manually_confirm(&order_id, None, "admin-7").await.unwrap();
    assert_eq!(record.status, PaymentStatusType::ManuallyConfirmed);
    assert_eq!(record.confirmed_by.as_deref(), Some("admin-7"));
    let txid = record.confirmed_txid.clone().unwrap();
    assert!(txid.starts_with("manually-verified-"));

    // A second manual confirmation changes nothing.
    let repeat = api.manually_confirm(&order_id, Some("other-tx".to_string()), "admin-8").await.unwrap();
    assert_eq!(repeat.confirmed_txid.as_deref(), Some(txid.as_str()));
    assert_eq!(repeat.confirmed_by.as_deref(), Some("admin-7"));
}

#[tokio::test]
async fn sweep_settles_paid_and_stale_orders_and_counts_failures() {
    let indexer = ScriptedIndexer::default();
    let config = FlowConfig { abandon_after: Duration::hours(1), ..FlowConfig::default() };
    let api = new_api(indexer.clone(), EventProducers::default(), config).await;

    let paid = OrderId("paid".to_string());
    let waiting = OrderId("waiting".to_string());
    let init = api.initiate_payment(paid.clone(), "c1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    api.initiate_payment(waiting.clone(), "c2".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    indexer.land_payment(&init.record.payment_address.unwrap(), "tx-paid", Sompi::from_kas(250)).await;

    let result = api.sweep_once().await.unwrap();
    assert_eq!(result.checked, 2);
    assert_eq!(result.confirmed, 1);
    assert_eq!(result.abandoned, 0);
    assert_eq!(result.check_failures, 0);
    assert!(!result.budget_exhausted);

    assert_eq!(api.payment_record(&paid).await.unwrap().status, PaymentStatusType::Confirmed);
    assert_eq!(api.payment_record(&waiting).await.unwrap().status, PaymentStatusType::AwaitingPayment);

    // An outage mid-sweep is counted, not settled.
    indexer.set_down(true).await;
    let result = api.sweep_once().await.unwrap();
    assert_eq!(result.checked, 1);
    assert_eq!(result.check_failures, 1);
    assert_eq!(api.payment_record(&waiting).await.unwrap().status, PaymentStatusType::AwaitingPayment);
}

#[tokio::test]
async fn confirmation_event_fires_exactly_once() {
    let confirmed_count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&confirmed_count);
    let mut hooks = EventHooks::default();
    hooks.on_payment_confirmed(move |_event| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let indexer = ScriptedIndexer::default();
    let api = new_api(indexer.clone(), producers, FlowConfig::default()).await;
    let order_id = OrderId("1001".to_string());
    let init = api.initiate_payment(order_id.clone(), "cust-1".to_string(), 2_500, &usd_rate(0.10)).await.unwrap();
    indexer.land_payment(&init.record.payment_address.unwrap(), "tx-real", Sompi::from_kas(250)).await;

    api.check_order_now(&order_id).await.unwrap();
    // A repeat check must not re-fire the hook.
    api.check_order_now(&order_id).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(confirmed_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn checking_an_unknown_order_is_an_error() {
    let api = new_api(ScriptedIndexer::default(), EventProducers::default(), FlowConfig::default()).await;
    let err = api.check_order_now(&OrderId("ghost".to_string())).await.unwrap_err();
    assert!(matches!(err, PaymentGatewayError::RecordNotFound(_)));
}
