use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{KaspaAddress, NewPaymentRecord, OrderId, PaymentConfirmation, PaymentRecord, PaymentStatusType},
    traits::{PaymentGatewayError, TransitionOutcome},
};

/// Inserts the payment record, returning `false` in the second parameter if one already exists
/// for the order. The conflict clause resolves concurrent initiations: exactly one racer inserts,
/// everyone else falls through to the fetch and gets the stored record untouched. In particular
/// the expected amount and rate snapshot of the first initiation stand.
pub async fn idempotent_insert(
    record: &NewPaymentRecord,
    conn: &mut SqliteConnection,
) -> Result<(PaymentRecord, bool), PaymentGatewayError> {
    match insert_record(record, &mut *conn).await? {
        Some(record) => {
            debug!("📝️ Payment record for order {} inserted with id {}", record.order_id, record.id);
            Ok((record, true))
        },
        None => {
            let existing = fetch_by_order_id(&record.order_id, conn).await?.ok_or_else(|| {
                PaymentGatewayError::DatabaseError(format!(
                    "Order {} conflicted on insert but has no stored record",
                    record.order_id
                ))
            })?;
            Ok((existing, false))
        },
    }
}

async fn insert_record(
    record: &NewPaymentRecord,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, PaymentGatewayError> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO payment_records (
                order_id,
                customer_id,
                expected_amount,
                fiat_total_cents,
                currency,
                rate,
                payment_started_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(record.order_id.as_str())
    .bind(&record.customer_id)
    .bind(record.expected_amount)
    .bind(record.fiat_total_cents)
    .bind(&record.currency)
    .bind(record.rate)
    .bind(record.payment_started_at)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

pub async fn fetch_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM payment_records WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

/// Attach a derived address, moving the record from `AwaitingAddress` to `AwaitingPayment`. The
/// status guard in the WHERE clause makes the write first-wins under concurrency: a second
/// attacher matches zero rows and gets `None` back.
pub async fn attach_address(
    order_id: &OrderId,
    address: &KaspaAddress,
    index: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, PaymentGatewayError> {
    let record = sqlx::query_as(
        r#"
            UPDATE payment_records
            SET payment_address = $2, derivation_index = $3, status = 'AwaitingPayment',
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'AwaitingAddress'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(address)
    .bind(index)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// Record a confirmation against the order, exactly once.
///
/// The conditional UPDATE is the whole idempotence story: only an `AwaitingPayment` row matches,
/// so however many callers race, one write lands and everyone else falls through to the re-fetch
/// below and sees the winner's stored details.
pub async fn confirm(
    order_id: &OrderId,
    confirmation: &PaymentConfirmation,
    conn: &mut SqliteConnection,
) -> Result<TransitionOutcome, PaymentGatewayError> {
    let updated: Option<PaymentRecord> = sqlx::query_as(
        r#"
            UPDATE payment_records
            SET status = $2, confirmed_amount = $3, confirmed_txid = $4, confirmed_at = $5,
                confirmed_by = $6, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'AwaitingPayment'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(confirmation.target_status())
    .bind(confirmation.amount)
    .bind(&confirmation.txid)
    .bind(confirmation.observed_at)
    .bind(&confirmation.confirmed_by)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(record) = updated {
        return Ok(TransitionOutcome::Applied(record));
    }
    settled_or_error(order_id, conn).await
}

/// Move an `AwaitingPayment` record to `Abandoned`, with the same first-wins guard as `confirm`.
pub async fn mark_abandoned(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<TransitionOutcome, PaymentGatewayError> {
    let updated: Option<PaymentRecord> = sqlx::query_as(
        r#"
            UPDATE payment_records
            SET status = 'Abandoned', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'AwaitingPayment'
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(record) = updated {
        return Ok(TransitionOutcome::Applied(record));
    }
    settled_or_error(order_id, conn).await
}

/// A guarded transition matched no rows. Work out why from the record's current state.
async fn settled_or_error(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<TransitionOutcome, PaymentGatewayError> {
    match fetch_by_order_id(order_id, conn).await? {
        None => Err(PaymentGatewayError::RecordNotFound(order_id.as_str().to_string())),
        Some(record) if record.status.is_terminal() => Ok(TransitionOutcome::AlreadySettled(record)),
        Some(record) => Err(PaymentGatewayError::TransitionForbidden {
            order_id: order_id.as_str().to_string(),
            status: record.status.to_string(),
        }),
    }
}

/// The sweep queue: records awaiting payment, oldest window first.
pub async fn fetch_awaiting_payment(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentRecord>, PaymentGatewayError> {
    let records = sqlx::query_as(
        r#"
            SELECT * FROM payment_records
            WHERE status = $1
            ORDER BY payment_started_at ASC
            LIMIT $2;
        "#,
    )
    .bind(PaymentStatusType::AwaitingPayment)
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(records)
}
