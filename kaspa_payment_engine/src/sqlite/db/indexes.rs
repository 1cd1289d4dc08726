use sqlx::SqliteConnection;

use crate::traits::PaymentGatewayError;

/// Atomically allocate the next derivation index for the account.
///
/// The upsert bumps the counter and returns its new value in one statement, so concurrent
/// allocators each get a distinct index with no lock held in application code. The counter stores
/// the next value to hand out; the allocated index is one less than what comes back.
pub async fn next_index(account: &str, conn: &mut SqliteConnection) -> Result<i64, PaymentGatewayError> {
    let (next,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO derivation_indexes (account, next_index) VALUES ($1, 1)
        ON CONFLICT (account) DO UPDATE SET next_index = next_index + 1
        RETURNING next_index;
        "#,
    )
    .bind(account)
    .fetch_one(conn)
    .await?;
    Ok(next - 1)
}

/// Bump the allocator past `index`, without ever moving it backwards. Used to seed the counter
/// above indexes that were assigned outside the gateway.
pub async fn record_used(account: &str, index: i64, conn: &mut SqliteConnection) -> Result<(), PaymentGatewayError> {
    sqlx::query(
        r#"
        INSERT INTO derivation_indexes (account, next_index) VALUES ($1, $2 + 1)
        ON CONFLICT (account) DO UPDATE SET next_index = MAX(next_index, $2 + 1);
        "#,
    )
    .bind(account)
    .bind(index)
    .execute(conn)
    .await?;
    Ok(())
}
