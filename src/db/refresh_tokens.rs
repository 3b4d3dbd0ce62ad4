use sqlx::PgPool;
use uuid::Uuid;

use crate::models::RefreshToken;

/// Outcome of presenting a refresh token.
pub enum Redemption {
    /// First use; the row is now spent.
    Valid(RefreshToken),
    /// The token exists but was already spent.
    Replayed { user_id: Uuid },
    Unknown,
}

/// Stores a token hash valid for `days`.
pub async fn issue(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    days: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, now() + make_interval(days => $3::int))",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(days)
    .execute(pool)
    .await?;
    Ok(())
}

/// Spends the token in one statement so two concurrent refreshes cannot both win.
pub async fn redeem(pool: &PgPool, token_hash: &str) -> Result<Redemption, sqlx::Error> {
    let claimed = sqlx::query_as::<_, RefreshToken>(
        "UPDATE refresh_tokens SET used = true
         WHERE token_hash = $1 AND NOT used
         RETURNING *",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    if let Some(token) = claimed {
        return Ok(Redemption::Valid(token));
    }

    let owner: Option<(Uuid,)> =
        sqlx::query_as("SELECT user_id FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(pool)
            .await?;

    Ok(match owner {
        Some((user_id,)) => Redemption::Replayed { user_id },
        None => Redemption::Unknown,
    })
}

pub async fn revoke_for_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn revoke(pool: &PgPool, token_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Drops expired rows. Spent rows are kept until expiry for replay detection.
pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
