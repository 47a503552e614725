//! Database connectivity and schema checks. Migrations are raw SQL files
//! under `migrations/`, applied outside the binary.

use sqlx::PgPool;

const REQUIRED_TABLES: &[&str] = &["cards", "transactions"];

pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// True when every table the stores rely on exists.
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let present: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM information_schema.tables
        WHERE table_schema = 'public' AND table_name = ANY($1)
        "#,
    )
    .bind(REQUIRED_TABLES)
    .fetch_one(pool)
    .await?;

    if present as usize != REQUIRED_TABLES.len() {
        tracing::error!(
            expected = REQUIRED_TABLES.len(),
            present,
            "database schema is missing tables"
        );
        return Ok(false);
    }
    Ok(true)
}
