//! db.rs
//! Pool SQLite, migraciones embebidas y helpers de timestamps.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

pub async fn setup_database(database_url: &str) -> Result<Pool<Sqlite>> {
    // La carpeta "data" tiene que existir antes de abrir el archivo
    if database_url.contains("data/") {
        std::fs::create_dir_all("data").context("Could not create 'data' directory")?;
    }

    log::info!("Conectando a SQLite en {}", database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("Could not connect to {database_url}"))?;

    run_migrations(&db_pool).await?;
    Ok(db_pool)
}

/// Corre migraciones con sqlx
pub async fn run_migrations(db_pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(db_pool)
        .await
        .context("Failed to run email dispatch migrations")?;
    Ok(())
}

/// Tope de items por página en los listados
pub const MAX_PAGE_SIZE: u64 = 100;

/// Normaliza (page, page_size) que vienen del query string y calcula el OFFSET.
/// page >= 1, page_size en 1..=MAX_PAGE_SIZE; un offset fuera de rango da página vacía.
pub fn page_window(page: u64, page_size: u64) -> (u64, u64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1)
        .checked_mul(page_size)
        .and_then(|o| i64::try_from(o).ok())
        .unwrap_or(i64::MAX);
    (page, page_size, offset)
}

/// RFC 3339 con microsegundos: el orden lexicográfico coincide con el cronológico.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp '{raw}'"))?
        .with_timezone(&Utc))
}

pub fn parse_optional_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_timestamp).transpose()
}

pub fn parse_optional_json(raw: Option<String>) -> Result<Option<serde_json::Value>> {
    raw.as_deref()
        .map(|s| serde_json::from_str(s).context("Invalid JSON column"))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_clamps_size() {
        assert_eq!(page_window(0, 0), (1, 1, 0));
        assert_eq!(page_window(3, 10), (3, 10, 20));
        assert_eq!(page_window(1, u64::MAX), (1, MAX_PAGE_SIZE, 0));
    }

    #[test]
    fn page_window_never_overflows() {
        let (page, page_size, offset) = page_window(u64::MAX, 2);
        assert_eq!(page, u64::MAX);
        assert_eq!(page_size, 2);
        assert_eq!(offset, i64::MAX);

        let (_, _, offset) = page_window(u64::MAX / 2, 100);
        assert_eq!(offset, i64::MAX);
    }
}
