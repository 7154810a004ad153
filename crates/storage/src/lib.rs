use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

use shared::domain::{NewPerfume, Perfume, PerfumeId};

const PERFUME_COLUMNS: &str = "id, name, brand, perfume_type, gender, volume_ml, price";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run perfume migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn list_perfumes(&self) -> Result<Vec<Perfume>> {
        let rows = sqlx::query(&format!(
            "SELECT {PERFUME_COLUMNS} FROM perfumes ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list perfumes")?;
        rows.iter().map(perfume_from_row).collect()
    }

    pub async fn find_perfume(&self, perfume_id: PerfumeId) -> Result<Option<Perfume>> {
        let row = sqlx::query(&format!(
            "SELECT {PERFUME_COLUMNS} FROM perfumes WHERE id = ?"
        ))
        .bind(perfume_id.0)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load perfume {}", perfume_id.0))?;
        row.as_ref().map(perfume_from_row).transpose()
    }

    pub async fn insert_perfume(&self, perfume: &NewPerfume) -> Result<PerfumeId> {
        let rec = sqlx::query(
            "INSERT INTO perfumes (name, brand, perfume_type, gender, volume_ml, price)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&perfume.name)
        .bind(&perfume.brand)
        .bind(perfume.kind.as_deref())
        .bind(perfume.gender.as_deref())
        .bind(perfume.volume_ml)
        .bind(perfume.price.to_string())
        .fetch_one(&self.pool)
        .await
        .context("failed to insert perfume")?;
        let perfume_id = PerfumeId(rec.get::<i64, _>(0));
        debug!(perfume_id = perfume_id.0, "inserted perfume row");
        Ok(perfume_id)
    }

    /// Overwrites every column of the row. Returns `false` when no row has
    /// that id.
    pub async fn update_perfume(
        &self,
        perfume_id: PerfumeId,
        perfume: &NewPerfume,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE perfumes
             SET name = ?, brand = ?, perfume_type = ?, gender = ?, volume_ml = ?, price = ?
             WHERE id = ?",
        )
        .bind(&perfume.name)
        .bind(&perfume.brand)
        .bind(perfume.kind.as_deref())
        .bind(perfume.gender.as_deref())
        .bind(perfume.volume_ml)
        .bind(perfume.price.to_string())
        .bind(perfume_id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update perfume {}", perfume_id.0))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_perfume(&self, perfume_id: PerfumeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM perfumes WHERE id = ?")
            .bind(perfume_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete perfume {}", perfume_id.0))?;
        Ok(result.rows_affected() > 0)
    }
}

fn perfume_from_row(row: &SqliteRow) -> Result<Perfume> {
    let id: i64 = row.try_get("id")?;
    let raw_price: String = row.try_get("price")?;
    let price = Decimal::from_str(&raw_price)
        .with_context(|| format!("perfume {id} has a corrupt price '{raw_price}'"))?;
    let fields = NewPerfume {
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        kind: row.try_get("perfume_type")?,
        gender: row.try_get("gender")?,
        volume_ml: row.try_get("volume_ml")?,
        price,
    };
    Ok(Perfume::from_parts(PerfumeId(id), fields))
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() || path == ":memory:" {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
