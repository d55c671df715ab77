//! PostgreSQL repository
//!
//! `PgRepository<T>` implements `Repository<T>` for every record type that
//! describes its table through `PgRecord`. Queries are built with
//! `sqlx::QueryBuilder` from the column list, so each entity only has to say
//! how its fields bind and how a row maps back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::{QueryBuilder, Row};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use super::{Repository, UpsertOutcome};
use crate::models::Record;

/// Table mapping for a record type
pub trait PgRecord: Record {
    const TABLE: &'static str;
    /// Column holding `Record::key`
    const KEY_COLUMN: &'static str;
    /// All columns, in the order `push_binds` binds them. The first one is `id`.
    const COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    /// Bind one value per column, in `COLUMNS` order
    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>);

    fn from_row(row: &PgRow) -> Result<Self>;
}

/// Decode a text column into an enum with a `FromStr` impl
pub(crate) fn get_parsed<E>(row: &PgRow, column: &str) -> Result<E>
where
    E: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .with_context(|| format!("Invalid value in column {}", column))
}

pub struct PgRepository<T> {
    pool: PgPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PgRecord> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: PgPool) -> Arc<dyn Repository<T>> {
        Arc::new(Self::new(pool))
    }

    fn columns() -> String {
        T::COLUMNS.join(", ")
    }

    fn insert_query(record: &T) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            T::TABLE,
            Self::columns()
        ));
        {
            let mut values = qb.separated(", ");
            record.push_binds(&mut values);
        }
        qb.push(")");
        qb
    }

    /// `UPDATE ... SET (columns) = ROW(binds) WHERE id = <record id>`
    fn update_query(record: &T) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET ({}) = ROW(",
            T::TABLE,
            Self::columns()
        ));
        {
            let mut values = qb.separated(", ");
            record.push_binds(&mut values);
        }
        qb.push(") WHERE id = ");
        qb.push_bind(record.id().to_string());
        qb
    }

    async fn fetch_by(&self, column: &str, value: &str) -> Result<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Self::columns(),
            T::TABLE,
            column
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to get {} by {}", T::COLLECTION, column))?;

        row.as_ref().map(T::from_row).transpose()
    }
}

#[async_trait]
impl<T: PgRecord> Repository<T> for PgRepository<T> {
    async fn create(&self, record: &T) -> Result<T> {
        let mut qb = Self::insert_query(record);
        qb.push(format!(" RETURNING {}", Self::columns()));

        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to create {} record", T::COLLECTION))?;
        T::from_row(&row)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        self.fetch_by("id", id).await
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<T>> {
        self.fetch_by(T::KEY_COLUMN, key).await
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::columns(),
            T::TABLE,
            T::ORDER_BY
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", T::COLLECTION))?;

        rows.iter().map(T::from_row).collect()
    }

    async fn update(&self, record: &T) -> Result<T> {
        let mut qb = Self::update_query(record);
        qb.push(format!(" RETURNING {}", Self::columns()));

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to update {} record", T::COLLECTION))?
            .with_context(|| format!("{} record {} not found", T::COLLECTION, record.id()))?;
        T::from_row(&row)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete {} record", T::COLLECTION))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", T::TABLE);
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}", T::COLLECTION))?;
        Ok(row.try_get("count")?)
    }

    async fn upsert(&self, record: &T) -> Result<UpsertOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        // Same id: update in place, even when the key changed
        let mut update = Self::update_query(record);
        let updated = update
            .build()
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert {} record {}", T::COLLECTION, record.key()))?;
        if updated.rows_affected() > 0 {
            tx.commit().await.context("Failed to commit upsert")?;
            return Ok(UpsertOutcome::Updated);
        }

        let assignments = T::COLUMNS
            .iter()
            .filter(|c| **c != T::KEY_COLUMN)
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut qb = Self::insert_query(record);
        qb.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET {} RETURNING (xmax = 0) AS inserted",
            T::KEY_COLUMN,
            assignments
        ));

        let row = qb
            .build()
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert {} record {}", T::COLLECTION, record.key()))?;
        tx.commit().await.context("Failed to commit upsert")?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn increment(&self, id: &str, field: &str) -> Result<Option<T>> {
        let column = T::COLUMNS
            .iter()
            .find(|c| **c == field)
            .with_context(|| format!("{} has no column {}", T::TABLE, field))?;
        let sql = format!(
            "UPDATE {table} SET {column} = {column} + 1 WHERE id = $1 RETURNING {}",
            Self::columns(),
            table = T::TABLE,
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to increment {}.{}", T::TABLE, column))?;

        row.as_ref().map(T::from_row).transpose()
    }
}
