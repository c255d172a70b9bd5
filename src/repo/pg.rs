#![cfg(feature = "db")]
//! Postgres store.
//!
//! Tables (see `migrations/0001_init.sql`):
//! - `irradiance`, `weather`: keyed by `(latitude, longitude, timestamp)`
//! - `consumption`, `production`, `pearson`: keyed by `(customer_id, timestamp)`
//! - `customers`: the entity registry

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use super::{EntityRegistry, StoreError, TimeSeriesStore};
use crate::domain::{CorrelationPair, Entity, EntityId, Location, SeriesKey, TimeSeriesPoint};

pub struct PgStore {
    pool: PgPool,
}

/// Where one series lives
struct SeriesTable {
    table: &'static str,
    value_column: &'static str,
    owner: Owner,
}

enum Owner {
    Location(f64, f64),
    Customer(EntityId),
}

impl From<SeriesKey> for SeriesTable {
    fn from(key: SeriesKey) -> Self {
        let at = |k: crate::domain::LocationKey| {
            let loc = k.location();
            Owner::Location(loc.latitude, loc.longitude)
        };
        match key {
            SeriesKey::Irradiance(loc) => SeriesTable {
                table: "irradiance",
                value_column: "irradiance",
                owner: at(loc),
            },
            SeriesKey::Temperature(loc) => SeriesTable {
                table: "weather",
                value_column: "temperature",
                owner: at(loc),
            },
            SeriesKey::Consumption(id) => SeriesTable {
                table: "consumption",
                value_column: "power",
                owner: Owner::Customer(id),
            },
            SeriesKey::Production(id) => SeriesTable {
                table: "production",
                value_column: "power",
                owner: Owner::Customer(id),
            },
        }
    }
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert configured customers that do not exist yet; existing rows are untouched
    pub async fn seed_customers(&self, customers: &[Entity]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for c in customers {
            let done = sqlx::query(
                r#"
                INSERT INTO customers (customer_id, name, latitude, longitude)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (customer_id) DO NOTHING
                "#,
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(c.location.latitude)
            .bind(c.location.longitude)
            .execute(&self.pool)
            .await?;
            inserted += done.rows_affected();
        }
        Ok(inserted)
    }
}

#[async_trait]
impl TimeSeriesStore for PgStore {
    async fn get_series(
        &self,
        key: SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, StoreError> {
        let t = SeriesTable::from(key);
        let rows = match t.owner {
            Owner::Location(lat, lon) => {
                let sql = format!(
                    "SELECT timestamp, {col} AS value FROM {table} \
                     WHERE latitude = $1 AND longitude = $2 AND timestamp >= $3 AND timestamp < $4 \
                     ORDER BY timestamp ASC",
                    col = t.value_column,
                    table = t.table
                );
                sqlx::query(&sql)
                    .bind(lat)
                    .bind(lon)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
            Owner::Customer(id) => {
                let sql = format!(
                    "SELECT timestamp, {col} AS value FROM {table} \
                     WHERE customer_id = $1 AND timestamp >= $2 AND timestamp < $3 \
                     ORDER BY timestamp ASC",
                    col = t.value_column,
                    table = t.table
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter()
            .map(|r| -> Result<TimeSeriesPoint, StoreError> {
                Ok(TimeSeriesPoint::new(r.try_get("timestamp")?, r.try_get("value")?))
            })
            .collect()
    }

    async fn upsert_bulk(
        &self,
        key: SeriesKey,
        points: &[TimeSeriesPoint],
    ) -> Result<usize, StoreError> {
        if points.is_empty() {
            return Ok(0);
        }
        let t = SeriesTable::from(key);
        let timestamps: Vec<DateTime<Utc>> = points.iter().map(|p| p.timestamp).collect();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();

        let result = match t.owner {
            Owner::Location(lat, lon) => {
                let sql = format!(
                    "INSERT INTO {table} (latitude, longitude, timestamp, {col}) \
                     SELECT $1, $2, ts, v FROM UNNEST($3::timestamptz[], $4::float8[]) AS u(ts, v) \
                     ON CONFLICT (latitude, longitude, timestamp) DO UPDATE SET {col} = EXCLUDED.{col}",
                    col = t.value_column,
                    table = t.table
                );
                sqlx::query(&sql)
                    .bind(lat)
                    .bind(lon)
                    .bind(&timestamps)
                    .bind(&values)
                    .execute(&self.pool)
                    .await?
            }
            Owner::Customer(id) => {
                let sql = format!(
                    "INSERT INTO {table} (customer_id, timestamp, {col}) \
                     SELECT $1, ts, v FROM UNNEST($2::timestamptz[], $3::float8[]) AS u(ts, v) \
                     ON CONFLICT (customer_id, timestamp) DO UPDATE SET {col} = EXCLUDED.{col}",
                    col = t.value_column,
                    table = t.table
                );
                sqlx::query(&sql)
                    .bind(id)
                    .bind(&timestamps)
                    .bind(&values)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() as usize)
    }

    async fn get_correlations(
        &self,
        entity: EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CorrelationPair>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, solar_irradiance_vs_production, temperature_vs_consumption
            FROM pearson
            WHERE customer_id = $1 AND timestamp >= $2 AND timestamp < $3
            ORDER BY timestamp ASC
            "#,
        )
        .bind(entity)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> Result<CorrelationPair, StoreError> {
                Ok(CorrelationPair {
                    timestamp: r.try_get("timestamp")?,
                    irradiance_vs_production: r.try_get("solar_irradiance_vs_production")?,
                    temperature_vs_consumption: r.try_get("temperature_vs_consumption")?,
                })
            })
            .collect()
    }

    async fn upsert_correlations(
        &self,
        entity: EntityId,
        pairs: &[CorrelationPair],
    ) -> Result<usize, StoreError> {
        if pairs.is_empty() {
            return Ok(0);
        }
        let timestamps: Vec<DateTime<Utc>> = pairs.iter().map(|p| p.timestamp).collect();
        let irr: Vec<Option<f64>> = pairs.iter().map(|p| p.irradiance_vs_production).collect();
        let temp: Vec<Option<f64>> = pairs.iter().map(|p| p.temperature_vs_consumption).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO pearson (customer_id, timestamp, solar_irradiance_vs_production, temperature_vs_consumption)
            SELECT $1, ts, irr, temp FROM UNNEST($2::timestamptz[], $3::float8[], $4::float8[]) AS u(ts, irr, temp)
            ON CONFLICT (customer_id, timestamp) DO UPDATE SET
                solar_irradiance_vs_production = EXCLUDED.solar_irradiance_vs_production,
                temperature_vs_consumption = EXCLUDED.temperature_vs_consumption
            "#,
        )
        .bind(entity)
        .bind(&timestamps)
        .bind(&irr)
        .bind(&temp)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn last_timestamp(&self, key: SeriesKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        let t = SeriesTable::from(key);
        let row = match t.owner {
            Owner::Location(lat, lon) => {
                let sql = format!(
                    "SELECT MAX(timestamp) AS last FROM {} WHERE latitude = $1 AND longitude = $2",
                    t.table
                );
                sqlx::query(&sql)
                    .bind(lat)
                    .bind(lon)
                    .fetch_one(&self.pool)
                    .await?
            }
            Owner::Customer(id) => {
                let sql = format!(
                    "SELECT MAX(timestamp) AS last FROM {} WHERE customer_id = $1",
                    t.table
                );
                sqlx::query(&sql).bind(id).fetch_one(&self.pool).await?
            }
        };
        Ok(row.try_get("last")?)
    }
}

#[async_trait]
impl EntityRegistry for PgStore {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError> {
        let rows = sqlx::query(
            "SELECT customer_id, name, latitude, longitude FROM customers ORDER BY customer_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| -> Result<Entity, StoreError> {
                Ok(Entity {
                    id: r.try_get("customer_id")?,
                    name: r.try_get("name")?,
                    location: Location::new(r.try_get("latitude")?, r.try_get("longitude")?),
                })
            })
            .collect()
    }
}
