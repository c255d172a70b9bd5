//! Persistence seams.
//!
//! The pipeline reads and writes through [`TimeSeriesStore`] and discovers
//! entities through [`EntityRegistry`]. Writes are upserts keyed by
//! `(series, timestamp)`, so re-running a date replaces rows instead of
//! duplicating them.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::domain::{CorrelationPair, Entity, EntityId, SeriesKey, TimeSeriesPoint};

pub mod memory;
pub mod registry;

#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryStore;
pub use registry::ConfigRegistry;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Points of `key` in `[start, end)`, ordered by timestamp
    async fn get_series(
        &self,
        key: SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, StoreError>;

    /// Insert or replace points; returns the number of rows written
    async fn upsert_bulk(
        &self,
        key: SeriesKey,
        points: &[TimeSeriesPoint],
    ) -> Result<usize, StoreError>;

    /// Correlation rows of `entity` in `[start, end)`, ordered by timestamp
    async fn get_correlations(
        &self,
        entity: EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CorrelationPair>, StoreError>;

    async fn upsert_correlations(
        &self,
        entity: EntityId,
        pairs: &[CorrelationPair],
    ) -> Result<usize, StoreError>;

    /// Most recent stored timestamp of `key`
    async fn last_timestamp(&self, key: SeriesKey) -> Result<Option<DateTime<Utc>>, StoreError>;
}

#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError>;

    async fn get_entity(&self, id: EntityId) -> Result<Option<Entity>, StoreError> {
        Ok(self.list_entities().await?.into_iter().find(|e| e.id == id))
    }
}

/// Store and registry selected from configuration
#[derive(Clone)]
pub struct Repositories {
    pub store: Arc<dyn TimeSeriesStore>,
    pub registry: Arc<dyn EntityRegistry>,
}

impl Repositories {
    pub async fn new(cfg: &Config) -> Result<Self> {
        #[cfg(feature = "db")]
        {
            if let Some(url) = cfg.db.url.as_deref().filter(|u| !u.is_empty()) {
                let pg = Arc::new(pg::PgStore::connect(url, cfg.db.max_connections).await?);
                let seeded = pg.seed_customers(&cfg.customers).await?;
                info!(seeded, "connected to postgres store");
                return Ok(Self {
                    store: pg.clone(),
                    registry: pg,
                });
            }
        }

        info!(
            customers = cfg.customers.len(),
            "using in-memory store"
        );
        Ok(Self::in_memory(cfg.customers.clone()))
    }

    pub fn in_memory(customers: Vec<Entity>) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            registry: Arc::new(ConfigRegistry::new(customers)),
        }
    }
}
