//! In-process store backed by ordered maps.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{StoreError, TimeSeriesStore};
use crate::domain::{CorrelationPair, EntityId, SeriesKey, TimeSeriesPoint};

type Series = BTreeMap<DateTime<Utc>, f64>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<BTreeMap<SeriesKey, Series>>,
    correlations: RwLock<BTreeMap<EntityId, BTreeMap<DateTime<Utc>, CorrelationPair>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored row count of `key`
    pub fn len(&self, key: &SeriesKey) -> usize {
        self.series.read().get(key).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().values().all(BTreeMap::is_empty)
            && self.correlations.read().values().all(BTreeMap::is_empty)
    }

    pub fn correlation_count(&self, entity: EntityId) -> usize {
        self.correlations.read().get(&entity).map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn get_series(
        &self,
        key: SeriesKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeSeriesPoint>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let guard = self.series.read();
        Ok(guard
            .get(&key)
            .map(|s| {
                s.range(start..end)
                    .map(|(ts, v)| TimeSeriesPoint::new(*ts, *v))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_bulk(
        &self,
        key: SeriesKey,
        points: &[TimeSeriesPoint],
    ) -> Result<usize, StoreError> {
        let mut guard = self.series.write();
        let series = guard.entry(key).or_default();
        series.extend(points.iter().map(|p| (p.timestamp, p.value)));
        Ok(points.len())
    }

    async fn get_correlations(
        &self,
        entity: EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CorrelationPair>, StoreError> {
        if start >= end {
            return Ok(Vec::new());
        }
        let guard = self.correlations.read();
        Ok(guard
            .get(&entity)
            .map(|rows| rows.range(start..end).map(|(_, p)| *p).collect())
            .unwrap_or_default())
    }

    async fn upsert_correlations(
        &self,
        entity: EntityId,
        pairs: &[CorrelationPair],
    ) -> Result<usize, StoreError> {
        let mut guard = self.correlations.write();
        let rows = guard.entry(entity).or_default();
        rows.extend(pairs.iter().map(|p| (p.timestamp, *p)));
        Ok(pairs.len())
    }

    async fn last_timestamp(&self, key: SeriesKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .series
            .read()
            .get(&key)
            .and_then(|s| s.keys().next_back().copied()))
    }
}
