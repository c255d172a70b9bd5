use async_trait::async_trait;
use itertools::Itertools;

use super::{EntityRegistry, StoreError};
use crate::domain::Entity;

/// Entities seeded from configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    entities: Vec<Entity>,
}

impl ConfigRegistry {
    /// Later duplicates of an id are ignored
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities: entities.into_iter().unique_by(|e| e.id).collect(),
        }
    }
}

#[async_trait]
impl EntityRegistry for ConfigRegistry {
    async fn list_entities(&self) -> Result<Vec<Entity>, StoreError> {
        Ok(self.entities.clone())
    }
}
