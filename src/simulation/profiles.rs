//! Per-entity simulator parameters.
//!
//! Every entity runs with the shared defaults unless an override names its
//! id. Overrides replace a whole parameter set; they are not merged field by
//! field.

use serde::{Deserialize, Serialize};

use super::{DatacenterParams, SimulationError, SolarParams, WeatherParams};
use crate::domain::EntityId;

/// Parameter sets that replace the defaults for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub entity_id: EntityId,
    #[serde(default)]
    pub solar: Option<SolarParams>,
    #[serde(default)]
    pub datacenter: Option<DatacenterParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorProfiles {
    pub solar: SolarParams,
    pub datacenter: DatacenterParams,
    pub weather: WeatherParams,
    pub overrides: Vec<EntityProfile>,
}

impl SimulatorProfiles {
    fn override_for(&self, entity_id: EntityId) -> Option<&EntityProfile> {
        self.overrides.iter().find(|o| o.entity_id == entity_id)
    }

    pub fn solar_for(&self, entity_id: EntityId) -> SolarParams {
        self.override_for(entity_id)
            .and_then(|o| o.solar)
            .unwrap_or(self.solar)
    }

    pub fn datacenter_for(&self, entity_id: EntityId) -> DatacenterParams {
        self.override_for(entity_id)
            .and_then(|o| o.datacenter)
            .unwrap_or(self.datacenter)
    }

    /// Check the defaults and every override up front
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.solar.validate()?;
        self.datacenter.validate()?;
        for o in &self.overrides {
            if let Some(solar) = &o.solar {
                solar.validate()?;
            }
            if let Some(dc) = &o.datacenter {
                dc.validate()?;
            }
        }
        Ok(())
    }
}
