use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identifiers are globally unique across stations, DTUs and microinverters.
pub type EntityId = String;

#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: EntityId,
    pub name: String,
}

/// A device below a station: a DTU (concentrator) or a microinverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: EntityId,
    pub name: String,
}

/// Everything discovered for one account at startup. Fixed for the life of
/// the coordinator; re-discovery requires a new bootstrap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    pub stations: Vec<Station>,
    pub dtus: HashMap<EntityId, Vec<Device>>,
    pub microinverters: HashMap<EntityId, Vec<Device>>,
}

impl Topology {
    /// Total number of entities a full refresh cycle visits.
    pub fn entity_count(&self) -> usize {
        self.stations.len()
            + self.dtus.values().map(Vec::len).sum::<usize>()
            + self.microinverters.values().map(Vec::len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityData {
    /// Raw key-value payload as returned by the real-time data endpoints.
    pub real_time_data: Map<String, Value>,
}

/// One refresh cycle's result, keyed by entity id. Replaced wholesale on
/// every successful cycle, never patched in place.
pub type Snapshot = HashMap<EntityId, EntityData>;
