use crate::api::{Client, Error};
use crate::model::{EntityData, Snapshot, Topology};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Overall deadline for one refresh cycle.
const CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum SetupError {
    /// Credentials rejected or authentication failed outright.
    Auth(Error),
    /// Topology discovery failed.
    Discovery(Error),
    /// The account has no visible stations; nothing to poll.
    NoStations,
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Auth(e) => write!(f, "setup authentication failed: {}", e),
            SetupError::Discovery(e) => write!(f, "topology discovery failed: {}", e),
            SetupError::NoStations => write!(f, "no stations visible for this account"),
        }
    }
}

impl std::error::Error for SetupError {}

#[derive(Debug)]
pub enum CycleError {
    /// Credential refresh was rejected or failed; snapshot left untouched.
    Reauth(Error),
    /// The cycle ran past its deadline; snapshot left untouched.
    Timeout,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleError::Reauth(e) => write!(f, "reauthentication failed: {}", e),
            CycleError::Timeout => write!(
                f,
                "refresh cycle exceeded the {}s deadline",
                CYCLE_TIMEOUT.as_secs()
            ),
        }
    }
}

impl std::error::Error for CycleError {}

/// Cloneable read handle onto the latest published snapshot. The swap is
/// whole-value, so a reader always observes one complete cycle's output.
#[derive(Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotHandle {
    pub fn read(&self) -> Arc<Snapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/* One flaky device must not blank out the rest of the fleet; only a global
   credential rejection aborts the cycle. */
fn isolate(
    kind: &str,
    id: &str,
    fetched: Result<Map<String, Value>, Error>,
) -> Result<Option<Map<String, Value>>, CycleError> {
    match fetched {
        Ok(data) => Ok(Some(data)),
        Err(e @ Error::AuthRejected(_)) => Err(CycleError::Reauth(e)),
        Err(e) => {
            log::warn!("skipping {} {} this cycle: {}", kind, id, e);
            Ok(None)
        }
    }
}

/// Owns the client session and the discovered topology, runs the periodic
/// refresh cycle and publishes the resulting snapshot.
pub struct Coordinator {
    client: Client,
    topology: Topology,
    snapshot: SnapshotHandle,
}

impl Coordinator {
    /// Verify credentials and discover the station → device topology. The
    /// topology is fixed afterwards; bootstrap again for a fresh discovery.
    pub async fn bootstrap(mut client: Client) -> Result<Coordinator, SetupError> {
        match client.authenticate().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(SetupError::Auth(Error::AuthRejected(
                    "credentials rejected during setup".to_string(),
                )))
            }
            Err(e) => return Err(SetupError::Auth(e)),
        }

        let stations = client.stations().await.map_err(SetupError::Discovery)?;
        if stations.is_empty() {
            return Err(SetupError::NoStations);
        }
        log::info!("found {} station(s)", stations.len());

        let mut dtus = HashMap::new();
        let mut microinverters = HashMap::new();
        for station in &stations {
            let station_dtus = client
                .dtus(&station.id)
                .await
                .map_err(SetupError::Discovery)?;
            let station_micros = client
                .microinverters(&station.id)
                .await
                .map_err(SetupError::Discovery)?;
            log::debug!(
                "station {}: {} dtus, {} microinverters",
                station.id,
                station_dtus.len(),
                station_micros.len()
            );
            dtus.insert(station.id.clone(), station_dtus);
            microinverters.insert(station.id.clone(), station_micros);
        }

        Ok(Coordinator {
            client,
            topology: Topology {
                stations,
                dtus,
                microinverters,
            },
            snapshot: SnapshotHandle::default(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Read handle for downstream consumers; they never touch the network
    /// themselves.
    pub fn snapshot(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    /// Drop the cached token so the next cycle re-authenticates.
    pub fn invalidate_token(&mut self) {
        self.client.session_mut().invalidate();
    }

    /// Run one polling cycle and publish a fresh snapshot. Any failure
    /// leaves the previously published snapshot untouched.
    pub async fn refresh(&mut self) -> Result<(), CycleError> {
        match tokio::time::timeout(CYCLE_TIMEOUT, self.run_cycle()).await {
            Ok(Ok(snapshot)) => {
                log::debug!("refresh cycle complete, {} entities", snapshot.len());
                self.snapshot.publish(snapshot);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CycleError::Timeout),
        }
    }

    async fn run_cycle(&mut self) -> Result<Snapshot, CycleError> {
        if self.client.session().is_expired() {
            log::debug!("token expired, refreshing before cycle");
            match self.client.authenticate().await {
                Ok(true) => {}
                Ok(false) => {
                    return Err(CycleError::Reauth(Error::AuthRejected(
                        "credentials rejected during token refresh".to_string(),
                    )))
                }
                Err(e) => return Err(CycleError::Reauth(e)),
            }
        }

        let mut snapshot = Snapshot::new();

        for station in &self.topology.stations {
            let fetched = self.client.station_real_data(&station.id).await;
            if let Some(data) = isolate("station", &station.id, fetched)? {
                snapshot.insert(
                    station.id.clone(),
                    EntityData {
                        real_time_data: data,
                    },
                );
            }

            for dtu in self.topology.dtus.get(&station.id).into_iter().flatten() {
                let fetched = self.client.dtu_real_data(&station.id, &dtu.id).await;
                if let Some(data) = isolate("dtu", &dtu.id, fetched)? {
                    snapshot.insert(
                        dtu.id.clone(),
                        EntityData {
                            real_time_data: data,
                        },
                    );
                }
            }

            for micro in self
                .topology
                .microinverters
                .get(&station.id)
                .into_iter()
                .flatten()
            {
                let fetched = self.client.micro_real_data(&station.id, &micro.id).await;
                if let Some(data) = isolate("microinverter", &micro.id, fetched)? {
                    snapshot.insert(
                        micro.id.clone(),
                        EntityData {
                            real_time_data: data,
                        },
                    );
                }
            }
        }

        Ok(snapshot)
    }
}
