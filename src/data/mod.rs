pub mod places;
pub mod topology;

use crate::error::MapError;
use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, FeatureCollection};
use std::io::Read;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the country object inside the world topology
pub const COUNTRIES_OBJECT: &str = "countries";

/// Where the world topology comes from
#[derive(Clone, Debug, PartialEq)]
pub enum TopologySource {
    Url(String),
    File(PathBuf),
}

impl std::fmt::Display for TopologySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologySource::Url(url) => write!(f, "{url}"),
            TopologySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One country feature with its stable identifiers pulled out
#[derive(Clone, Debug)]
pub struct Country {
    /// ISO 3166-1 numeric code, when the feature id is numeric
    pub code: Option<u16>,
    pub name: Option<String>,
    pub feature: Feature,
}

impl Country {
    pub fn from_feature(feature: Feature) -> Self {
        let code = match &feature.id {
            Some(Id::String(s)) => s.trim().parse::<u16>().ok(),
            Some(Id::Number(n)) => n.as_u64().and_then(|v| u16::try_from(v).ok()),
            None => None,
        };
        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self {
            code,
            name,
            feature,
        }
    }
}

/// Country geometry, loaded once and read-only afterwards
#[derive(Clone, Debug, Default)]
pub struct WorldGeometry {
    pub countries: Vec<Country>,
}

impl WorldGeometry {
    pub fn from_collection(collection: FeatureCollection) -> Self {
        Self {
            countries: collection
                .features
                .into_iter()
                .map(Country::from_feature)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Decode a world topology from raw bytes
pub fn decode_world(bytes: &mut [u8]) -> Result<WorldGeometry, MapError> {
    let topology = topology::parse(bytes)?;
    let collection = topology::feature_collection(&topology, COUNTRIES_OBJECT)?;
    Ok(WorldGeometry::from_collection(collection))
}

/// Fetch the raw topology bytes
pub fn fetch_topology(source: &TopologySource) -> Result<Vec<u8>, MapError> {
    match source {
        TopologySource::Url(url) => {
            let response = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build()
                .get(url)
                .call()
                .map_err(|e| MapError::Fetch {
                    url: url.clone(),
                    source: Box::new(e),
                })?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|source| MapError::Io {
                    path: PathBuf::from(url),
                    source,
                })?;
            Ok(bytes)
        }
        TopologySource::File(path) => std::fs::read(path).map_err(|source| MapError::Io {
            path: path.clone(),
            source,
        }),
    }
}

/// Fetch and decode the world geometry
pub fn load_world(source: &TopologySource) -> Result<WorldGeometry> {
    let mut bytes = fetch_topology(source).with_context(|| format!("fetching {source}"))?;
    debug!(bytes = bytes.len(), %source, "topology fetched");
    let world = decode_world(&mut bytes).with_context(|| format!("decoding {source}"))?;
    info!(countries = world.len(), %source, "world geometry loaded");
    Ok(world)
}

/// Observable progress of a `WorldLoader`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    Pending,
    Delivered,
    /// The fetch failed; the map stays empty
    Failed,
}

/// One-shot geometry fetch running off the render thread.
///
/// The result is delivered through `poll` exactly once. A failure is logged
/// and the loader goes quiet; nothing retries.
pub struct WorldLoader {
    rx: Option<Receiver<Result<WorldGeometry>>>,
    status: LoadStatus,
}

impl WorldLoader {
    /// Start fetching `source` on a worker thread
    pub fn spawn(source: TopologySource) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Receiver may be gone if the panel was torn down first
            let _ = tx.send(load_world(&source));
        });
        Self {
            rx: Some(rx),
            status: LoadStatus::Pending,
        }
    }

    /// Loader that resolves on the first poll with the given geometry
    pub fn ready(world: WorldGeometry) -> Self {
        Self::resolved(Ok(world))
    }

    /// Loader whose fetch already failed
    pub fn failed(reason: &str) -> Self {
        Self::resolved(Err(anyhow::anyhow!(reason.to_string())))
    }

    fn resolved(result: Result<WorldGeometry>) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self {
            rx: Some(rx),
            status: LoadStatus::Pending,
        }
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    /// Non-blocking check for the fetched geometry
    pub fn poll(&mut self) -> Option<WorldGeometry> {
        let rx = self.rx.as_ref()?;
        let outcome = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(MapError::LoaderGone.into()),
        };
        self.rx = None;

        match outcome {
            Ok(world) => {
                self.status = LoadStatus::Delivered;
                Some(world)
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "world geometry unavailable, map stays empty");
                self.status = LoadStatus::Failed;
                None
            }
        }
    }

    /// Drop the pending fetch; a late result is discarded
    pub fn cancel(&mut self) {
        self.rx = None;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use geojson::{Geometry, Value};

    /// Axis-aligned square country
    pub fn square_country(code: &str, name: &str, lon: f64, lat: f64, size: f64) -> Feature {
        let ring = vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ];
        let mut properties = serde_json::Map::new();
        properties.insert("name".into(), serde_json::Value::String(name.into()));
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: Some(Id::String(code.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// Three mock countries: A = USA, B = China, C = Russia
    pub fn three_countries() -> WorldGeometry {
        WorldGeometry::from_collection(FeatureCollection {
            bbox: None,
            features: vec![
                square_country("840", "Country A", -100.0, 30.0, 10.0),
                square_country("156", "Country B", 100.0, 25.0, 10.0),
                square_country("643", "Country C", 40.0, 50.0, 10.0),
            ],
            foreign_members: None,
        })
    }
}
