//! TopoJSON decoding.
//!
//! Arcs are stored once and shared between neighbouring countries; a geometry
//! references them by index (`!i` for a reversed arc). Quantized files store
//! delta-encoded integer positions that `transform` maps back to degrees.

use crate::error::MapError;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, Value};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    #[inline]
    fn apply(&self, x: f64, y: f64) -> [f64; 2] {
        [
            x * self.scale[0] + self.translate[0],
            y * self.scale[1] + self.translate[1],
        ]
    }
}

#[derive(Debug, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub arcs: Option<ArcRefs>,
    #[serde(default)]
    pub coordinates: Option<serde_json::Value>,
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Arc references nest one level per geometry dimension
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArcRefs {
    Line(Vec<i64>),
    Rings(Vec<Vec<i64>>),
    Polygons(Vec<Vec<Vec<i64>>>),
}

impl ArcRefs {
    fn line(&self) -> Option<&[i64]> {
        match self {
            ArcRefs::Line(refs) => Some(refs),
            _ => None,
        }
    }

    fn rings(&self) -> Option<&[Vec<i64>]> {
        match self {
            ArcRefs::Rings(rings) => Some(rings),
            ArcRefs::Line(refs) if refs.is_empty() => Some(&[]),
            _ => None,
        }
    }

    fn polygons(&self) -> Option<&[Vec<Vec<i64>>]> {
        match self {
            ArcRefs::Polygons(polygons) => Some(polygons),
            ArcRefs::Line(refs) if refs.is_empty() => Some(&[]),
            _ => None,
        }
    }
}

/// Parse TopoJSON bytes in place with simd-json
pub fn parse(bytes: &mut [u8]) -> Result<Topology, MapError> {
    Ok(simd_json::serde::from_slice(bytes)?)
}

/// Absolute arc positions, decoded once per topology
pub struct ArcDecoder {
    arcs: Vec<Vec<[f64; 2]>>,
    transform: Option<Transform>,
}

impl ArcDecoder {
    pub fn new(topology: &Topology) -> Self {
        let transform = topology.transform;
        let arcs = topology
            .arcs
            .iter()
            .map(|arc| {
                let (mut x, mut y) = (0.0, 0.0);
                arc.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| match transform {
                        Some(t) => {
                            x += p[0];
                            y += p[1];
                            t.apply(x, y)
                        }
                        None => [p[0], p[1]],
                    })
                    .collect()
            })
            .collect();
        Self { arcs, transform }
    }

    fn position(&self, raw: &[f64]) -> Option<Vec<f64>> {
        let (&x, &y) = (raw.first()?, raw.get(1)?);
        let [x, y] = match self.transform {
            Some(t) => t.apply(x, y),
            None => [x, y],
        };
        Some(vec![x, y])
    }

    /// Stitch arcs into one line, dropping the point shared by consecutive arcs
    pub fn line(&self, refs: &[i64]) -> Result<Vec<Vec<f64>>, MapError> {
        let mut points: Vec<Vec<f64>> = Vec::new();
        for &index in refs {
            let (slot, reversed) = if index < 0 {
                ((!index) as usize, true)
            } else {
                (index as usize, false)
            };
            let arc = self.arcs.get(slot).ok_or(MapError::ArcOutOfRange {
                index,
                len: self.arcs.len(),
            })?;
            points.pop();
            if reversed {
                points.extend(arc.iter().rev().map(|p| p.to_vec()));
            } else {
                points.extend(arc.iter().map(|p| p.to_vec()));
            }
        }
        if let Some(first) = points.first().cloned() {
            if points.len() < 2 {
                points.push(first);
            }
        }
        Ok(points)
    }

    /// A closed ring needs at least four positions
    pub fn ring(&self, refs: &[i64]) -> Result<Vec<Vec<f64>>, MapError> {
        let mut points = self.line(refs)?;
        if let Some(first) = points.first().cloned() {
            while points.len() < 4 {
                points.push(first.clone());
            }
        }
        Ok(points)
    }

    /// `None` for null or malformed geometry
    pub fn geometry(&self, g: &TopoGeometry) -> Result<Option<Geometry>, MapError> {
        let Some(kind) = g.kind.as_deref() else {
            return Ok(None);
        };
        let arcs = g.arcs.as_ref();

        let value = match kind {
            "Polygon" => match arcs.and_then(ArcRefs::rings) {
                Some(rings) => Value::Polygon(self.rings(rings)?),
                None => return Ok(None),
            },
            "MultiPolygon" => match arcs.and_then(ArcRefs::polygons) {
                Some(polygons) => Value::MultiPolygon(
                    polygons
                        .iter()
                        .map(|rings| self.rings(rings))
                        .collect::<Result<_, _>>()?,
                ),
                None => return Ok(None),
            },
            "LineString" => match arcs.and_then(ArcRefs::line) {
                Some(refs) => Value::LineString(self.line(refs)?),
                None => return Ok(None),
            },
            "MultiLineString" => match arcs.and_then(ArcRefs::rings) {
                Some(lines) => Value::MultiLineString(
                    lines.iter().map(|l| self.line(l)).collect::<Result<_, _>>()?,
                ),
                None => return Ok(None),
            },
            "Point" => {
                let raw: Option<Vec<f64>> = g
                    .coordinates
                    .clone()
                    .and_then(|c| serde_json::from_value(c).ok());
                match raw.as_deref().and_then(|r| self.position(r)) {
                    Some(p) => Value::Point(p),
                    None => return Ok(None),
                }
            }
            "MultiPoint" => {
                let raw: Option<Vec<Vec<f64>>> = g
                    .coordinates
                    .clone()
                    .and_then(|c| serde_json::from_value(c).ok());
                match raw {
                    Some(points) => {
                        Value::MultiPoint(points.iter().filter_map(|p| self.position(p)).collect())
                    }
                    None => return Ok(None),
                }
            }
            "GeometryCollection" => {
                let mut children = Vec::with_capacity(g.geometries.len());
                for child in &g.geometries {
                    if let Some(geometry) = self.geometry(child)? {
                        children.push(geometry);
                    }
                }
                Value::GeometryCollection(children)
            }
            _ => return Ok(None),
        };

        Ok(Some(Geometry::new(value)))
    }

    fn rings(&self, rings: &[Vec<i64>]) -> Result<Vec<Vec<Vec<f64>>>, MapError> {
        rings.iter().map(|r| self.ring(r)).collect()
    }
}

fn feature_id(raw: &serde_json::Value) -> Option<Id> {
    match raw {
        serde_json::Value::String(s) => Some(Id::String(s.clone())),
        serde_json::Value::Number(n) => Some(Id::Number(n.clone())),
        _ => None,
    }
}

fn to_feature(decoder: &ArcDecoder, g: &TopoGeometry) -> Result<Feature, MapError> {
    Ok(Feature {
        bbox: None,
        geometry: decoder.geometry(g)?,
        id: g.id.as_ref().and_then(feature_id),
        properties: g.properties.clone(),
        foreign_members: None,
    })
}

/// Decode one named object into standalone features.
///
/// A `GeometryCollection` object yields one feature per member, anything else
/// yields a single feature.
pub fn feature_collection(topology: &Topology, object: &str) -> Result<FeatureCollection, MapError> {
    let root = topology
        .objects
        .get(object)
        .ok_or_else(|| MapError::MissingObject(object.to_string()))?;
    let decoder = ArcDecoder::new(topology);

    let features = if root.kind.as_deref() == Some("GeometryCollection") {
        root.geometries
            .iter()
            .map(|g| to_feature(&decoder, g))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![to_feature(&decoder, root)?]
    };

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
