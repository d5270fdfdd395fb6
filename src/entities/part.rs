//! Part entity - catalog record with embedded connection ports
//!
//! Parts are read-only from the engine's perspective: catalog mutation is
//! an administrative concern, and a part referenced by a published
//! template is immutable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::geometry::{Aabb, Vec3};

/// Part family classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartFamily {
    Pipe,
    Flange,
    Valve,
    Gasket,
    Bolt,
    Nut,
    Elbow,
    Tee,
    Reducer,
    Other,
}

impl std::fmt::Display for PartFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PartFamily::Pipe => "pipe",
            PartFamily::Flange => "flange",
            PartFamily::Valve => "valve",
            PartFamily::Gasket => "gasket",
            PartFamily::Bolt => "bolt",
            PartFamily::Nut => "nut",
            PartFamily::Elbow => "elbow",
            PartFamily::Tee => "tee",
            PartFamily::Reducer => "reducer",
            PartFamily::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// How a part's ends terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndType {
    Weld,
    Flanged,
    Threaded,
}

/// Flange face finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceType {
    /// Raised face
    Rf,
    /// Flat face
    Ff,
    /// Ring-type joint
    Rtj,
}

/// Port type - the geometric role of a connection anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Bore,
    Face,
    Thread,
}

/// A connection port: the geometric anchor where a part mates with another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub port_type: PortType,

    /// Unit vector pointing out of the part
    pub axis: Vec3,

    /// Port origin in the part's local frame (mm)
    pub origin: Vec3,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_type: Option<FaceType>,
}

/// Opaque shape descriptor extracted from CAD geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeomFingerprint {
    /// Bounding box in the part's local frame
    pub bbox: Aabb,

    /// Hole axis points (bore centers), if detected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Vec3>,

    /// Shaft axis points, if detected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shafts: Vec<Vec3>,
}

/// Catalog part record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Unique catalog identifier (e.g. FLANGE-DN50-PN16-RF)
    pub part_id: String,

    pub family: PartFamily,

    /// Nominal diameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<u32>,

    /// Pressure class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_type: Option<EndType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_type: Option<FaceType>,

    /// Governing standard (e.g. "ASME B16.5")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std: Option<String>,

    /// Material designation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mat: Option<String>,

    /// Free-form physical attributes (thread spec, lengths, bolt counts)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geom_fingerprint: Option<GeomFingerprint>,

    /// Connection ports, in catalog insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default)]
    pub stock_qty: u32,
}

impl Part {
    /// Create a minimal part with the given id and family
    pub fn new(part_id: impl Into<String>, family: PartFamily) -> Self {
        Self {
            part_id: part_id.into(),
            family,
            dn: None,
            pn: None,
            end_type: None,
            face_type: None,
            std: None,
            mat: None,
            meta: BTreeMap::new(),
            geom_fingerprint: None,
            ports: Vec::new(),
            stock_qty: 0,
        }
    }

    /// Whether the part carries usable port geometry
    pub fn has_ports(&self) -> bool {
        !self.ports.is_empty()
    }

    /// A string meta attribute, if present
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.get(key).and_then(|v| v.as_str())
    }
}
