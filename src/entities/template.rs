//! ConnectionTemplate entity - parametrized pairwise-mating rule
//!
//! Templates are keyed by an ordered family pair plus nullable dn/pn
//! wildcards. Resolution is direction-agnostic (the library tries both
//! orderings and records a swap flag) and most-specific-match-wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::part::{EndType, FaceType, PartFamily};

/// The geometric joining rule a template instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JoinRule {
    #[serde(rename = "coaxial+plane_coincident")]
    CoaxialPlaneCoincident,
    #[serde(rename = "threaded")]
    Threaded,
    #[serde(rename = "welded")]
    Welded,
}

impl std::fmt::Display for JoinRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinRule::CoaxialPlaneCoincident => write!(f, "coaxial+plane_coincident"),
            JoinRule::Threaded => write!(f, "threaded"),
            JoinRule::Welded => write!(f, "welded"),
        }
    }
}

/// Tolerance parameters for a mate
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MateSchema {
    /// Whether the two port axes must align
    #[serde(default)]
    pub axis_align: bool,

    /// Maximum axis deviation from anti-parallel, degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_tol_deg: Option<f64>,

    /// Maximum face gap along the mate axis, mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_tol_mm: Option<f64>,

    /// Nominal face offset (gasket thickness etc.), mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_offset_mm: Option<f64>,

    /// Weld preparation angle for welded joints, degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_angle_deg: Option<f64>,
}

/// A numeric fastener parameter: either a literal or a formula over
/// named part attributes (e.g. `"125+(dn-50)*2.5"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericSpec {
    Literal(f64),
    Formula(String),
}

/// Bolting requirements for flanged joints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastenerSpec {
    pub bolt_count: u32,

    /// Thread designation, e.g. "M16"
    pub bolt_spec: String,

    /// Pitch circle diameter, literal or formula over `dn`
    pub pcd_mm: NumericSpec,

    /// Whether a gasket is required between the faces
    #[serde(default)]
    pub gasket: bool,
}

/// Parametrized pairwise-mating rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTemplate {
    /// Unique template identifier (e.g. PIPE_FLANGE_DN50_PN16)
    pub template_id: String,

    pub family_a: PartFamily,
    pub family_b: PartFamily,

    /// Nominal diameter; None is a wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dn: Option<u32>,

    /// Pressure class; None is a wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pn: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_type: Option<EndType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_type: Option<FaceType>,

    pub join_rule: JoinRule,

    #[serde(default)]
    pub mate_schema: MateSchema,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fasteners: Option<FastenerSpec>,

    /// Additional exact-match predicate over part attributes, applied
    /// after specificity scoring (e.g. material compatibility)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, serde_json::Value>,
}

impl ConnectionTemplate {
    /// Whether this template joins the given (unordered) family pair.
    /// Returns the swap flag: true when the caller's first family plays
    /// the template's B role.
    pub fn matches_families(&self, a: PartFamily, b: PartFamily) -> Option<bool> {
        if self.family_a == a && self.family_b == b {
            Some(false)
        } else if self.family_a == b && self.family_b == a {
            Some(true)
        } else {
            None
        }
    }
}
