//! Part-name corpus records for the semantic matcher
//!
//! One file per name under `corpus/`: catalog part ids written by the
//! index command, plus every free-text BOM name the matcher has resolved.
//! Records hold the tokenized name and raw term frequencies; IDF
//! weighting happens in the matcher when a snapshot is built, so corpus
//! files stay valid as the corpus grows. Records are never deleted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::part::PartFamily;

/// Tokenized form of one name the matcher knows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartNameVector {
    /// The catalog part this name resolves to
    pub part_id: String,

    /// The observed free-text name; None for catalog-indexed records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,

    /// Family guessed from the name tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<PartFamily>,

    /// Tokens in original order, post-normalization
    pub tokens: Vec<String>,

    /// Raw term counts
    pub tf: BTreeMap<String, u32>,

    /// How many times this name has been observed
    #[serde(default = "default_occurrence_count")]
    pub occurrence_count: u32,
}

fn default_occurrence_count() -> u32 {
    1
}

impl PartNameVector {
    /// Build a vector from an already-tokenized name
    pub fn from_tokens(part_id: impl Into<String>, tokens: Vec<String>) -> Self {
        let mut tf: BTreeMap<String, u32> = BTreeMap::new();
        for token in &tokens {
            *tf.entry(token.clone()).or_insert(0) += 1;
        }
        Self {
            part_id: part_id.into(),
            raw_name: None,
            family: None,
            tokens,
            tf,
            occurrence_count: 1,
        }
    }
}
