//! Semantic part-name matcher
//!
//! Maps free-text BOM names ("50mm weld neck flange") to catalog part ids
//! with TF-IDF weighted cosine similarity. The corpus is held in an
//! immutable snapshot behind an Arc; a rebuild constructs a fresh
//! snapshot and swaps it in, so in-flight rankings keep a consistent view.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::core::workspace::MatcherSettings;
use crate::entities::name_vector::PartNameVector;
use crate::entities::part::{Part, PartFamily};

const STOP_TOKENS: &[&str] = &["a", "an", "and", "for", "of", "the", "with", "x"];

/// Normalize and tokenize a part name. Dimension spellings collapse to
/// the catalog's spec-token forms: "50mm" and "dn 50" both become "dn50".
pub fn tokenize(name: &str) -> Vec<String> {
    let lowered = name.to_lowercase();
    let mut raw: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            raw.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        raw.push(current);
    }

    let mut tokens = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let token = &raw[i];

        // "dn" / "pn" followed by a bare number joins into a spec token
        if (token == "dn" || token == "pn")
            && raw.get(i + 1).is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()))
        {
            tokens.push(format!("{}{}", token, raw[i + 1]));
            i += 2;
            continue;
        }

        if let Some(spec) = spec_token(token) {
            tokens.push(spec);
        } else if !STOP_TOKENS.contains(&token.as_str()) {
            tokens.push(token.clone());
        }
        i += 1;
    }
    tokens
}

/// Rewrite dimension spellings to spec tokens: "50mm" -> "dn50"
fn spec_token(token: &str) -> Option<String> {
    if let Some(digits) = token.strip_suffix("mm") {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Some(format!("dn{}", digits));
        }
    }
    None
}

/// Guess a part family from name tokens, for BOM lines that resolve by
/// name only
pub fn infer_family(tokens: &[String]) -> Option<PartFamily> {
    for token in tokens {
        let family = match token.as_str() {
            "pipe" | "spool" => PartFamily::Pipe,
            "flange" | "wn" | "weldneck" => PartFamily::Flange,
            "valve" => PartFamily::Valve,
            "gasket" => PartFamily::Gasket,
            "bolt" | "stud" => PartFamily::Bolt,
            "nut" => PartFamily::Nut,
            "elbow" | "bend" => PartFamily::Elbow,
            "tee" => PartFamily::Tee,
            "reducer" => PartFamily::Reducer,
            _ => continue,
        };
        return Some(family);
    }
    None
}

/// Build the corpus vector for one catalog part from its id, family, and
/// keyed attributes
pub fn part_vector(part: &Part) -> PartNameVector {
    let mut tokens = tokenize(&part.part_id);
    tokens.push(part.family.to_string());
    if let Some(dn) = part.dn {
        tokens.push(format!("dn{}", dn));
    }
    if let Some(pn) = part.pn {
        tokens.push(format!("pn{}", pn));
    }
    tokens.sort();
    tokens.dedup();
    let mut vector = PartNameVector::from_tokens(&part.part_id, tokens);
    vector.family = Some(part.family);
    vector
}

/// Build a corpus record for an observed free-text name: the part it
/// resolved to, plus the family guessed from its tokens
pub fn observed_vector(raw_name: &str, part_id: &str) -> PartNameVector {
    let tokens = tokenize(raw_name);
    let family = infer_family(&tokens);
    let mut vector = PartNameVector::from_tokens(part_id, tokens);
    vector.raw_name = Some(raw_name.to_string());
    vector.family = family;
    vector
}

/// One ranked catalog candidate
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch {
    pub part_id: String,
    pub similarity: f64,
}

#[derive(Debug)]
struct DocVector {
    part_id: String,
    weights: BTreeMap<String, f64>,
    norm: f64,
}

/// An immutable TF-IDF view of the corpus
#[derive(Debug, Default)]
pub struct CorpusSnapshot {
    docs: Vec<DocVector>,
    idf: BTreeMap<String, f64>,
}

impl CorpusSnapshot {
    /// Weight the corpus. IDF is smoothed so terms present in every
    /// document still carry a small positive weight.
    pub fn build(mut vectors: Vec<PartNameVector>) -> Self {
        vectors.sort_by(|a, b| a.part_id.cmp(&b.part_id));

        let n = vectors.len() as f64;
        let mut df: BTreeMap<String, u32> = BTreeMap::new();
        for vector in &vectors {
            for term in vector.tf.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let idf: BTreeMap<String, f64> = df
            .into_iter()
            .map(|(term, df)| (term, ((1.0 + n) / (1.0 + f64::from(df))).ln() + 1.0))
            .collect();

        let docs = vectors
            .into_iter()
            .map(|vector| {
                let weights: BTreeMap<String, f64> = vector
                    .tf
                    .iter()
                    .map(|(term, &tf)| {
                        let idf = idf.get(term).copied().unwrap_or(1.0);
                        (term.clone(), f64::from(tf) * idf)
                    })
                    .collect();
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                DocVector {
                    part_id: vector.part_id,
                    weights,
                    norm,
                }
            })
            .collect();

        Self { docs, idf }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn rank(&self, query: &str, floor: f64, top_k: usize) -> Vec<NameMatch> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }
        let query_vector = PartNameVector::from_tokens("", tokens);
        let weights: BTreeMap<&String, f64> = query_vector
            .tf
            .iter()
            .map(|(term, &tf)| {
                let idf = self.idf.get(term).copied().unwrap_or(1.0);
                (term, f64::from(tf) * idf)
            })
            .collect();
        let query_norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut matches: Vec<NameMatch> = self
            .docs
            .iter()
            .filter(|doc| doc.norm > 0.0)
            .map(|doc| {
                let dot: f64 = weights
                    .iter()
                    .filter_map(|(term, qw)| doc.weights.get(*term).map(|dw| qw * dw))
                    .sum();
                NameMatch {
                    part_id: doc.part_id.clone(),
                    similarity: dot / (query_norm * doc.norm),
                }
            })
            .filter(|m| m.similarity >= floor)
            .collect();

        // Ties break on part_id so rankings are stable across runs
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.part_id.cmp(&b.part_id))
        });
        matches.truncate(top_k);
        matches
    }
}

/// The matcher service: snapshot holder plus ranking thresholds
#[derive(Debug)]
pub struct NameMatcher {
    snapshot: RwLock<Arc<CorpusSnapshot>>,
    similarity_floor: f64,
    top_k: usize,
}

impl NameMatcher {
    pub fn new(settings: &MatcherSettings) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CorpusSnapshot::default())),
            similarity_floor: settings.similarity_floor,
            top_k: settings.top_k,
        }
    }

    /// Swap in a snapshot built from the given vectors
    pub fn rebuild(&self, vectors: Vec<PartNameVector>) {
        let snapshot = Arc::new(CorpusSnapshot::build(vectors));
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }

    /// The current corpus view
    pub fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Ranked candidates above the similarity floor, best first
    pub fn rank(&self, query: &str) -> Vec<NameMatch> {
        self.snapshot().rank(query, self.similarity_floor, self.top_k)
    }

    /// The single best candidate, if any clears the floor
    pub fn best(&self, query: &str) -> Option<NameMatch> {
        self.rank(query).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher_with(parts: &[Part]) -> NameMatcher {
        let matcher = NameMatcher::new(&MatcherSettings::default());
        matcher.rebuild(parts.iter().map(part_vector).collect());
        matcher
    }

    fn catalog() -> Vec<Part> {
        let mut flange50 = Part::new("FLANGE-DN50-PN16-RF", PartFamily::Flange);
        flange50.dn = Some(50);
        flange50.pn = Some(16);
        let mut flange80 = Part::new("FLANGE-DN80-PN16-RF", PartFamily::Flange);
        flange80.dn = Some(80);
        flange80.pn = Some(16);
        let mut pipe = Part::new("PIPE-DN50", PartFamily::Pipe);
        pipe.dn = Some(50);
        vec![flange50, flange80, pipe]
    }

    #[test]
    fn test_tokenize_normalizes_dimensions() {
        assert_eq!(
            tokenize("50mm Weld Neck Flange"),
            vec!["dn50", "weld", "neck", "flange"]
        );
        assert_eq!(tokenize("DN 50 pipe"), vec!["dn50", "pipe"]);
        assert_eq!(tokenize("FLANGE-DN50-PN16-RF"), vec!["flange", "dn50", "pn16", "rf"]);
    }

    #[test]
    fn test_stop_tokens_dropped() {
        assert_eq!(tokenize("flange with a gasket"), vec!["flange", "gasket"]);
    }

    #[test]
    fn test_ranking_prefers_matching_dimension() {
        let matcher = matcher_with(&catalog());
        let best = matcher.best("50mm flange").unwrap();
        assert_eq!(best.part_id, "FLANGE-DN50-PN16-RF");
    }

    #[test]
    fn test_unrelated_query_clears_nothing() {
        let matcher = matcher_with(&catalog());
        assert!(matcher.rank("hydraulic accumulator").is_empty());
    }

    #[test]
    fn test_rank_is_deterministic_and_bounded() {
        let matcher = matcher_with(&catalog());
        let first = matcher.rank("flange pn16");
        let second = matcher.rank("flange pn16");
        assert_eq!(first, second);
        assert!(first.len() <= 5);
        assert!(first.len() >= 2);
    }

    #[test]
    fn test_rebuild_swaps_snapshot() {
        let matcher = matcher_with(&catalog());
        let before = matcher.snapshot();
        matcher.rebuild(Vec::new());
        assert!(matcher.snapshot().is_empty());
        // The old snapshot stays valid for holders
        assert_eq!(before.len(), 3);
    }

    #[test]
    fn test_infer_family() {
        assert_eq!(
            infer_family(&tokenize("50mm weld neck flange")),
            Some(PartFamily::Flange)
        );
        assert_eq!(infer_family(&tokenize("unknown widget")), None);
    }

    #[test]
    fn test_observed_vector_carries_name_and_family() {
        let v = observed_vector("50mm rf flange pn16", "FLANGE-DN50-PN16-RF");
        assert_eq!(v.part_id, "FLANGE-DN50-PN16-RF");
        assert_eq!(v.raw_name.as_deref(), Some("50mm rf flange pn16"));
        assert_eq!(v.family, Some(PartFamily::Flange));
        assert_eq!(v.occurrence_count, 1);
        assert_eq!(v.tokens, vec!["dn50", "rf", "flange", "pn16"]);
    }
}
