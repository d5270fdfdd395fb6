//! Connection template library and resolution
//!
//! Resolution is direction-agnostic: a (flange, pipe) query matches a
//! pipe/flange template with the swap flag set. Among candidate
//! templates, the most specific wins. Specificity is (1 + constrained
//! field matches) / 5 over the four optional keys (dn, pn, end_type,
//! face_type), so a fully-keyed template scores 1.0 and a bare family
//! pair scores 0.2. Ties go to library order, which follows filename
//! order in the catalog.

use std::path::Path;

use crate::core::error::EngineError;
use crate::core::loader;
use crate::core::workspace::Workspace;
use crate::entities::part::Part;
use crate::entities::template::ConnectionTemplate;

/// A resolved template with orientation and specificity
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatch<'a> {
    pub template: &'a ConnectionTemplate,

    /// True when the query's first part plays the template's B role
    pub swapped: bool,

    /// Specificity score in (0, 1]
    pub specificity: f64,
}

/// The connection template catalog, in load order
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    templates: Vec<ConnectionTemplate>,
}

impl TemplateLibrary {
    pub fn load(workspace: &Workspace) -> Result<Self, EngineError> {
        Self::load_dir(&workspace.templates_dir())
    }

    /// A template file that fails to parse is a configuration fault; no
    /// safe fallback exists for a half-loaded library
    pub fn load_dir(dir: &Path) -> Result<Self, EngineError> {
        let templates: Vec<ConnectionTemplate> = loader::load_all_strict(dir)
            .map_err(|e| EngineError::ConfigurationFault(format!("template library: {}", e)))?;
        Ok(Self::from_templates(templates))
    }

    pub fn from_templates(templates: Vec<ConnectionTemplate>) -> Self {
        Self { templates }
    }

    pub fn get(&self, template_id: &str) -> Option<&ConnectionTemplate> {
        self.templates.iter().find(|t| t.template_id == template_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve the best template for a part pair. Returns None when no
    /// template joins the pair's families or every family match is
    /// excluded by a constrained field or selector.
    pub fn resolve<'a>(&'a self, a: &Part, b: &Part) -> Option<TemplateMatch<'a>> {
        let mut best: Option<TemplateMatch<'a>> = None;

        for template in &self.templates {
            let Some(swapped) = template.matches_families(a.family, b.family) else {
                continue;
            };
            let Some(matched_keys) = constrained_key_matches(template, a, b) else {
                continue;
            };
            if !selector_matches(template, a, b) {
                continue;
            }

            let specificity = (1.0 + matched_keys as f64) / 5.0;
            // Strict comparison keeps the earliest template on ties
            if best.map_or(true, |m| specificity > m.specificity) {
                best = Some(TemplateMatch {
                    template,
                    swapped,
                    specificity,
                });
            }
        }

        best
    }
}

/// Count how many constrained optional keys match the pair, or None when
/// any constrained key mismatches. A constrained key matches when either
/// part carries an equal value.
fn constrained_key_matches(template: &ConnectionTemplate, a: &Part, b: &Part) -> Option<u32> {
    let mut matched = 0;

    if let Some(dn) = template.dn {
        if a.dn != Some(dn) && b.dn != Some(dn) {
            return None;
        }
        matched += 1;
    }
    if let Some(pn) = template.pn {
        if a.pn != Some(pn) && b.pn != Some(pn) {
            return None;
        }
        matched += 1;
    }
    if let Some(end_type) = template.end_type {
        if a.end_type != Some(end_type) && b.end_type != Some(end_type) {
            return None;
        }
        matched += 1;
    }
    if let Some(face_type) = template.face_type {
        if a.face_type != Some(face_type) && b.face_type != Some(face_type) {
            return None;
        }
        matched += 1;
    }

    Some(matched)
}

/// Every selector entry must equal an attribute on at least one part
fn selector_matches(template: &ConnectionTemplate, a: &Part, b: &Part) -> bool {
    template
        .selector
        .iter()
        .all(|(key, want)| part_attr(a, key).as_ref() == Some(want) || part_attr(b, key).as_ref() == Some(want))
}

fn part_attr(part: &Part, key: &str) -> Option<serde_json::Value> {
    match key {
        "dn" => part.dn.map(|v| serde_json::json!(v)),
        "pn" => part.pn.map(|v| serde_json::json!(v)),
        "mat" => part.mat.as_deref().map(|v| serde_json::json!(v)),
        "std" => part.std.as_deref().map(|v| serde_json::json!(v)),
        "family" => Some(serde_json::json!(part.family.to_string())),
        other => part.meta.get(other).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::part::{FaceType, PartFamily};
    use crate::entities::template::{JoinRule, MateSchema};
    use std::collections::BTreeMap;

    fn template(
        id: &str,
        family_a: PartFamily,
        family_b: PartFamily,
        dn: Option<u32>,
        pn: Option<u32>,
    ) -> ConnectionTemplate {
        ConnectionTemplate {
            template_id: id.to_string(),
            family_a,
            family_b,
            dn,
            pn,
            end_type: None,
            face_type: None,
            join_rule: JoinRule::CoaxialPlaneCoincident,
            mate_schema: MateSchema::default(),
            fasteners: None,
            selector: BTreeMap::new(),
        }
    }

    fn part(id: &str, family: PartFamily, dn: Option<u32>, pn: Option<u32>) -> Part {
        let mut part = Part::new(id, family);
        part.dn = dn;
        part.pn = pn;
        part
    }

    #[test]
    fn test_corrupt_template_file_is_a_configuration_fault() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "template_id: [unclosed").unwrap();
        let err = TemplateLibrary::load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigurationFault(_)));
    }

    #[test]
    fn test_most_specific_wins() {
        let library = TemplateLibrary::from_templates(vec![
            template("GENERIC", PartFamily::Pipe, PartFamily::Flange, None, None),
            template(
                "DN50",
                PartFamily::Pipe,
                PartFamily::Flange,
                Some(50),
                None,
            ),
            template(
                "DN50_PN16",
                PartFamily::Pipe,
                PartFamily::Flange,
                Some(50),
                Some(16),
            ),
        ]);

        let pipe = part("PIPE-DN50", PartFamily::Pipe, Some(50), None);
        let flange = part("FLANGE-DN50-PN16", PartFamily::Flange, Some(50), Some(16));

        let m = library.resolve(&pipe, &flange).unwrap();
        assert_eq!(m.template.template_id, "DN50_PN16");
        assert!((m.specificity - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_swap_flag_for_reversed_query() {
        let library = TemplateLibrary::from_templates(vec![template(
            "T",
            PartFamily::Pipe,
            PartFamily::Flange,
            None,
            None,
        )]);

        let pipe = part("P", PartFamily::Pipe, None, None);
        let flange = part("F", PartFamily::Flange, None, None);

        assert!(!library.resolve(&pipe, &flange).unwrap().swapped);
        assert!(library.resolve(&flange, &pipe).unwrap().swapped);
    }

    #[test]
    fn test_constrained_mismatch_excludes() {
        let library = TemplateLibrary::from_templates(vec![template(
            "DN80",
            PartFamily::Pipe,
            PartFamily::Flange,
            Some(80),
            None,
        )]);

        let pipe = part("P", PartFamily::Pipe, Some(50), None);
        let flange = part("F", PartFamily::Flange, Some(50), None);
        assert!(library.resolve(&pipe, &flange).is_none());
    }

    #[test]
    fn test_tie_goes_to_library_order() {
        let library = TemplateLibrary::from_templates(vec![
            template("FIRST", PartFamily::Pipe, PartFamily::Flange, Some(50), None),
            template("SECOND", PartFamily::Pipe, PartFamily::Flange, None, Some(16)),
        ]);

        let pipe = part("P", PartFamily::Pipe, Some(50), Some(16));
        let flange = part("F", PartFamily::Flange, Some(50), Some(16));

        let m = library.resolve(&pipe, &flange).unwrap();
        assert_eq!(m.template.template_id, "FIRST");
    }

    #[test]
    fn test_selector_filters_on_material() {
        let mut tpl = template("SS", PartFamily::Pipe, PartFamily::Flange, None, None);
        tpl.selector
            .insert("mat".to_string(), serde_json::json!("316L"));
        let library = TemplateLibrary::from_templates(vec![tpl]);

        let mut pipe = part("P", PartFamily::Pipe, None, None);
        let flange = part("F", PartFamily::Flange, None, None);
        assert!(library.resolve(&pipe, &flange).is_none());

        pipe.mat = Some("316L".to_string());
        assert!(library.resolve(&pipe, &flange).is_some());
    }

    #[test]
    fn test_face_type_key_counts_toward_specificity() {
        let mut keyed = template("RF", PartFamily::Pipe, PartFamily::Flange, Some(50), None);
        keyed.face_type = Some(FaceType::Rf);
        let library = TemplateLibrary::from_templates(vec![
            template("PLAIN", PartFamily::Pipe, PartFamily::Flange, Some(50), None),
            keyed,
        ]);

        let pipe = part("P", PartFamily::Pipe, Some(50), None);
        let mut flange = part("F", PartFamily::Flange, Some(50), None);
        flange.face_type = Some(FaceType::Rf);

        let m = library.resolve(&pipe, &flange).unwrap();
        assert_eq!(m.template.template_id, "RF");
        assert!((m.specificity - 0.6).abs() < 1e-12);
    }
}
