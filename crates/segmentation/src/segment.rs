//! Segments and the catalog that keeps their compiled queries.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::compiler::RulesetCompiler;
use crate::error::CompileResult;
use crate::query::CompiledQuery;
use crate::rules::Ruleset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub ruleset: Ruleset,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Segment {
    pub fn new(name: impl Into<String>, ruleset: Ruleset) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description: None,
            ruleset,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn compile(&self, compiler: &RulesetCompiler) -> CompileResult<CompiledQuery> {
        compiler.compile(&self.ruleset)
    }
}

/// Lower-case, with every run of non-alphanumerics collapsed into one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

struct CatalogEntry {
    segment: Segment,
    query: CompiledQuery,
}

/// Registered segments alongside their compiled queries.
///
/// A segment is only stored once its ruleset compiles.
pub struct SegmentCatalog {
    compiler: RulesetCompiler,
    segments: DashMap<Uuid, CatalogEntry>,
}

impl SegmentCatalog {
    pub fn new(compiler: RulesetCompiler) -> Self {
        Self {
            compiler,
            segments: DashMap::new(),
        }
    }

    pub fn register(&self, segment: Segment) -> CompileResult<Uuid> {
        let query = segment.compile(&self.compiler).map_err(|e| {
            warn!(segment_id = %segment.id, name = %segment.name, error = %e, "Rejected segment definition");
            e
        })?;
        let id = segment.id;
        info!(segment_id = %id, name = %segment.name, "Registered segment");
        self.segments.insert(id, CatalogEntry { segment, query });
        Ok(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<Segment> {
        self.segments.get(id).map(|e| e.segment.clone())
    }

    pub fn query_for(&self, id: &Uuid) -> Option<CompiledQuery> {
        self.segments.get(id).map(|e| e.query.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Segment> {
        self.segments.remove(id).map(|(_, e)| e.segment)
    }

    /// All segments, ordered by name.
    pub fn list(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self.segments.iter().map(|e| e.segment.clone()).collect();
        segments.sort_by(|a, b| a.name.cmp(&b.name));
        segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Default for SegmentCatalog {
    fn default() -> Self {
        Self::new(RulesetCompiler::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RulesetBuilder;
    use crate::error::CompileError;
    use serde_json::json;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Big Spenders (SP)"), "big-spenders-sp");
        assert_eq!(slugify("  --Clicked  twice--"), "clicked-twice");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = SegmentCatalog::default();
        let segment = Segment::new(
            "Clickers",
            RulesetBuilder::new().equal("interaction", "click").build(),
        )
        .tag("web");
        let id = catalog.register(segment).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&id).unwrap().slug, "clickers");
        assert_eq!(
            catalog.query_for(&id).unwrap().to_value(),
            json!({"query": {"constant_score": {"filter": {"and": [
                {"match": {"interactions.interaction": "click"}}
            ]}}}})
        );

        assert!(catalog.remove(&id).is_some());
        assert!(catalog.is_empty());
        assert!(catalog.query_for(&id).is_none());
    }

    #[test]
    fn test_invalid_segment_is_rejected() {
        let catalog = SegmentCatalog::default();
        let segment = Segment::new("Valid", RulesetBuilder::new().equal("interaction", "open").build());
        assert!(catalog.register(segment).is_ok());

        let ruleset: Ruleset = serde_json::from_value(json!({
            "rules": [{"field": "amount", "operator": "less_or_equal", "value": "a lot"}]
        }))
        .unwrap();
        let err = catalog.register(Segment::new("Worse", ruleset)).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOperand { .. }));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let catalog = SegmentCatalog::default();
        for name in ["Zeta", "Alpha", "Mid"] {
            catalog.register(Segment::new(name, Ruleset::empty())).unwrap();
        }
        let names: Vec<String> = catalog.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_segment_json_round_trip() {
        let segment = Segment::new("Recent", RulesetBuilder::new().within(7, crate::TimeUnit::Days).build())
            .description("Active this week");
        let text = serde_json::to_string(&segment).unwrap();
        let back: Segment = serde_json::from_str(&text).unwrap();
        assert_eq!(back.id, segment.id);
        assert_eq!(back.ruleset, segment.ruleset);
        assert_eq!(back.description.as_deref(), Some("Active this week"));
    }

    #[test]
    fn test_segment_with_unsupported_operator_fails_to_deserialize() {
        let result: Result<Segment, _> = serde_json::from_value(json!({
            "id": Uuid::nil(),
            "name": "Contains",
            "slug": "contains",
            "description": null,
            "ruleset": {"rules": [{"field": "interaction", "operator": "contains", "value": "cl"}]},
            "created_at": "2016-12-17T00:00:00Z",
            "updated_at": "2016-12-17T00:00:00Z",
        }));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unsupported operator `contains`"), "{err}");
    }
}
