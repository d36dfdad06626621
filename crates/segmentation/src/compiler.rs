//! Ruleset compiler: walks a rule tree and emits a filter-only query.

use leadgen_core::SegmentationConfig;
use serde_json::Value;
use tracing::{debug, info};

use crate::dispatch::leaf_clause;
use crate::error::{CompileError, CompileResult, RulePath};
use crate::query::{Clause, CompiledQuery};
use crate::rules::{Group, RuleNode, Ruleset};

#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Deepest group nesting accepted; the root group is depth 1.
    pub max_depth: usize,
    /// Relation holding interaction documents; prefixes every field.
    pub relation: String,
    /// Field targeted by relative date ranges.
    pub timestamp_field: String,
}

impl CompilerOptions {
    pub fn field_path(&self, field: &str) -> String {
        format!("{}.{}", self.relation, field)
    }
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self::from(&SegmentationConfig::default())
    }
}

impl From<&SegmentationConfig> for CompilerOptions {
    fn from(config: &SegmentationConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            relation: config.relation.clone(),
            timestamp_field: config.timestamp_field.clone(),
        }
    }
}

/// Stateless translator from [`Ruleset`] to [`CompiledQuery`].
///
/// Holds only its options, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct RulesetCompiler {
    options: CompilerOptions,
}

impl RulesetCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile(&self, ruleset: &Ruleset) -> CompileResult<CompiledQuery> {
        let root = match ruleset.root() {
            Some(root) if !root.children.is_empty() => root,
            _ => {
                debug!("Empty ruleset, selecting every customer");
                return Ok(CompiledQuery::match_all());
            }
        };

        let filter = self.compile_group(root, &RulePath::root(), 1)?;
        let summary = ruleset.summary();
        info!(
            groups = summary.groups,
            leaves = summary.leaves,
            depth = summary.depth,
            "Compiled ruleset"
        );
        Ok(CompiledQuery::filtered(filter))
    }

    /// Parse under this compiler's nesting limit.
    pub fn parse_value(&self, value: &Value) -> CompileResult<Ruleset> {
        Ruleset::parse(value, self.options.max_depth)
    }

    pub fn parse_json(&self, text: &str) -> CompileResult<Ruleset> {
        let value: Value = serde_json::from_str(text)?;
        self.parse_value(&value)
    }

    pub fn compile_value(&self, value: &Value) -> CompileResult<CompiledQuery> {
        self.compile(&self.parse_value(value)?)
    }

    pub fn compile_json(&self, text: &str) -> CompileResult<CompiledQuery> {
        self.compile(&self.parse_json(text)?)
    }

    fn compile_group(&self, group: &Group, path: &RulePath, depth: usize) -> CompileResult<Clause> {
        if depth > self.options.max_depth {
            return Err(CompileError::DepthExceeded {
                max_depth: self.options.max_depth,
                path: path.clone(),
            });
        }

        let mut clauses = Vec::with_capacity(group.children.len());
        for (i, child) in group.children.iter().enumerate() {
            let child_path = path.child(i);
            let clause = match child {
                RuleNode::Leaf(leaf) => leaf_clause(leaf, &self.options, &child_path)?,
                RuleNode::Group(inner) => Clause::Nested {
                    path: self.options.relation.clone(),
                    filter: Box::new(self.compile_group(inner, &child_path, depth + 1)?),
                },
            };
            clauses.push(clause);
        }

        debug!(
            path = %path,
            condition = group.condition.key(),
            clauses = clauses.len(),
            "Compiled rule group"
        );
        Ok(Clause::Bool {
            condition: group.condition,
            clauses,
        })
    }
}
