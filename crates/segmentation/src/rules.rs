//! Rule tree model: the user-authored boolean tree a segment is defined by.
//!
//! Trees arrive as JSON in the rule-builder schema: groups carry `condition`
//! and a nested `rules` list, leaves carry `id`, `field`, `operator` and
//! `value`. A node is a group exactly when it has a `rules` key. Parsing turns
//! that duck-typed shape into [`RuleNode`] once, so compilation never has to
//! look at raw keys or id substrings again.

use std::fmt;
use std::str::FromStr;

use leadgen_core::config::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CompileError, CompileResult, RulePath};

/// Id prefix marking a leaf as a relative date comparison, e.g. `created_at-m`.
pub const TEMPORAL_ID_MARKER: &str = "created_at-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Condition {
    #[default]
    And,
    Or,
}

impl Condition {
    /// Boolean-combination key used in the compiled query.
    pub fn key(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Self::And),
            "or" => Ok(Self::Or),
            other => Err(format!("unknown condition `{other}`")),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    In,
    GreaterOrEqual,
    LessOrEqual,
}

impl Operator {
    pub const ALL: &'static [Operator] = &[
        Self::Equal,
        Self::In,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::In => "in",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::LessOrEqual => "less_or_equal",
        }
    }
}

impl FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.iter().copied().find(|op| op.as_str() == s).ok_or(())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a relative date comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Years,
    Months,
    Weeks,
    #[default]
    Days,
    Hours,
}

impl TimeUnit {
    /// Unit selected by the character after `created_at-` in a leaf id.
    pub fn from_hint(c: char) -> Option<Self> {
        match c {
            'y' => Some(Self::Years),
            'm' | 'M' => Some(Self::Months),
            'w' => Some(Self::Weeks),
            'd' => Some(Self::Days),
            'h' | 'H' => Some(Self::Hours),
            _ => None,
        }
    }

    /// Character written into leaf ids.
    pub fn hint(self) -> char {
        match self {
            Self::Years => 'y',
            Self::Months => 'm',
            Self::Weeks => 'w',
            Self::Days => 'd',
            Self::Hours => 'h',
        }
    }

    /// Date-math symbol understood by the search engine.
    pub fn symbol(self) -> char {
        match self {
            Self::Years => 'y',
            Self::Months => 'M',
            Self::Weeks => 'w',
            Self::Days => 'd',
            Self::Hours => 'h',
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Marks a leaf as a relative date comparison in the given unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemporalHint {
    pub unit: TimeUnit,
}

impl TemporalHint {
    /// Extract the hint from a leaf id such as `created_at-w`.
    ///
    /// A missing unit character means days. An unknown one is returned as
    /// the error.
    pub fn from_id(id: &str) -> Result<Option<Self>, char> {
        let Some(at) = id.find(TEMPORAL_ID_MARKER) else {
            return Ok(None);
        };
        match id[at + TEMPORAL_ID_MARKER.len()..].chars().next() {
            None => Ok(Some(Self {
                unit: TimeUnit::default(),
            })),
            Some(c) => TimeUnit::from_hint(c)
                .map(|unit| Some(Self { unit }))
                .ok_or(c),
        }
    }

    /// Leaf id that round-trips to this hint.
    pub fn id(self) -> String {
        format!("{TEMPORAL_ID_MARKER}{}", self.unit.hint())
    }
}

/// A single comparison on an interaction field.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    id: String,
    field: String,
    operator: Operator,
    value: Value,
    temporal: Option<TemporalHint>,
}

impl Leaf {
    /// Leaf whose id is its field name and which carries no temporal hint.
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        let field = field.into();
        Self {
            id: field.clone(),
            field,
            operator,
            value: value.into(),
            temporal: None,
        }
    }

    /// Relative date comparison on the interaction timestamp.
    pub fn relative(hint: TemporalHint, operator: Operator, amount: u64) -> Self {
        Self {
            id: hint.id(),
            field: "created_at".to_string(),
            operator,
            value: amount.into(),
            temporal: Some(hint),
        }
    }

    /// Build a leaf as authored, deriving its temporal hint from the id.
    pub fn parse(
        id: impl Into<String>,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<Self, String> {
        let id = id.into();
        let temporal = TemporalHint::from_id(&id)
            .map_err(|c| format!("unknown time unit `{c}` in id `{id}`"))?;
        Ok(Self {
            id,
            field: field.into(),
            operator,
            value: value.into(),
            temporal,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn temporal(&self) -> Option<TemporalHint> {
        self.temporal
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub condition: Condition,
    pub children: Vec<RuleNode>,
}

impl Group {
    pub fn new(condition: Condition, children: Vec<RuleNode>) -> Self {
        Self {
            condition,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Group(Group),
    Leaf(Leaf),
}

/// Counts gathered by walking a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RulesetSummary {
    pub groups: usize,
    pub leaves: usize,
    pub depth: usize,
}

/// Top-level rule tree of a segment. An absent root selects every customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Ruleset {
    root: Option<Group>,
}

impl Ruleset {
    pub fn new(root: Group) -> Self {
        Self { root: Some(root) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Group> {
        self.root.as_ref()
    }

    /// True when compiling would select every customer.
    pub fn is_empty(&self) -> bool {
        match &self.root {
            Some(root) => root.children.is_empty(),
            None => true,
        }
    }

    /// Parse with the default nesting limit.
    pub fn from_value(value: &Value) -> CompileResult<Self> {
        Self::parse(value, DEFAULT_MAX_DEPTH)
    }

    /// Parse the rule-builder JSON shape. `null` and `{}` mean no rules.
    ///
    /// Groups nested deeper than `max_depth` (the root is depth 1) are
    /// refused before they are descended into.
    pub fn parse(value: &Value, max_depth: usize) -> CompileResult<Self> {
        let path = RulePath::root();
        let object = match value {
            Value::Null => return Ok(Self::empty()),
            Value::Object(object) if object.is_empty() => return Ok(Self::empty()),
            Value::Object(object) => object,
            other => {
                return Err(CompileError::malformed(
                    &path,
                    format!("expected an object, found {}", kind(other)),
                ))
            }
        };
        if !has_rules(object) && is_leaf_shaped(object) {
            return Err(CompileError::malformed(&path, "root node must be a group"));
        }
        Ok(Self::new(parse_group(object, &path, 1, max_depth)?))
    }

    pub fn to_value(&self) -> Value {
        match &self.root {
            Some(root) => group_to_value(root),
            None => Value::Null,
        }
    }

    pub fn summary(&self) -> RulesetSummary {
        let mut summary = RulesetSummary::default();
        if let Some(root) = &self.root {
            tally(root, 1, &mut summary);
        }
        summary
    }
}

impl TryFrom<Value> for Ruleset {
    type Error = CompileError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

impl From<Ruleset> for Value {
    fn from(ruleset: Ruleset) -> Self {
        ruleset.to_value()
    }
}

fn tally(group: &Group, depth: usize, summary: &mut RulesetSummary) {
    summary.groups += 1;
    summary.depth = summary.depth.max(depth);
    for child in &group.children {
        match child {
            RuleNode::Group(inner) => tally(inner, depth + 1, summary),
            RuleNode::Leaf(_) => summary.leaves += 1,
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A node is a group when it carries a non-null `rules` entry.
fn has_rules(object: &Map<String, Value>) -> bool {
    object.get("rules").is_some_and(|rules| !rules.is_null())
}

fn is_leaf_shaped(object: &Map<String, Value>) -> bool {
    ["id", "field", "operator", "value"]
        .iter()
        .any(|key| object.contains_key(*key))
}

fn parse_node(
    value: &Value,
    path: &RulePath,
    depth: usize,
    max_depth: usize,
) -> CompileResult<RuleNode> {
    let Value::Object(object) = value else {
        return Err(CompileError::malformed(
            path,
            format!("expected an object, found {}", kind(value)),
        ));
    };
    if has_rules(object) {
        parse_group(object, path, depth + 1, max_depth).map(RuleNode::Group)
    } else {
        parse_leaf(object, path).map(RuleNode::Leaf)
    }
}

fn parse_group(
    object: &Map<String, Value>,
    path: &RulePath,
    depth: usize,
    max_depth: usize,
) -> CompileResult<Group> {
    if depth > max_depth {
        return Err(CompileError::DepthExceeded {
            max_depth,
            path: path.clone(),
        });
    }

    let condition = match object.get("condition") {
        None | Some(Value::Null) => Condition::default(),
        Some(Value::String(s)) if s.is_empty() => Condition::default(),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|reason: String| CompileError::malformed(path, reason))?,
        Some(other) => {
            return Err(CompileError::malformed(
                path,
                format!("`condition` must be a string, found {}", kind(other)),
            ))
        }
    };

    let children = match object.get("rules") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rules)) => rules
            .iter()
            .enumerate()
            .map(|(i, rule)| parse_node(rule, &path.child(i), depth, max_depth))
            .collect::<CompileResult<Vec<_>>>()?,
        Some(other) => {
            return Err(CompileError::malformed(
                path,
                format!("`rules` must be an array, found {}", kind(other)),
            ))
        }
    };

    Ok(Group::new(condition, children))
}

fn parse_leaf(object: &Map<String, Value>, path: &RulePath) -> CompileResult<Leaf> {
    let field = required_str(object, "field", path)?;
    let operator = required_str(object, "operator", path)?;
    let id = match object.get("id") {
        None | Some(Value::Null) => field,
        Some(Value::String(id)) => id.as_str(),
        Some(other) => {
            return Err(CompileError::malformed(
                path,
                format!("`id` must be a string, found {}", kind(other)),
            ))
        }
    };
    let operator = operator
        .parse::<Operator>()
        .map_err(|()| CompileError::UnsupportedOperator {
            operator: operator.to_string(),
            field: field.to_string(),
            path: path.clone(),
        })?;
    let value = object.get("value").cloned().unwrap_or(Value::Null);
    Leaf::parse(id, field, operator, value).map_err(|reason| CompileError::malformed(path, reason))
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &RulePath,
) -> CompileResult<&'a str> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(CompileError::malformed(
            path,
            format!("leaf `{key}` must not be empty"),
        )),
        Some(other) if !other.is_null() => Err(CompileError::malformed(
            path,
            format!("leaf `{key}` must be a string, found {}", kind(other)),
        )),
        _ => Err(CompileError::malformed(
            path,
            format!("leaf is missing `{key}`"),
        )),
    }
}

fn group_to_value(group: &Group) -> Value {
    let rules = group
        .children
        .iter()
        .map(|child| match child {
            RuleNode::Group(inner) => group_to_value(inner),
            RuleNode::Leaf(leaf) => serde_json::json!({
                "id": leaf.id,
                "field": leaf.field,
                "operator": leaf.operator.as_str(),
                "value": leaf.value,
            }),
        })
        .collect::<Vec<_>>();
    serde_json::json!({
        "condition": group.condition.to_string(),
        "rules": rules,
    })
}
