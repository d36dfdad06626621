//! Fluent API for assembling rule trees in code.

use serde_json::Value;

use crate::rules::{Condition, Group, Leaf, Operator, RuleNode, Ruleset, TemporalHint, TimeUnit};

#[derive(Debug, Clone, Default)]
pub struct RulesetBuilder {
    condition: Condition,
    children: Vec<RuleNode>,
}

impl RulesetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_or(mut self) -> Self {
        self.condition = Condition::Or;
        self
    }

    pub fn leaf(mut self, leaf: Leaf) -> Self {
        self.children.push(RuleNode::Leaf(leaf));
        self
    }

    pub fn equal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.leaf(Leaf::new(field, Operator::Equal, value))
    }

    pub fn any_of<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect::<Vec<Value>>();
        self.leaf(Leaf::new(field, Operator::In, values))
    }

    pub fn at_least(self, field: impl Into<String>, value: f64) -> Self {
        self.leaf(Leaf::new(field, Operator::GreaterOrEqual, value))
    }

    pub fn at_most(self, field: impl Into<String>, value: f64) -> Self {
        self.leaf(Leaf::new(field, Operator::LessOrEqual, value))
    }

    /// Interacted no earlier than `amount` units ago.
    pub fn within(self, amount: u64, unit: TimeUnit) -> Self {
        self.leaf(Leaf::relative(TemporalHint { unit }, Operator::GreaterOrEqual, amount))
    }

    /// Interacted no later than `amount` units ago.
    pub fn before(self, amount: u64, unit: TimeUnit) -> Self {
        self.leaf(Leaf::relative(TemporalHint { unit }, Operator::LessOrEqual, amount))
    }

    /// Nest another group, scoped to the interaction relation when compiled.
    pub fn group(mut self, group: RulesetBuilder) -> Self {
        self.children.push(RuleNode::Group(group.into_group()));
        self
    }

    pub fn into_group(self) -> Group {
        Group::new(self.condition, self.children)
    }

    pub fn build(self) -> Ruleset {
        Ruleset::new(self.into_group())
    }
}
