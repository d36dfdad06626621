//! Segment ruleset compilation: turns user-authored boolean rule trees into
//! filter-only search queries over customer interactions.

pub mod builder;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod query;
pub mod rules;
pub mod segment;

pub use builder::RulesetBuilder;
pub use compiler::{CompilerOptions, RulesetCompiler};
pub use error::{CompileError, CompileResult, RulePath};
pub use query::{Bound, Clause, CompiledQuery};
pub use rules::{
    Condition, Group, Leaf, Operator, RuleNode, Ruleset, RulesetSummary, TemporalHint, TimeUnit,
};
pub use segment::{Segment, SegmentCatalog};
