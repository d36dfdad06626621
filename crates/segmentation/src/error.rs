//! Compilation errors and the rule path used to locate them.

use std::fmt;

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("malformed rule tree at {path}: {reason}")]
    MalformedRuleTree { path: RulePath, reason: String },

    #[error("unsupported operator `{operator}` on field `{field}` at {path}")]
    UnsupportedOperator {
        operator: String,
        field: String,
        path: RulePath,
    },

    #[error("invalid operand {value} for field `{field}` at {path}")]
    InvalidOperand {
        field: String,
        value: String,
        path: RulePath,
    },

    #[error("rule tree nested deeper than {max_depth} groups at {path}")]
    DepthExceeded { max_depth: usize, path: RulePath },

    #[error("ruleset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Location of the failing node, when the error refers to one.
    pub fn path(&self) -> Option<&RulePath> {
        match self {
            Self::MalformedRuleTree { path, .. }
            | Self::UnsupportedOperator { path, .. }
            | Self::InvalidOperand { path, .. }
            | Self::DepthExceeded { path, .. } => Some(path),
            Self::Json(_) => None,
        }
    }

    pub(crate) fn malformed(path: &RulePath, reason: impl Into<String>) -> Self {
        Self::MalformedRuleTree {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

/// Child indices leading from the root group to a node.
///
/// Renders as `$` for the root and `rules[1].rules[0]` for descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RulePath(Vec<usize>);

impl RulePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for RulePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "rules[{index}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        assert_eq!(RulePath::root().to_string(), "$");
        assert_eq!(RulePath::root().child(1).child(0).to_string(), "rules[1].rules[0]");
    }

    #[test]
    fn test_error_message_names_operator_and_field() {
        let err = CompileError::UnsupportedOperator {
            operator: "contains".into(),
            field: "interaction".into(),
            path: RulePath::from(vec![2]),
        };
        assert_eq!(
            err.to_string(),
            "unsupported operator `contains` on field `interaction` at rules[2]"
        );
        assert_eq!(err.path().map(RulePath::indices), Some(&[2][..]));
    }
}
