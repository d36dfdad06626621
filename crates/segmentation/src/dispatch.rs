//! Operator dispatch: turns one leaf into one query clause.

use serde_json::Value;

use crate::compiler::CompilerOptions;
use crate::error::{CompileError, CompileResult, RulePath};
use crate::query::{Bound, Clause};
use crate::rules::{Leaf, Operator, TemporalHint};

/// Build the clause for `leaf`.
///
/// Equality and membership ignore any temporal hint. For the two range
/// operators the hint decides between a relative date range and a numeric one.
pub fn leaf_clause(
    leaf: &Leaf,
    options: &CompilerOptions,
    path: &RulePath,
) -> CompileResult<Clause> {
    match (leaf.operator(), leaf.temporal()) {
        (Operator::Equal, _) => Ok(Clause::Match {
            field: options.field_path(leaf.field()),
            value: leaf.value().clone(),
        }),
        (Operator::In, _) => match leaf.value() {
            Value::Array(values) => Ok(Clause::Terms {
                field: options.field_path(leaf.field()),
                values: values.clone(),
            }),
            other => Err(invalid_operand(leaf, other, path)),
        },
        (Operator::GreaterOrEqual, Some(hint)) => {
            date_range(leaf, hint, Bound::Lower, options, path)
        }
        (Operator::LessOrEqual, Some(hint)) => date_range(leaf, hint, Bound::Upper, options, path),
        (Operator::GreaterOrEqual, None) => numeric_range(leaf, Bound::Lower, options, path),
        (Operator::LessOrEqual, None) => numeric_range(leaf, Bound::Upper, options, path),
    }
}

fn date_range(
    leaf: &Leaf,
    hint: TemporalHint,
    bound: Bound,
    options: &CompilerOptions,
    path: &RulePath,
) -> CompileResult<Clause> {
    let amount = match leaf.value() {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| invalid_operand(leaf, leaf.value(), path))?;

    Ok(Clause::DateRange {
        field: options.field_path(&options.timestamp_field),
        bound,
        amount,
        unit: hint.unit,
    })
}

fn numeric_range(
    leaf: &Leaf,
    bound: Bound,
    options: &CompilerOptions,
    path: &RulePath,
) -> CompileResult<Clause> {
    let value = match leaf.value() {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| invalid_operand(leaf, leaf.value(), path))?;

    Ok(Clause::NumericRange {
        field: options.field_path(leaf.field()),
        bound,
        value,
    })
}

fn invalid_operand(leaf: &Leaf, value: &Value, path: &RulePath) -> CompileError {
    CompileError::InvalidOperand {
        field: leaf.field().to_string(),
        value: value.to_string(),
        path: path.clone(),
    }
}
