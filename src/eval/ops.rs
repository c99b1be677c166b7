//! Operation semantics
//!
//! One value rule per node type. Every rule maps resolved operand strings
//! to a new string; numeric and boolean results use their canonical text.
//! Positions and lengths count `char`s, not bytes.

use regex::Regex;

use crate::error::EvalError;
use crate::graph::{CaseKind, NodeKind, PatternMode};

/// Apply the value rule of `kind` to its resolved operand values.
///
/// `values` holds one entry per operand of `kind`, in the order given by
/// [`NodeKind::operands`].
pub fn apply(
    index: usize,
    kind: &NodeKind<'_>,
    values: &[&str],
) -> Result<String, EvalError> {
    match (kind, values) {
        (NodeKind::Constant { value }, []) => Ok((*value).to_string()),
        (NodeKind::Concatenation { .. }, parts) => Ok(parts.concat()),
        (NodeKind::Substring { start, end, .. }, [input]) => Ok(substring(input, *start, *end)),
        (NodeKind::Replacement { .. }, [input, old, new]) => Ok(replace(input, old, new)),
        (NodeKind::PatternMatching { mode, .. }, [input, pattern]) => {
            match_pattern(input, pattern, *mode).map_err(|e| EvalError::InvalidPattern {
                index,
                message: e.to_string(),
            })
        }
        (NodeKind::CaseConversion { case, .. }, [input]) => Ok(convert_case(input, *case)),
        (NodeKind::LengthCalculation { .. }, [input]) => Ok(length(input)),
        (kind, values) => Err(EvalError::malformed(
            index,
            format!(
                "{} received {} operand value(s)",
                kind.node_type(),
                values.len()
            ),
        )),
    }
}

/// Characters `[start, end)` of `input`.
///
/// Both bounds are clamped into `[0, len]`; an inverted range is empty.
pub fn substring(
    input: &str,
    start: i64,
    end: i64,
) -> String {
    let len = input.chars().count() as i64;
    let start = start.clamp(0, len) as usize;
    let end = end.clamp(0, len) as usize;
    if start >= end {
        return String::new();
    }
    input.chars().skip(start).take(end - start).collect()
}

/// Replace every non-overlapping occurrence of `old`, scanning left to right.
///
/// Inserted text is never rescanned. An empty `old` leaves `input` as is.
pub fn replace(
    input: &str,
    old: &str,
    new: &str,
) -> String {
    if old.is_empty() {
        return input.to_string();
    }
    input.replace(old, new)
}

pub fn match_pattern(
    input: &str,
    pattern: &str,
    mode: PatternMode,
) -> Result<String, regex::Error> {
    Ok(match mode {
        PatternMode::Regex => {
            let re = Regex::new(pattern)?;
            re.find(input)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        }
        PatternMode::Literal => {
            if input.contains(pattern) {
                pattern.to_string()
            } else {
                String::new()
            }
        }
        PatternMode::Test => input.contains(pattern).to_string(),
    })
}

pub fn convert_case(
    input: &str,
    case: CaseKind,
) -> String {
    match case {
        CaseKind::Upper => input.to_uppercase(),
        CaseKind::Lower => input.to_lowercase(),
    }
}

/// Decimal character count.
pub fn length(input: &str) -> String {
    input.chars().count().to_string()
}
