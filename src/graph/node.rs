//! Node model
//!
//! A [`FlatNode`] is decoded into a [`Node`] the first time the evaluator
//! reaches it. Decoding is where every shape check happens, from the
//! declared index and tag down to operand ranges and literal fields.

use std::fmt;

use serde_json::Value;
use smallvec::{smallvec, SmallVec};

use super::record::FlatNode;
use crate::error::EvalError;

/// Operand positions of one node, in semantic order.
pub type Operands = SmallVec<[usize; 4]>;

/// The operation tags of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Constant,
    Concatenation,
    Substring,
    Replacement,
    PatternMatching,
    CaseConversion,
    LengthCalculation,
}

impl NodeType {
    pub const ALL: [NodeType; 7] = [
        NodeType::Constant,
        NodeType::Concatenation,
        NodeType::Substring,
        NodeType::Replacement,
        NodeType::PatternMatching,
        NodeType::CaseConversion,
        NodeType::LengthCalculation,
    ];

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "constant" => NodeType::Constant,
            "concatenation" => NodeType::Concatenation,
            "substring" => NodeType::Substring,
            "replacement" => NodeType::Replacement,
            "pattern_matching" => NodeType::PatternMatching,
            "case_conversion" => NodeType::CaseConversion,
            "length_calculation" => NodeType::LengthCalculation,
            _ => return None,
        })
    }

    /// The wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Constant => "constant",
            NodeType::Concatenation => "concatenation",
            NodeType::Substring => "substring",
            NodeType::Replacement => "replacement",
            NodeType::PatternMatching => "pattern_matching",
            NodeType::CaseConversion => "case_conversion",
            NodeType::LengthCalculation => "length_calculation",
        }
    }

    /// Required operand count, `None` for variadic.
    fn arity(&self) -> Option<usize> {
        match self {
            NodeType::Constant => Some(0),
            NodeType::Concatenation => None,
            NodeType::Substring | NodeType::CaseConversion | NodeType::LengthCalculation => Some(1),
            NodeType::PatternMatching => Some(2),
            NodeType::Replacement => Some(3),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Direction of a `case_conversion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseKind {
    Upper,
    Lower,
}

impl CaseKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "upper" => Some(CaseKind::Upper),
            "lower" => Some(CaseKind::Lower),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            CaseKind::Upper => "upper",
            CaseKind::Lower => "lower",
        }
    }
}

/// How a `pattern_matching` node reads its pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PatternMode {
    /// Regular expression; yields the first match or `""`
    #[default]
    Regex,
    /// Plain substring; yields the pattern if found or `""`
    Literal,
    /// Plain substring; yields `"true"` or `"false"`
    Test,
}

impl PatternMode {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "regex" => Some(PatternMode::Regex),
            "literal" => Some(PatternMode::Literal),
            "test" => Some(PatternMode::Test),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            PatternMode::Regex => "regex",
            PatternMode::Literal => "literal",
            PatternMode::Test => "test",
        }
    }
}

/// A decoded operation with its operand positions and literal arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Constant {
        value: &'a str,
    },
    Concatenation {
        operands: Operands,
    },
    Substring {
        input: usize,
        start: i64,
        end: i64,
    },
    Replacement {
        input: usize,
        old: usize,
        new: usize,
    },
    PatternMatching {
        input: usize,
        pattern: usize,
        mode: PatternMode,
    },
    CaseConversion {
        input: usize,
        case: CaseKind,
    },
    LengthCalculation {
        input: usize,
    },
}

impl NodeKind<'_> {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Constant { .. } => NodeType::Constant,
            NodeKind::Concatenation { .. } => NodeType::Concatenation,
            NodeKind::Substring { .. } => NodeType::Substring,
            NodeKind::Replacement { .. } => NodeType::Replacement,
            NodeKind::PatternMatching { .. } => NodeType::PatternMatching,
            NodeKind::CaseConversion { .. } => NodeType::CaseConversion,
            NodeKind::LengthCalculation { .. } => NodeType::LengthCalculation,
        }
    }

    /// Operand positions in the order the value rule consumes them.
    pub fn operands(&self) -> Operands {
        match self {
            NodeKind::Constant { .. } => SmallVec::new(),
            NodeKind::Concatenation { operands } => operands.clone(),
            NodeKind::Substring { input, .. }
            | NodeKind::CaseConversion { input, .. }
            | NodeKind::LengthCalculation { input } => smallvec![*input],
            NodeKind::Replacement { input, old, new } => smallvec![*input, *old, *new],
            NodeKind::PatternMatching { input, pattern, .. } => smallvec![*input, *pattern],
        }
    }
}

/// A validated node, borrowing its literals from the flat array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'a> {
    index: usize,
    kind: NodeKind<'a>,
}

impl<'a> Node<'a> {
    /// Decode the record at `index` of an array of `len` records.
    pub fn decode(
        index: usize,
        record: &'a FlatNode,
        len: usize,
    ) -> Result<Self, EvalError> {
        if let Some(stray) = &record.stray {
            return Err(EvalError::malformed(
                index,
                format!("record must be an object, found {stray}"),
            ));
        }

        match &record.index {
            Some(declared) if declared.as_u64() == Some(index as u64) => {}
            Some(declared) => {
                return Err(EvalError::malformed(
                    index,
                    format!("record carries index {declared} at position {index}"),
                ))
            }
            None => return Err(EvalError::malformed(index, "missing 'index'")),
        }

        let node_type = match &record.node_type {
            Some(Value::String(tag)) => {
                NodeType::from_tag(tag).ok_or_else(|| EvalError::UnknownNodeType {
                    index,
                    node_type: tag.clone(),
                })?
            }
            Some(other) => {
                return Err(EvalError::malformed(
                    index,
                    format!("'node_type' must be a string, found {other}"),
                ))
            }
            None => return Err(EvalError::malformed(index, "missing 'node_type'")),
        };

        let operands = decode_operands(index, record, node_type, len)?;

        let kind = match node_type {
            NodeType::Constant => NodeKind::Constant {
                value: string_arg(index, record, "value")?,
            },
            NodeType::Concatenation => NodeKind::Concatenation { operands },
            NodeType::Substring => NodeKind::Substring {
                input: operands[0],
                start: integer_arg(index, record, "start")?,
                end: integer_arg(index, record, "end")?,
            },
            NodeType::Replacement => NodeKind::Replacement {
                input: operands[0],
                old: operands[1],
                new: operands[2],
            },
            NodeType::PatternMatching => {
                let mode = match record.arg("mode") {
                    None => PatternMode::default(),
                    Some(_) => {
                        let tag = string_arg(index, record, "mode")?;
                        PatternMode::from_tag(tag).ok_or_else(|| {
                            EvalError::malformed(
                                index,
                                format!("mode must be one of regex, literal, test; got '{tag}'"),
                            )
                        })?
                    }
                };
                NodeKind::PatternMatching {
                    input: operands[0],
                    pattern: operands[1],
                    mode,
                }
            }
            NodeType::CaseConversion => {
                let tag = string_arg(index, record, "type")?;
                let case = CaseKind::from_tag(tag).ok_or_else(|| {
                    EvalError::malformed(
                        index,
                        format!("type must be 'upper' or 'lower'; got '{tag}'"),
                    )
                })?;
                NodeKind::CaseConversion {
                    input: operands[0],
                    case,
                }
            }
            NodeType::LengthCalculation => NodeKind::LengthCalculation {
                input: operands[0],
            },
        };

        Ok(Self { index, kind })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind<'a> {
        &self.kind
    }

    #[inline]
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    #[inline]
    pub fn operands(&self) -> Operands {
        self.kind.operands()
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} {}", self.index, self.node_type())
    }
}

fn decode_operands(
    index: usize,
    record: &FlatNode,
    node_type: NodeType,
    len: usize,
) -> Result<Operands, EvalError> {
    let raw: &[Value] = match (&record.operands, node_type.arity()) {
        (Some(Value::Array(raw)), _) => raw,
        (Some(other), _) => {
            return Err(EvalError::malformed(
                index,
                format!("'nodes' must be an array, found {other}"),
            ))
        }
        // a missing list is an empty one for the two types that allow zero
        (None, None) | (None, Some(0)) => &[],
        (None, Some(n)) => {
            return Err(EvalError::malformed(
                index,
                format!("{node_type} requires {n} operand(s) under 'nodes'"),
            ))
        }
    };

    if let Some(n) = node_type.arity() {
        if raw.len() != n {
            return Err(EvalError::malformed(
                index,
                format!("{node_type} takes {n} operand(s), found {}", raw.len()),
            ));
        }
    }

    raw.iter()
        .map(|entry| {
            let operand = integer(entry).ok_or_else(|| {
                EvalError::malformed(index, format!("operand must be an integer, found {entry}"))
            })?;
            match usize::try_from(operand) {
                Ok(position) if position < len => Ok(position),
                _ => Err(EvalError::OutOfRangeReference {
                    index,
                    operand,
                    len,
                }),
            }
        })
        .collect()
}

/// An integral JSON number, saturated into `i64`.
///
/// Integers too large for `u64` arrive as floats, so an integral float
/// outside the `i64` range saturates too.
fn integer(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.as_u64().is_some() {
        return Some(i64::MAX);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() >= i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

fn string_arg<'a>(
    index: usize,
    record: &'a FlatNode,
    key: &str,
) -> Result<&'a str, EvalError> {
    match record.arg(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EvalError::malformed(
            index,
            format!("'{key}' must be a string, found {other}"),
        )),
        None => Err(EvalError::malformed(index, format!("missing '{key}'"))),
    }
}

fn integer_arg(
    index: usize,
    record: &FlatNode,
    key: &str,
) -> Result<i64, EvalError> {
    match record.arg(key) {
        Some(value) => integer(value).ok_or_else(|| {
            EvalError::malformed(index, format!("'{key}' must be an integer, found {value}"))
        }),
        None => Err(EvalError::malformed(index, format!("missing '{key}'"))),
    }
}
