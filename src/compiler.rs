//! Predicate compiler.
//!
//! Converts decoded `FilterCondition`s into parameterized SQL fragments.
//! Identifiers are stripped to `[A-Za-z0-9_]`, operators are checked against
//! a fixed whitelist, and values only ever travel as bound parameters.
//!
//! ```text
//! price::gt::150        →  price = ?                        ['150']
//! code::in::D42||L12    →  code IN (?)                      ['D42', 'L12']
//! meta.age::>=::30      →  CAST(meta->>'age' AS numeric) >= ? ['30']
//! ```

use chrono::{DateTime, NaiveDate};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, hex_digit0, hex_digit1, one_of},
    combinator::{opt, recognize},
    sequence::{pair, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

use crate::ast::*;

/// Why a condition produced no predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    EmptyField,
    EmptyOperator,
    EmptyValue,
    /// Sanitization removed every character of the named identifier.
    EmptyIdentifier(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyField => write!(f, "empty field"),
            SkipReason::EmptyOperator => write!(f, "empty operator"),
            SkipReason::EmptyValue => write!(f, "empty value"),
            SkipReason::EmptyIdentifier(raw) => {
                write!(f, "identifier '{}' is empty after sanitization", raw)
            }
        }
    }
}

/// What happened to one input condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
    /// Compiled, but the operator was not whitelisted and was replaced.
    Coerced {
        original: String,
        replacement: Operator,
    },
}

impl Outcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }
}

/// Predicates plus one `Outcome` per input condition, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub predicates: Vec<CompiledPredicate>,
    pub outcomes: Vec<Outcome>,
}

impl Report {
    /// True when conditions were supplied but none of them survived.
    pub fn all_skipped(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(Outcome::is_skipped)
    }
}

/// Compile conditions into predicates. Never fails.
pub fn compile(conditions: &[FilterCondition]) -> Vec<CompiledPredicate> {
    compile_report(conditions).predicates
}

/// Compile conditions and keep track of every skip and coercion.
pub fn compile_report(conditions: &[FilterCondition]) -> Report {
    let mut report = Report::default();

    for cond in conditions {
        match compile_condition(cond) {
            Ok((predicate, outcome)) => {
                tracing::trace!("compiled '{}' with {} param(s)", predicate.fragment, predicate.params.len());
                report.predicates.push(predicate);
                report.outcomes.push(outcome);
            }
            Err(reason) => {
                tracing::debug!("skipping filter on '{}': {}", cond.field, reason);
                report.outcomes.push(Outcome::Skipped(reason));
            }
        }
    }

    report
}

fn compile_condition(cond: &FilterCondition) -> Result<(CompiledPredicate, Outcome), SkipReason> {
    if cond.field.is_empty() {
        return Err(SkipReason::EmptyField);
    }
    if cond.operator.is_empty() {
        return Err(SkipReason::EmptyOperator);
    }
    if cond.value.is_empty() {
        return Err(SkipReason::EmptyValue);
    }

    let op = sanitize_operator(&cond.operator);
    let outcome = if Operator::parse(&cond.operator).is_some() {
        Outcome::Applied
    } else {
        tracing::debug!("operator '{}' is not allowed, using '{}'", cond.operator, op);
        Outcome::Coerced {
            original: cond.operator.clone(),
            replacement: op,
        }
    };

    let target = Target::from_field(&cond.field)?;

    let predicate = match (&cond.value, op) {
        (FilterValue::Single(raw), Operator::In) => CompiledPredicate {
            fragment: format!("{} IN (?)", target.to_sql(None)),
            params: vec![Param::List(raw.split(VALUE_SEP).map(String::from).collect())],
            cast: None,
        },
        (FilterValue::List(items), Operator::In) => CompiledPredicate {
            fragment: format!("{} IN (?)", target.to_sql(None)),
            params: vec![Param::List(items.clone())],
            cast: None,
        },
        (FilterValue::Single(raw), op) => {
            let cast = infer_cast(raw);
            CompiledPredicate {
                fragment: format!("{} {} ?", target.to_sql(cast), op),
                params: vec![Param::Text(raw.clone())],
                cast,
            }
        }
        // BETWEEN lands here with its whole list bound to one placeholder.
        (FilterValue::List(items), op) => CompiledPredicate {
            fragment: format!("{} {} ?", target.to_sql(None), op),
            params: vec![Param::List(items.clone())],
            cast: None,
        },
    };

    Ok((predicate, outcome))
}

/// The left-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Column(String),
    /// `container->>'attribute'`, always text unless cast.
    JsonText { container: String, attribute: String },
}

impl Target {
    fn from_field(field: &str) -> Result<Self, SkipReason> {
        match field.split_once('.') {
            Some((container, attribute)) => {
                let container = non_empty_identifier(container)?;
                let attribute = non_empty_identifier(attribute)?;
                Ok(Target::JsonText {
                    container,
                    attribute,
                })
            }
            None => Ok(Target::Column(non_empty_identifier(field)?)),
        }
    }

    /// Plain columns are never cast; JSON text is cast when a type was inferred.
    fn to_sql(&self, cast: Option<CastType>) -> String {
        match self {
            Target::Column(name) => name.clone(),
            Target::JsonText {
                container,
                attribute,
            } => {
                let expr = format!("{}->>'{}'", container, attribute);
                match cast {
                    Some(cast) => format!("CAST({} AS {})", expr, cast),
                    None => expr,
                }
            }
        }
    }
}

fn non_empty_identifier(raw: &str) -> Result<String, SkipReason> {
    let ident = sanitize_field(raw);
    if ident.is_empty() {
        Err(SkipReason::EmptyIdentifier(raw.to_string()))
    } else {
        Ok(ident)
    }
}

/// Remove every character that is not an ASCII letter, digit or underscore.
pub fn sanitize_field(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Map an operator onto the whitelist; anything unknown becomes `=`.
pub fn sanitize_operator(raw: &str) -> Operator {
    Operator::parse(raw).unwrap_or(Operator::Eq)
}

/// Ordered inference chain. The first match wins, so `"1"` is numeric.
const INFERENCE_CHAIN: [(CastType, fn(&str) -> bool); 4] = [
    (CastType::Numeric, is_numeric),
    (CastType::Boolean, is_boolean),
    (CastType::Date, is_date),
    (CastType::Timestamp, is_timestamp),
];

/// Guess the SQL type of a raw value. `None` means plain text.
pub fn infer_cast(value: &str) -> Option<CastType> {
    INFERENCE_CHAIN
        .iter()
        .find(|(_, matches)| matches(value))
        .map(|(cast, _)| *cast)
}

/// Mirrors a 64-bit float parse: out-of-range values are rejected, spelled
/// out `inf`/`nan` are accepted, and hex floats need a `p` exponent.
fn is_numeric(value: &str) -> bool {
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => true,
        Ok(_) => is_special_float(value),
        Err(_) => matches!(hex_float(value), Ok(("", _))),
    }
}

fn is_special_float(value: &str) -> bool {
    let unsigned = value.trim_start_matches(['+', '-']);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|name| unsigned.eq_ignore_ascii_case(name))
}

/// `0x1.8p3`, `-0X10P-2`, `0x.8p1`
fn hex_float(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        tag_no_case("0x"),
        alt((
            recognize(pair(hex_digit1, opt(pair(char('.'), hex_digit0)))),
            recognize(pair(char('.'), hex_digit1)),
        )),
        one_of("pP"),
        opt(one_of("+-")),
        digit1,
    )))(input)
}

fn is_boolean(value: &str) -> bool {
    matches!(
        value,
        "1" | "t" | "T" | "TRUE" | "true" | "True" | "0" | "f" | "F" | "FALSE" | "false" | "False"
    )
}

/// Strict `YYYY-MM-DD`.
fn is_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_timestamp(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
}
