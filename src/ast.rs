//! Data types shared by the decoder and the compiler.

use serde::{Deserialize, Serialize};

/// Default page size when `limit` is absent, zero or unparsable.
pub const DEFAULT_LIMIT: i64 = 10;

/// Default page when `page` is absent, zero or unparsable.
pub const DEFAULT_PAGE: i64 = 1;

/// Separates the items of an `in` / `between` operand.
pub const VALUE_SEP: &str = "||";

/// Pagination parameters as they arrived on the query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    pub limit: i64,
    pub page: i64,
    /// Raw ORDER BY text. Not validated unless a `SortGuard` is applied.
    pub sort: String,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
            sort: String::new(),
        }
    }
}

impl PaginationRequest {
    /// Replace non-positive `limit`/`page` with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.limit <= 0 {
            self.limit = DEFAULT_LIMIT;
        }
        if self.page <= 0 {
            self.page = DEFAULT_PAGE;
        }
        self
    }
}

/// The value segment of a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    /// Produced for `in` and `between`, split on `||`.
    List(Vec<String>),
}

impl FilterValue {
    /// A list counts as empty when every item is, e.g. `code::in::`.
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Single(s) => s.is_empty(),
            FilterValue::List(items) => items.iter().all(String::is_empty),
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Single(s) => write!(f, "'{}'", s),
            FilterValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "'{}'", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Single(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Single(v)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::List(v)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        FilterValue::List(v.into_iter().map(String::from).collect())
    }
}

/// One decoded `field::operator::value` triple, untouched by sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: String,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Whitelisted comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    Between,
}

impl Operator {
    pub const ALL: [Operator; 9] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::In,
        Operator::Between,
    ];

    /// Case-insensitive membership check against the whitelist.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.to_uppercase();
        Self::ALL.into_iter().find(|op| op.as_sql() == upper)
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::Between => "BETWEEN",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Target type for a value that was recognized by inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    Numeric,
    Boolean,
    Date,
    Timestamp,
}

impl std::fmt::Display for CastType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CastType::Numeric => write!(f, "numeric"),
            CastType::Boolean => write!(f, "boolean"),
            CastType::Date => write!(f, "date"),
            CastType::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A bound parameter. Lists are expanded by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Text(String),
    List(Vec<String>),
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Text(s) => write!(f, "'{}'", s),
            Param::List(items) => write!(f, "{}", FilterValue::List(items.clone())),
        }
    }
}

/// A parameterized fragment: exactly one `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledPredicate {
    pub fragment: String,
    pub params: Vec<Param>,
    /// Type inferred for a single value, used by executors to type the bind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<CastType>,
}

/// OFFSET / LIMIT / ORDER BY triple produced by the pagination clamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageClause {
    pub offset: i64,
    pub limit: i64,
    pub order: Option<String>,
}
