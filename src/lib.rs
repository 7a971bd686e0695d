//! # qsift — query-string filters to safe SQL predicates
//!
//! qsift decodes a compact filter/pagination encoding carried in an HTTP
//! query string and compiles it into parameterized SQL fragments.
//!
//! ## Quick Example
//!
//! ```
//! let (predicates, page) = qsift::sift("page=2&limit=5&filter=code::in::D42||L12~~price::gt::150");
//!
//! assert_eq!(predicates[0].fragment, "code IN (?)");
//! assert_eq!(predicates[1].fragment, "price = ?");
//! assert_eq!((page.offset, page.limit), (5, 5));
//! ```
//!
//! ## Encoding
//!
//! | Piece             | Meaning                                  |
//! |-------------------|------------------------------------------|
//! | `limit`, `page`   | Pagination, default `10` / `1`           |
//! | `sort`            | Raw ORDER BY text                        |
//! | `filter`          | Conditions joined by `~~`                |
//! | `f::op::v`        | One condition                            |
//! | `a\|\|b`          | Values of an `in` / `between` condition  |
//! | `col.attr`        | JSON text extraction `col->>'attr'`      |
//!
//! Unknown operators degrade to `=`, identifiers are stripped to
//! `[A-Za-z0-9_]`, and malformed conditions are dropped. Nothing in the
//! decode/compile path returns an error.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod pagination;
pub mod parser;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::compiler::{compile, compile_report, Outcome, Report, SkipReason};
    pub use crate::config::Settings;
    pub use crate::engine::{Placeholder, SiftDB, SqlValue, Statement};
    pub use crate::error::*;
    pub use crate::pagination::{clamp, clamp_with, AllowList, Passthrough, SortGuard};
    pub use crate::parser::{decode, decode_filter};
}

/// Decode a query string into pagination and filter conditions.
pub fn decode(raw_query: &str) -> (ast::PaginationRequest, Vec<ast::FilterCondition>) {
    parser::decode(raw_query)
}

/// Compile decoded conditions into parameterized predicates.
pub fn compile(conditions: &[ast::FilterCondition]) -> Vec<ast::CompiledPredicate> {
    compiler::compile(conditions)
}

/// Decode and compile in one go, with unvalidated `sort`.
pub fn sift(raw_query: &str) -> (Vec<ast::CompiledPredicate>, ast::PageClause) {
    let (request, conditions) = parser::decode(raw_query);
    (compiler::compile(&conditions), pagination::clamp(&request))
}
