//! Pagination clamp and ORDER BY guard.

use std::collections::HashSet;

use crate::ast::{PageClause, PaginationRequest, DEFAULT_LIMIT, DEFAULT_PAGE};

/// Validates the raw `sort` text before it reaches ORDER BY.
///
/// Returning `None` drops the ORDER BY entirely.
pub trait SortGuard {
    fn check(&self, sort: &str) -> Option<String>;
}

impl<F> SortGuard for F
where
    F: Fn(&str) -> Option<String>,
{
    fn check(&self, sort: &str) -> Option<String> {
        self(sort)
    }
}

/// Hands `sort` through untouched. This is the default and is NOT safe for
/// untrusted input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl SortGuard for Passthrough {
    fn check(&self, sort: &str) -> Option<String> {
        if sort.is_empty() {
            None
        } else {
            Some(sort.to_string())
        }
    }
}

/// Accepts `col [asc|desc], ...` over a fixed set of column names.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    fields: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    fn term(&self, raw: &str) -> Option<String> {
        let mut words = raw.split_whitespace();
        let column = words.next()?;
        if !self.fields.contains(column) {
            return None;
        }
        let dir = match words.next() {
            None => None,
            Some(d) if d.eq_ignore_ascii_case("asc") => Some("ASC"),
            Some(d) if d.eq_ignore_ascii_case("desc") => Some("DESC"),
            Some(_) => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(match dir {
            Some(dir) => format!("{} {}", column, dir),
            None => column.to_string(),
        })
    }
}

impl SortGuard for AllowList {
    fn check(&self, sort: &str) -> Option<String> {
        if sort.trim().is_empty() {
            return None;
        }
        let terms: Option<Vec<String>> = sort.split(',').map(|t| self.term(t)).collect();
        match terms {
            Some(terms) => Some(terms.join(", ")),
            None => {
                tracing::debug!("rejected sort '{}'", sort);
                None
            }
        }
    }
}

/// Turn a pagination request into OFFSET / LIMIT / ORDER BY, passing `sort`
/// through unvalidated.
///
/// ```
/// use qsift::ast::PaginationRequest;
/// use qsift::pagination::clamp;
///
/// let page = clamp(&PaginationRequest { limit: 5, page: 2, sort: String::new() });
/// assert_eq!((page.offset, page.limit), (5, 5));
/// ```
pub fn clamp(request: &PaginationRequest) -> PageClause {
    clamp_with(request, &Passthrough)
}

/// Like [`clamp`], with the ORDER BY text filtered through `guard`.
pub fn clamp_with(request: &PaginationRequest, guard: &dyn SortGuard) -> PageClause {
    let page = if request.page <= 0 { DEFAULT_PAGE } else { request.page };
    let limit = if request.limit <= 0 { DEFAULT_LIMIT } else { request.limit };

    PageClause {
        offset: (page - 1).saturating_mul(limit),
        limit,
        order: guard.check(&request.sort),
    }
}
