//! Filter DSL decoder using nom.
//!
//! Turns a raw query string into a `PaginationRequest` and an ordered list of
//! `FilterCondition`s. Nothing in here fails: malformed pieces are skipped.
//!
//! # Syntax Overview
//!
//! ```text
//! page=2&limit=5&sort=code desc&filter=code::in::D42||L12~~price::gt::150
//!                                      ─┬── ─┬ ───┬──── ┬ ─────┬───────
//!                                       │    │    │     │      │
//!                                       │    │    │     │      └── next condition
//!                                       │    │    │     └── Chain (condition separator)
//!                                       │    │    └── Values (split for in/between)
//!                                       │    └── Operator
//!                                       └── Field
//! ```
//!
//! | Separator | Splits                                   |
//! |-----------|------------------------------------------|
//! | `~~`      | conditions inside `filter`               |
//! | `::`      | `field`, `operator`, `value`             |
//! | `\|\|`    | items of an `in` / `between` value       |
//!
//! Only the first two `::` of a condition are structural; the value keeps
//! any further `::`.
//!
//! The older `filter[<field>]=<op>,<value>` keys are also read. The operator
//! ends at the first `,`, and `in` values are split on `,`.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    combinator::rest,
    multi::separated_list0,
    sequence::{terminated, tuple},
    IResult,
};
use url::form_urlencoded;

use crate::ast::*;

/// Separates conditions inside the `filter` parameter.
pub const CONDITION_SEP: &str = "~~";
/// Separates the three segments of a condition.
pub const SEGMENT_SEP: &str = "::";
/// Separates operator and value in a `filter[<field>]` parameter.
pub const BRACKET_SEP: char = ',';

/// Decode a full query string into pagination and filter conditions.
///
/// # Example
///
/// ```
/// use qsift::parser::decode;
///
/// let (page, filters) = decode("page=2&limit=5&filter=price::gt::150");
/// assert_eq!(page.page, 2);
/// assert_eq!(filters[0].field, "price");
/// ```
pub fn decode(raw_query: &str) -> (PaginationRequest, Vec<FilterCondition>) {
    let raw_query = raw_query.strip_prefix('?').unwrap_or(raw_query);

    let mut limit = None;
    let mut page = None;
    let mut sort = None;
    let mut filter = None;
    let mut bracketed: Vec<(String, String)> = Vec::new();

    // First occurrence of a key wins, like url.Values.Get.
    for (key, value) in form_urlencoded::parse(raw_query.as_bytes()) {
        let slot = match &*key {
            "limit" => &mut limit,
            "page" => &mut page,
            "sort" => &mut sort,
            "filter" => &mut filter,
            other => {
                if let Some(field) = bracket_field(other) {
                    if !bracketed.iter().any(|(seen, _)| seen == field) {
                        bracketed.push((field.to_string(), value.into_owned()));
                    }
                }
                continue;
            }
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let pagination = PaginationRequest {
        limit: parse_int(limit.as_deref()),
        page: parse_int(page.as_deref()),
        sort: sort.unwrap_or_default(),
    }
    .normalized();

    let mut conditions = decode_filter(filter.as_deref().unwrap_or_default());
    conditions.extend(
        bracketed
            .iter()
            .filter_map(|(field, raw)| parse_bracketed(field, raw)),
    );

    tracing::trace!(
        "decoded {} condition(s), page={} limit={}",
        conditions.len(),
        pagination.page,
        pagination.limit
    );

    (pagination, conditions)
}

/// Decode the value of the `filter` parameter.
pub fn decode_filter(filter: &str) -> Vec<FilterCondition> {
    if filter.is_empty() {
        return Vec::new();
    }

    split_on(filter, CONDITION_SEP)
        .into_iter()
        .filter_map(parse_condition)
        .collect()
}

/// Split `field::operator::value`. The value is everything after the second `::`.
fn condition_segments(input: &str) -> IResult<&str, (&str, &str, &str)> {
    tuple((
        terminated(take_until(SEGMENT_SEP), tag(SEGMENT_SEP)),
        terminated(take_until(SEGMENT_SEP), tag(SEGMENT_SEP)),
        rest,
    ))(input)
}

/// Parse one `field::operator::value` condition.
fn parse_condition(raw: &str) -> Option<FilterCondition> {
    let Ok((_, (field, operator, value))) = condition_segments(raw) else {
        tracing::debug!("skipping condition '{}': fewer than 3 segments", raw);
        return None;
    };

    let value = if is_multi_valued(operator) {
        FilterValue::List(split_on(value, VALUE_SEP).into_iter().map(String::from).collect())
    } else {
        FilterValue::Single(value.to_string())
    };

    Some(FilterCondition {
        field: field.to_string(),
        operator: operator.to_string(),
        value,
    })
}

/// `filter[price]` → `price`.
fn bracket_field(key: &str) -> Option<&str> {
    key.strip_prefix("filter[")?.strip_suffix(']')
}

/// Parse the `<op>,<value>` payload of a `filter[<field>]` parameter.
fn parse_bracketed(field: &str, raw: &str) -> Option<FilterCondition> {
    let Some((operator, value)) = raw.split_once(BRACKET_SEP) else {
        tracing::debug!("skipping filter[{}]: no ',' in '{}'", field, raw);
        return None;
    };

    let value = if operator.eq_ignore_ascii_case("in") {
        FilterValue::List(value.split(BRACKET_SEP).map(String::from).collect())
    } else {
        FilterValue::Single(value.to_string())
    };

    Some(FilterCondition {
        field: field.to_string(),
        operator: operator.to_string(),
        value,
    })
}

/// `in` and `between` carry a `||`-separated operand.
fn is_multi_valued(operator: &str) -> bool {
    operator.eq_ignore_ascii_case("in") || operator.eq_ignore_ascii_case("between")
}

/// Everything up to the next separator, or the remainder of the input.
fn segment<'a>(sep: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    alt((take_until(sep), rest))
}

/// Split on a literal separator. Empty pieces are kept.
fn split_on<'a>(input: &'a str, sep: &'static str) -> Vec<&'a str> {
    match separated_list0(tag(sep), segment(sep))(input) {
        Ok((_, parts)) => parts,
        Err(_) => vec![input],
    }
}

/// Missing or non-numeric integers read as 0.
fn parse_int(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_on_keeps_empty_pieces() {
        assert_eq!(split_on("a::b::c", "::"), vec!["a", "b", "c"]);
        assert_eq!(split_on("a::::c", "::"), vec!["a", "", "c"]);
        assert_eq!(split_on("a::", "::"), vec!["a", ""]);
        assert_eq!(split_on("abc", "::"), vec!["abc"]);
        assert_eq!(split_on("", "::"), vec![""]);
    }

    #[test]
    fn test_split_on_colon_runs() {
        // Leftmost match, same as a plain string split.
        assert_eq!(split_on("a:::b::c", "::"), vec!["a", ":b", "c"]);
    }

    #[test]
    fn test_single_condition() {
        let filters = decode_filter("name::like::foo");
        assert_eq!(filters, vec![FilterCondition::new("name", "like", "foo")]);
    }

    #[test]
    fn test_in_operator_splits_values() {
        let filters = decode_filter("code::IN::A||B||C");
        assert_eq!(filters[0].value, FilterValue::from(vec!["A", "B", "C"]));
    }

    #[test]
    fn test_in_without_separator_is_one_element_list() {
        let filters = decode_filter("code::in::D42");
        assert_eq!(filters[0].value, FilterValue::from(vec!["D42"]));
    }

    #[test]
    fn test_single_pipe_is_literal() {
        let filters = decode_filter("name::eq::a|b");
        assert_eq!(filters[0].value, FilterValue::from("a|b"));
    }

    #[test]
    fn test_non_multi_operator_keeps_double_pipe() {
        let filters = decode_filter("name::eq::a||b");
        assert_eq!(filters[0].value, FilterValue::from("a||b"));
    }

    #[test]
    fn test_wrong_segment_count_is_skipped() {
        assert!(decode_filter("field:onlytwoparts").is_empty());
        assert!(decode_filter("field::eq").is_empty());
        assert_eq!(decode_filter("field::eq::").len(), 1);
    }

    #[test]
    fn test_value_keeps_extra_separators() {
        assert_eq!(
            decode_filter("a::b::c::d"),
            vec![FilterCondition::new("a", "b", "c::d")]
        );
        assert_eq!(
            decode_filter("note::eq::a::b~~opens_at::=::10::30"),
            vec![
                FilterCondition::new("note", "eq", "a::b"),
                FilterCondition::new("opens_at", "=", "10::30"),
            ]
        );
        assert_eq!(
            decode_filter("ids::in::1::2||3")[0].value,
            FilterValue::from(vec!["1::2", "3"])
        );
    }

    #[test]
    fn test_bracketed_filters() {
        let (_, filters) =
            decode("filter[status]=eq,active&filter[code]=IN,A,B&filter[status]=eq,other&filter[bad]=eq");
        assert_eq!(
            filters,
            vec![
                FilterCondition::new("status", "eq", "active"),
                FilterCondition::new("code", "IN", vec!["A", "B"]),
            ]
        );
    }

    #[test]
    fn test_bracketed_value_keeps_commas() {
        let (_, filters) = decode("filter%5Bname%5D=like,Smith, John");
        assert_eq!(filters, vec![FilterCondition::new("name", "like", "Smith, John")]);

        // Only `in` splits; between keeps the raw text.
        let (_, filters) = decode("filter[price]=between,1,5");
        assert_eq!(filters[0].value, FilterValue::from("1,5"));
    }

    #[test]
    fn test_dsl_conditions_come_before_bracketed() {
        let (_, filters) = decode("filter[b]=eq,2&filter=a::eq::1");
        let fields: Vec<&str> = filters.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_skipped_condition_keeps_neighbours() {
        let filters = decode_filter("a::eq::1~~broken~~b::eq::2");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].field, "a");
        assert_eq!(filters[1].field, "b");
    }

    #[test]
    fn test_empty_filter() {
        assert!(decode_filter("").is_empty());
        let (_, filters) = decode("page=1&filter=");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_pagination_defaults() {
        let (page, filters) = decode("");
        assert_eq!(page, PaginationRequest::default());
        assert!(filters.is_empty());

        let (page, _) = decode("limit=abc&page=xyz");
        assert_eq!((page.limit, page.page), (10, 1));
    }

    #[test]
    fn test_percent_decoding() {
        let (page, filters) = decode("?sort=name%20asc&filter=name%3A%3Aeq%3A%3AJohn+Doe");
        assert_eq!(page.sort, "name asc");
        assert_eq!(filters[0].value, FilterValue::from("John Doe"));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let (page, _) = decode("page=3&page=7");
        assert_eq!(page.page, 3);
    }
}
