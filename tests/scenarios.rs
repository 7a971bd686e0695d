use pretty_assertions::assert_eq;
use qsift::prelude::*;

#[test]
fn test_in_operator_with_pagination() {
    let (page, filters) =
        decode("page=2&limit=5&sort=code desc&filter=code::in::D42||L12~~price::gt::150");

    assert_eq!(
        page,
        PaginationRequest {
            limit: 5,
            page: 2,
            sort: "code desc".to_string(),
        }
    );
    assert_eq!(
        filters,
        vec![
            FilterCondition::new("code", "in", vec!["D42", "L12"]),
            FilterCondition::new("price", "gt", "150"),
        ]
    );

    // gt survives decoding and only downgrades at compile time.
    let predicates = compile(&filters);
    assert_eq!(predicates[0].fragment, "code IN (?)");
    assert_eq!(predicates[1].fragment, "price = ?");
    assert_eq!(predicates[1].params, vec![Param::Text("150".to_string())]);

    let clause = clamp(&page);
    assert_eq!((clause.offset, clause.limit), (5, 5));
    assert_eq!(clause.order.as_deref(), Some("code desc"));
}

#[test]
fn test_other_operators() {
    let (page, filters) = decode(
        "page=1&limit=10&sort=qty asc&filter=name::like::foo~~qty::gte::10~~price::between::100||200",
    );

    assert_eq!((page.page, page.limit, page.sort.as_str()), (1, 10, "qty asc"));
    assert_eq!(
        filters,
        vec![
            FilterCondition::new("name", "like", "foo"),
            FilterCondition::new("qty", "gte", "10"),
            FilterCondition::new("price", "between", vec!["100", "200"]),
        ]
    );
}

#[test]
fn test_between_operator() {
    let (_, filters) = decode("filter=price::between::100||200~~id::between::1||10");

    assert_eq!(
        filters,
        vec![
            FilterCondition::new("price", "between", vec!["100", "200"]),
            FilterCondition::new("id", "between", vec!["1", "10"]),
        ]
    );
}

#[test]
fn test_complex_values() {
    let (_, filters) = decode(
        "filter=product_name::eq::Product, Awesome: New|Version~~description::contains::This item has no issues.",
    );

    assert_eq!(
        filters,
        vec![
            FilterCondition::new("product_name", "eq", "Product, Awesome: New|Version"),
            FilterCondition::new("description", "contains", "This item has no issues."),
        ]
    );
}

#[test]
fn test_mixed_operators() {
    let (_, filters) = decode("filter=code::in::A||B||C~~price::between::10||20~~name::like::foo");

    assert_eq!(filters.len(), 3);
    assert_eq!(filters[0].value, FilterValue::from(vec!["A", "B", "C"]));
    assert_eq!(filters[1].value, FilterValue::from(vec!["10", "20"]));
    assert_eq!(filters[2].value, FilterValue::from("foo"));
}

#[test]
fn test_malformed_condition_is_dropped() {
    let (_, filters) = decode("filter=field:onlytwoparts");
    assert!(filters.is_empty());

    let (_, filters) = decode("filter=field:onlytwoparts~~ok::eq::1");
    assert_eq!(filters, vec![FilterCondition::new("ok", "eq", "1")]);
}

#[test]
fn test_grammar_round_trip() {
    let cases = [
        ("name", "like", "foo%"),
        ("meta.age", ">=", "30"),
        ("created_at", "<", "2024-01-01T00:00:00Z"),
        ("note", "eq", "a, b: c|d"),
    ];
    for (field, op, value) in cases {
        let filters = decode_filter(&format!("{}::{}::{}", field, op, value));
        assert_eq!(filters, vec![FilterCondition::new(field, op, value)]);
    }
}

#[test]
fn test_multi_value_typing() {
    for op in ["in", "IN", "between", "Between"] {
        let filters = decode_filter(&format!("f::{}::x", op));
        assert!(matches!(filters[0].value, FilterValue::List(_)), "{}", op);
    }
    for op in ["eq", "=", "like", "inn", "betweenx"] {
        let filters = decode_filter(&format!("f::{}::x||y", op));
        assert!(matches!(filters[0].value, FilterValue::Single(_)), "{}", op);
    }
}

#[test]
fn test_injection_attempts_are_neutralized() {
    let (predicates, page) = qsift::sift(
        "filter=id;DELETE FROM users::OR 1=1 --::1~~meta.x'||'y::=::2024-05-01",
    );

    assert_eq!(predicates[0].fragment, "idDELETEFROMusers = ?");
    assert_eq!(predicates[1].fragment, "CAST(meta->>'xy' AS date) = ?");
    assert_eq!(page.order, None);
}

#[test]
fn test_report_distinguishes_all_malformed() {
    let (_, none) = decode("page=1");
    assert!(!compile_report(&none).all_skipped());

    let conditions = vec![FilterCondition::new("!!", "=", "1")];
    let report = compile_report(&conditions);
    assert!(report.predicates.is_empty());
    assert!(report.all_skipped());
}

#[test]
fn test_statement_for_decoded_query() {
    let (request, conditions) =
        decode("page=3&limit=20&sort=price desc&filter=code::in::A||B~~attrs.weight::<=::2.5");
    let predicates = compile(&conditions);
    let page = clamp_with(&request, &AllowList::new(["price"]));

    let stmt = Statement::select("products", &predicates, &page, Placeholder::Numbered).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM products WHERE code IN ($1, $2) AND CAST(attrs->>'weight' AS numeric) <= $3 ORDER BY price DESC LIMIT 20 OFFSET 40"
    );
    assert_eq!(
        stmt.binds,
        vec![SqlValue::from("A"), SqlValue::from("B"), SqlValue::Float(2.5)]
    );
}
