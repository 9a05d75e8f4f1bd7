use chrono::{DateTime, TimeZone, Utc};
use tabula_core::{ColumnRegistry, ColumnSpec, FacetOption, SortDirection, Value};
use tabula_filter::{FilterOperand, FilterOperator};
use tabula_table::{Table, TableConfig};

#[derive(Debug, Clone)]
struct Person {
    id: i64,
    name: String,
    role: String,
    score: Option<f64>,
    joined: DateTime<Utc>,
}

fn person(id: i64, name: &str, role: &str, score: Option<f64>) -> Person {
    Person {
        id,
        name: name.to_string(),
        role: role.to_string(),
        score,
        joined: Utc.with_ymd_and_hms(2024, 1, id as u32 % 28 + 1, 12, 0, 0).unwrap(),
    }
}

fn columns() -> ColumnRegistry<Person> {
    ColumnRegistry::new(vec![
        ColumnSpec::display("number", "No").hideable(false),
        ColumnSpec::accessor("id", "Id", |p: &Person| Value::from(p.id)).number_filter(),
        ColumnSpec::accessor("name", "Name", |p: &Person| Value::from(p.name.as_str())).text_filter(),
        ColumnSpec::accessor("role", "Role", |p: &Person| Value::from(p.role.as_str())).option_filter(|v| {
            let mut o = FacetOption::plain(v);
            if o.value == "admin" { o.icon = Some("shield".into()); }
            o
        }),
        ColumnSpec::accessor("score", "Score", |p: &Person| Value::from(p.score)),
        ColumnSpec::accessor("joined", "Joined", |p: &Person| Value::from(p.joined)).date_filter(),
    ])
    .unwrap()
}

fn table(rows: Vec<Person>) -> Table<Person> { Table::new(rows, columns()) }

fn ids(t: &Table<Person>) -> Vec<i64> { t.visible_rows().iter().map(|p| p.id).collect() }

fn many(n: i64) -> Vec<Person> { (1..=n).map(|i| person(i, &format!("user{i}"), "user", Some(i as f64))).collect() }

#[test]
fn column_filters_combine_with_and() {
    let mut t = table(vec![
        person(1, "Rose", "admin", None),
        person(2, "Rose", "user", None),
        person(3, "Lily", "admin", None),
    ]);
    t.set_column_filter("role", FilterOperator::IsAnyOf, Some(FilterOperand::Options(vec!["admin".into()])));
    assert_eq!(ids(&t), vec![1, 3]);
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Text("ros".into())));
    assert_eq!(ids(&t), vec![1]);
}

#[test]
fn global_filter_is_case_insensitive_substring() {
    let mut t = table(vec![person(1, "Rose", "user", None), person(2, "Lily", "user", None)]);
    t.set_global_filter("os");
    assert_eq!(ids(&t), vec![1]);
    t.set_global_filter("ROSE");
    assert_eq!(ids(&t), vec![1]);
    t.set_global_filter("rose ");
    assert!(t.visible_rows().is_empty());
    t.set_global_filter("");
    assert_eq!(ids(&t), vec![1, 2]);
}

#[test]
fn global_filter_skips_non_searchable_columns() {
    let mut t = table(vec![person(1, "Rose", "user", Some(42.0))]);
    t.set_global_filter("42");
    assert!(t.visible_rows().is_empty());
    t.set_global_filter("USER");
    assert_eq!(ids(&t), vec![1]);
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let mut t = table(vec![
        person(1, "a", "user", Some(5.0)),
        person(2, "b", "user", Some(5.0)),
        person(3, "c", "user", Some(3.0)),
    ]);
    t.toggle_sort("score");
    assert_eq!(t.sort_direction("score"), Some(SortDirection::Asc));
    assert_eq!(ids(&t), vec![3, 1, 2]);
    t.toggle_sort("score");
    assert_eq!(ids(&t), vec![1, 2, 3]);
}

#[test]
fn three_toggles_restore_input_order() {
    let rows = vec![person(2, "b", "user", Some(1.0)), person(1, "a", "user", Some(3.0)), person(3, "c", "user", Some(2.0))];
    let mut t = table(rows);
    let before = ids(&t);
    for _ in 0..3 { t.toggle_sort("name"); }
    assert_eq!(t.sort_direction("name"), None);
    assert!(t.state().sorting.is_empty());
    assert_eq!(ids(&t), before);
}

#[test]
fn nulls_sort_last_in_both_directions() {
    let mut t = table(vec![
        person(1, "a", "user", None),
        person(2, "b", "user", Some(2.0)),
        person(3, "c", "user", Some(1.0)),
    ]);
    t.toggle_sort("score");
    assert_eq!(ids(&t), vec![3, 2, 1]);
    t.toggle_sort("score");
    assert_eq!(ids(&t), vec![2, 3, 1]);
}

#[test]
fn single_sort_replaces_other_columns() {
    let mut t = table(many(3));
    t.toggle_sort("name");
    t.toggle_sort("score");
    assert_eq!(t.sort_direction("name"), None);
    assert_eq!(t.state().sorting.len(), 1);
}

#[test]
fn multi_sort_accumulates_when_enabled() {
    let rows = vec![
        person(1, "b", "user", Some(1.0)),
        person(2, "a", "admin", Some(1.0)),
        person(3, "c", "admin", Some(1.0)),
    ];
    let cfg = TableConfig { multi_sort: true, ..TableConfig::default() };
    let mut t = Table::with_config(rows.clone(), columns(), cfg);
    t.toggle_sort_multi("role");
    t.toggle_sort_multi("name");
    assert_eq!(t.state().sorting.len(), 2);
    assert_eq!(ids(&t), vec![2, 3, 1]);

    // disabled: behaves like a single-column toggle
    let mut single = table(rows);
    single.toggle_sort_multi("role");
    single.toggle_sort_multi("name");
    assert_eq!(single.state().sorting.len(), 1);
}

#[test]
fn sorting_display_column_is_ignored() {
    let mut t = table(many(2));
    t.toggle_sort("number");
    t.toggle_sort("missing");
    assert!(t.state().sorting.is_empty());
}

#[test]
fn go_to_page_clamps_to_last_page() {
    let mut t = table(many(25));
    assert_eq!(t.page_count(), 3);
    t.go_to_page(5);
    assert_eq!(t.state().pagination.page_index, 2);
    let page = t.visible_rows();
    assert_eq!(page.len(), 5);
    assert_eq!(page.info.label(), "Page 3 of 3");
    assert!(!page.info.can_next());
    assert!(page.info.can_previous());
}

#[test]
fn growing_page_size_clamps_index() {
    let mut t = table(many(50));
    t.go_to_page(4);
    assert_eq!(t.state().pagination.page_index, 4);
    t.set_page_size(50);
    assert_eq!(t.state().pagination.page_index, 0);
    assert_eq!(t.visible_rows().len(), 50);
}

#[test]
fn zero_page_size_is_ignored() {
    let mut t = table(many(5));
    t.set_page_size(0);
    assert_eq!(t.state().pagination.page_size, 10);
}

#[test]
fn page_navigation() {
    let mut t = table(many(25));
    t.next_page();
    t.next_page();
    t.next_page();
    assert_eq!(t.state().pagination.page_index, 2);
    t.previous_page();
    assert_eq!(t.state().pagination.page_index, 1);
    t.first_page();
    t.previous_page();
    assert_eq!(t.state().pagination.page_index, 0);
    t.last_page();
    assert_eq!(ids(&t), (21..=25).collect::<Vec<_>>());
}

#[test]
fn filtering_clamps_page_index() {
    let mut t = table(many(30));
    t.go_to_page(2);
    t.set_global_filter("user1");
    // user1, user10..user19
    assert_eq!(t.page_info().filtered_rows, 11);
    assert_eq!(t.state().pagination.page_index, 1);
}

#[test]
fn empty_table_reports_zero_pages() {
    let t = table(vec![]);
    let page = t.visible_rows();
    assert!(page.is_empty());
    assert_eq!(page.info.page_count, 0);
    assert_eq!(page.info.label(), "Page 1 of 0");
    assert!(!page.info.can_next() && !page.info.can_previous());
}

#[test]
fn empty_option_set_removes_filter() {
    let mut t = table(vec![person(1, "a", "admin", None), person(2, "b", "user", None)]);
    t.set_column_filter("role", FilterOperator::IsAnyOf, Some(FilterOperand::Options(vec!["admin".into()])));
    assert!(t.column_filter("role").is_some());
    t.set_column_filter("role", FilterOperator::IsAnyOf, Some(FilterOperand::Options(vec![])));
    assert!(t.column_filter("role").is_none());
    assert_eq!(ids(&t), vec![1, 2]);
}

#[test]
fn invalid_filter_calls_are_ignored() {
    let mut t = table(many(3));
    t.set_column_filter("missing", FilterOperator::Contains, Some(FilterOperand::Text("x".into())));
    t.set_column_filter("score", FilterOperator::Equals, Some(FilterOperand::Number(1.0)));
    t.set_column_filter("name", FilterOperator::Before, Some(FilterOperand::Text("x".into())));
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Number(1.0)));
    assert!(t.state().column_filters.is_empty());
}

#[test]
fn replacing_a_filter_keeps_its_position() {
    let mut t = table(many(3));
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Text("user".into())));
    t.set_column_filter("id", FilterOperator::Range, Some(FilterOperand::NumberRange(1.0, 2.0)));
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Text("2".into())));
    let order: Vec<&str> = t.state().column_filters.iter().map(|f| f.column_id.as_str()).collect();
    assert_eq!(order, vec!["name", "id"]);
    assert_eq!(ids(&t), vec![2]);
}

#[test]
fn none_operand_removes_only_that_filter() {
    let mut t = table(many(5));
    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Text("user".into())));
    t.set_column_filter("id", FilterOperator::Range, Some(FilterOperand::NumberRange(2.0, 4.0)));
    t.set_column_filter("joined", FilterOperator::Before, Some(FilterOperand::Date(day)));
    assert_eq!(ids(&t), vec![2, 3]);

    t.set_column_filter("id", FilterOperator::Range, None);
    assert!(t.column_filter("id").is_none());
    let order: Vec<&str> = t.state().column_filters.iter().map(|f| f.column_id.as_str()).collect();
    assert_eq!(order, vec!["name", "joined"]);
    assert_eq!(ids(&t), vec![1, 2, 3]);

    t.set_column_filter("id", FilterOperator::Range, Some(FilterOperand::NumberRange(2.0, 4.0)));
    let order: Vec<&str> = t.state().column_filters.iter().map(|f| f.column_id.as_str()).collect();
    assert_eq!(order, vec!["name", "joined", "id"]);
    assert_eq!(ids(&t), vec![2, 3]);

    t.set_column_filter("missing", FilterOperator::Contains, None);
    assert_eq!(t.state().column_filters.len(), 3);
}

#[test]
fn clear_column_filters_keeps_global_filter() {
    let mut t = table(many(12));
    t.set_column_filter("id", FilterOperator::Range, Some(FilterOperand::NumberRange(1.0, 11.0)));
    t.set_global_filter("user1");
    assert_eq!(ids(&t), vec![1, 10, 11]);

    t.clear_column_filters();
    assert!(t.state().column_filters.is_empty());
    assert_eq!(ids(&t), vec![1, 10, 11, 12]);
    t.set_global_filter("");
    assert_eq!(t.page_info().filtered_rows, 12);
}

#[test]
fn facets_keep_value_kinds_apart() {
    let cols = ColumnRegistry::new(vec![ColumnSpec::accessor("code", "Code", |p: &Person| match p.id {
        2 => Value::text("1"),
        _ => Value::from(1i64),
    })
    .option_filter(FacetOption::plain)])
    .unwrap();
    let t = Table::new(many(3), cols);
    let facets = t.faceted_values("code");
    let counts: Vec<(&str, usize)> = facets.iter().map(|f| (f.option.value.as_str(), f.count)).collect();
    assert_eq!(counts, vec![("1", 2), ("1", 1)]);
}

#[test]
fn date_filter_matches_calendar_day() {
    let mut t = table(many(5));
    let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    t.set_column_filter("joined", FilterOperator::On, Some(FilterOperand::Date(day)));
    assert_eq!(ids(&t), vec![2]);
    t.set_column_filter("joined", FilterOperator::Before, Some(FilterOperand::Date(day)));
    assert_eq!(ids(&t), vec![1]);
}

#[test]
fn visibility_respects_hideable() {
    let mut t = table(many(1));
    t.set_column_visibility("number", false);
    t.set_column_visibility("score", false);
    assert!(t.is_column_visible("number"));
    assert!(!t.is_column_visible("score"));
    let visible: Vec<&str> = t.visible_columns().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(visible, vec!["number", "id", "name", "role", "joined"]);
    t.reset_column_visibility();
    assert!(t.is_column_visible("score"));
    assert!(!t.is_column_visible("missing"));
}

#[test]
fn facets_ignore_own_filter_but_respect_others() {
    let mut t = table(vec![
        person(1, "Rose", "admin", None),
        person(2, "Rosa", "user", None),
        person(3, "Lily", "user", None),
        person(4, "Ross", "user", None),
    ]);
    t.set_column_filter("role", FilterOperator::IsAnyOf, Some(FilterOperand::Options(vec!["admin".into()])));
    t.set_column_filter("name", FilterOperator::Contains, Some(FilterOperand::Text("ros".into())));
    let facets = t.faceted_values("role");
    assert_eq!(facets.len(), 2);
    assert_eq!(facets[0].option.value, "admin");
    assert_eq!(facets[0].option.label, "Admin");
    assert_eq!(facets[0].option.icon.as_deref(), Some("shield"));
    assert_eq!(facets[0].count, 1);
    assert_eq!(facets[1].option.value, "user");
    assert_eq!(facets[1].count, 2);

    assert!(t.faceted_values("name").is_empty());
    assert!(t.faceted_values("missing").is_empty());
}

#[test]
fn replace_rows_keeps_state_and_clamps() {
    let mut t = table(many(30));
    t.toggle_sort("score");
    t.go_to_page(2);
    t.replace_rows(many(12));
    assert_eq!(t.sort_direction("score"), Some(SortDirection::Asc));
    assert_eq!(t.state().pagination.page_index, 1);
    assert_eq!(ids(&t), vec![11, 12]);
}

#[test]
fn view_state_serializes() {
    let mut t = table(many(3));
    t.toggle_sort("name");
    t.set_column_filter("id", FilterOperator::Equals, Some(FilterOperand::Number(2.0)));
    let json = serde_json::to_value(t.state()).unwrap();
    assert_eq!(json["sorting"][0]["direction"], "asc");
    assert_eq!(json["column_filters"][0]["operator"], "equals");
    assert_eq!(json["pagination"]["page_size"], 10);
}
