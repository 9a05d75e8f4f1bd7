//! Fuzzy column lookup for a host's "add filter" selector.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tabula_core::{ColumnRegistry, ColumnSpec};

/// Rank filterable columns against `query` by id and label. Empty query returns
/// every filterable column in registry order. Ties keep registry order.
pub fn suggest_columns<'a, T>(registry: &'a ColumnRegistry<T>, query: &str) -> Vec<(&'a ColumnSpec<T>, i64)> {
    let q = query.trim();
    let matcher = SkimMatcherV2::default();
    let mut hits: Vec<(&ColumnSpec<T>, i64)> = registry
        .iter()
        .filter(|c| c.filter_kind().is_some())
        .filter_map(|c| {
            if q.is_empty() { return Some((c, 0)); }
            let by_id = matcher.fuzzy_match(&c.id, q);
            let by_label = matcher.fuzzy_match(&c.meta.label, q);
            by_id.max(by_label).map(|s| (c, s))
        })
        .collect();
    // stable: equal scores keep registry order
    hits.sort_by(|a, b| b.1.cmp(&a.1));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::Value;

    fn registry() -> ColumnRegistry<()> {
        ColumnRegistry::new(vec![
            ColumnSpec::display("number", "No"),
            ColumnSpec::accessor("email", "Email", |_: &()| Value::Null).text_filter(),
            ColumnSpec::accessor("name", "Name", |_: &()| Value::Null).text_filter(),
            ColumnSpec::accessor("Created At", "Created At", |_: &()| Value::Null).date_filter(),
        ])
        .unwrap()
    }

    #[test]
    fn empty_query_lists_filterable_columns() {
        let reg = registry();
        let ids: Vec<&str> = suggest_columns(&reg, "").iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["email", "name", "Created At"]);
    }

    #[test]
    fn fuzzy_query_ranks_matches() {
        let reg = registry();
        let hits = suggest_columns(&reg, "crea");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "Created At");
        assert!(suggest_columns(&reg, "zzz").is_empty());
    }
}
