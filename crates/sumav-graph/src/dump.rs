//! Graph dump/mirror naming, grounded on
//! `SumavGraphManager`'s pure name-formatting and sorting helpers. The
//! actual `pg_dump`/`createdb`/`pg_restore` subprocess orchestration targets
//! a different persistence engine than this crate's store and is out of
//! scope; only the naming/sorting logic is carried over.

use chrono::{DateTime, Utc};

/// Format a dump database name as `"{base}_{YYMMDD}-{YYMMDD}"` from a
/// submission-date range.
pub fn format_dump_name(base: &str, min_date: DateTime<Utc>, max_date: DateTime<Utc>) -> String {
    format!(
        "{base}_{}-{}",
        min_date.format("%y%m%d"),
        max_date.format("%y%m%d")
    )
}

/// Sort candidate graph names newest-first by the trailing 6 characters
/// (the max-date half of the `YYMMDD-YYMMDD` suffix).
pub fn sort_graph_names(mut names: Vec<String>) -> Vec<String> {
    names.sort_by(|a, b| trailing_key(b).cmp(trailing_key(a)));
    names
}

fn trailing_key(name: &str) -> &str {
    let len = name.len();
    if len >= 6 {
        &name[len - 6..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_dump_name_matches_expected_pattern() {
        let min = Utc.with_ymd_and_hms(2021, 1, 15, 0, 0, 0).unwrap();
        let max = Utc.with_ymd_and_hms(2021, 3, 20, 0, 0, 0).unwrap();
        assert_eq!(format_dump_name("sumav_graph", min, max), "sumav_graph_210115-210320");
    }

    #[test]
    fn sort_graph_names_orders_newest_first() {
        let names = vec![
            "sumav_graph_200101-200201".to_string(),
            "sumav_graph_210101-210601".to_string(),
            "sumav_graph_190101-190301".to_string(),
        ];
        let sorted = sort_graph_names(names);
        assert_eq!(
            sorted,
            vec![
                "sumav_graph_210101-210601".to_string(),
                "sumav_graph_200101-200201".to_string(),
                "sumav_graph_190101-190301".to_string(),
            ]
        );
    }
}
