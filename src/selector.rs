//! Frequency-based record selection.
//!
//! Ranks and filters parsed log records by the frequency of a chosen column,
//! producing the ordered candidate set for enrichment and the aggregate counts
//! consumed by the report.

use std::collections::HashMap;
use std::hash::Hash;

use crate::parser::LogRecord;

/// Distinct values of a column ordered by descending frequency.
///
/// Equal frequencies keep their first-seen order in the input, so the output
/// is deterministic and idempotent for the same records. With `limit` the
/// result is truncated to the top N values.
pub fn top_by<K, F>(records: &[LogRecord], column: F, limit: Option<usize>) -> Vec<(K, usize)>
where
    F: Fn(&LogRecord) -> K,
    K: Eq + Hash + Clone,
{
    let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        let entry = counts.entry(column(record)).or_insert((0, index));
        entry.0 += 1;
    }

    let mut ranked: Vec<(K, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_unstable_by(|a, b| {
        // primary sort: descending counts, secondary: first appearance in the input
        let count_cmp = b.1 .0.cmp(&a.1 .0);
        if count_cmp == std::cmp::Ordering::Equal {
            a.1 .1.cmp(&b.1 .1)
        } else {
            count_cmp
        }
    });

    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked.into_iter().map(|(key, (count, _))| (key, count)).collect()
}

/// Number of distinct values of a column.
pub fn distinct_count<K, F>(records: &[LogRecord], column: F) -> usize
where
    F: Fn(&LogRecord) -> K,
    K: Eq + Hash,
{
    records.iter().map(column).collect::<std::collections::HashSet<K>>().len()
}

/// The ordered, deduplicated candidate address set for one enrichment run.
///
/// Addresses are ranked by request count; `limit` caps the set at the top N.
/// Deduplication here is what lets the coordinator assume chunks are disjoint.
pub fn candidate_addresses(records: &[LogRecord], limit: Option<usize>) -> Vec<String> {
    top_by(records, |r| r.remote_addr.clone(), limit)
        .into_iter()
        .map(|(addr, _)| addr)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LogParser;

    fn records_for(addrs: &[&str]) -> Vec<LogRecord> {
        let parser = LogParser::new();
        addrs
            .iter()
            .map(|a| {
                parser
                    .parse_line(&format!(
                        r#"{a} - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#
                    ))
                    .expect("synthetic line should parse")
            })
            .collect()
    }

    #[test]
    fn test_top_by_orders_by_descending_frequency() {
        let records = records_for(&["a", "b", "b", "c", "b", "c"]);
        let top = top_by(&records, |r| r.remote_addr.clone(), None);
        assert_eq!(
            top,
            vec![
                ("b".to_string(), 3),
                ("c".to_string(), 2),
                ("a".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_top_by_tie_break_is_first_seen_order() {
        let records = records_for(&["x", "y", "z", "y", "x", "z"]);
        let top = top_by(&records, |r| r.remote_addr.clone(), None);
        // All tied at 2; input order x, y, z wins.
        assert_eq!(
            top,
            vec![
                ("x".to_string(), 2),
                ("y".to_string(), 2),
                ("z".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_top_by_truncates_to_limit() {
        let records = records_for(&["a", "a", "b", "c"]);
        let top = top_by(&records, |r| r.remote_addr.clone(), Some(2));
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "a");
    }

    #[test]
    fn test_top_by_is_idempotent() {
        let records = records_for(&["a", "b", "a", "c", "c", "a"]);
        let first = top_by(&records, |r| r.remote_addr.clone(), Some(3));
        let second = top_by(&records, |r| r.remote_addr.clone(), Some(3));
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_by_output_is_subset_of_distinct_input() {
        let records = records_for(&["a", "b", "a"]);
        let top = top_by(&records, |r| r.remote_addr.clone(), Some(10));
        assert_eq!(top.len(), 2);
        for (addr, _) in &top {
            assert!(records.iter().any(|r| &r.remote_addr == addr));
        }
    }

    #[test]
    fn test_top_by_works_on_other_columns() {
        let parser = LogParser::new();
        let lines = [
            r#"1.1.1.1 - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#,
            r#"2.2.2.2 - - [10/Oct/2023:13:55:37 +0000] "GET / HTTP/1.1" 404 0 "-" "curl/7.68""#,
            r#"3.3.3.3 - - [10/Oct/2023:13:55:38 +0000] "GET / HTTP/1.1" 404 0 "-" "Mozilla/5.0""#,
        ];
        let (records, _) = parser.parse_lines(lines);

        let statuses = top_by(&records, |r| r.status, None);
        assert_eq!(statuses[0], (404, 2));

        let agents = top_by(&records, |r| r.http_user_agent.clone(), Some(1));
        assert_eq!(agents, vec![("curl/7.68".to_string(), 2)]);
    }

    #[test]
    fn test_distinct_count() {
        let records = records_for(&["a", "b", "a", "c"]);
        assert_eq!(distinct_count(&records, |r| r.remote_addr.clone()), 3);
        assert_eq!(distinct_count(&records, |r| r.status), 1);
    }

    #[test]
    fn test_candidate_addresses_deduplicates() {
        let records = records_for(&["a", "a", "b"]);
        let candidates = candidate_addresses(&records, None);
        assert_eq!(candidates, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_empty_records() {
        let records: Vec<LogRecord> = Vec::new();
        assert!(top_by(&records, |r| r.remote_addr.clone(), Some(5)).is_empty());
        assert_eq!(distinct_count(&records, |r| r.status), 0);
        assert!(candidate_addresses(&records, Some(5)).is_empty());
    }
}
