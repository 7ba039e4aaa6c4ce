//! Access log parsing.
//!
//! Turns raw nginx access log lines into structured [`LogRecord`]s using the
//! combined-format line grammar. Lines that do not match the pattern are
//! skipped and counted, never fatal.

use chrono::{DateTime, FixedOffset};
use log::info;
use regex::Regex;

/// Combined-format access log line grammar.
///
/// `<address> <user> <ignored> [<timestamp>] "<request>" <status> <bytes>
/// "<referer>" "<user-agent>"`
const ACCESS_LOG_PATTERN: &str = r#"^(?P<remote_addr>\S+) (?P<remote_user>\S+) \S+ \[(?P<time_local>[^\]]+)\] "(?P<request>[^"]*)" (?P<status>\d+) (?P<body_bytes_sent>\d+) "(?P<http_referer>[^"]*)" "(?P<http_user_agent>[^"]*)""#;

/// Timestamp format used in the `time_local` field, e.g. `10/Oct/2023:13:55:36 +0000`.
///
/// The `%z` offset is mandatory so every parsed timestamp is timezone-aware.
const TIME_LOCAL_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One parsed access log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub remote_addr: String,
    pub remote_user: String,
    pub time_local: DateTime<FixedOffset>,
    pub request: String,
    pub status: u16,
    pub body_bytes_sent: u64,
    pub http_referer: String,
    pub http_user_agent: String,
}

/// Aggregate parse counts for one input.
///
/// `matched + unmatched == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
}

/// Parses access log lines against the fixed combined-format grammar.
pub struct LogParser {
    pattern: Regex,
}

impl LogParser {
    pub fn new() -> Self {
        LogParser {
            // The pattern is a crate constant; compilation cannot fail at runtime.
            pattern: Regex::new(ACCESS_LOG_PATTERN).expect("access log pattern is valid"),
        }
    }

    /// Parses a single log line.
    ///
    /// Returns `None` when the line does not match the grammar, or when a
    /// matched line carries a timestamp or numeric field that fails to parse.
    /// A half-parsed line is never returned; the timestamp invariant (always a
    /// timezone-aware instant) takes precedence over salvaging the rest of the
    /// record, so such lines count as unmatched.
    pub fn parse_line(&self, line: &str) -> Option<LogRecord> {
        let caps = self.pattern.captures(line)?;

        let time_local =
            DateTime::parse_from_str(caps.name("time_local")?.as_str(), TIME_LOCAL_FORMAT).ok()?;
        let status = caps.name("status")?.as_str().parse::<u16>().ok()?;
        let body_bytes_sent = caps.name("body_bytes_sent")?.as_str().parse::<u64>().ok()?;

        Some(LogRecord {
            remote_addr: caps.name("remote_addr")?.as_str().to_string(),
            remote_user: caps.name("remote_user")?.as_str().to_string(),
            time_local,
            request: caps.name("request")?.as_str().to_string(),
            status,
            body_bytes_sent,
            http_referer: caps.name("http_referer")?.as_str().to_string(),
            http_user_agent: caps.name("http_user_agent")?.as_str().to_string(),
        })
    }

    /// Parses an ordered sequence of lines into records plus aggregate counts.
    pub fn parse_lines<I>(&self, lines: I) -> (Vec<LogRecord>, ParseStats)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut records = Vec::new();
        let mut stats = ParseStats::default();

        for line in lines {
            stats.total += 1;
            match self.parse_line(line.as_ref()) {
                Some(record) => {
                    stats.matched += 1;
                    records.push(record);
                }
                None => stats.unmatched += 1,
            }
        }

        info!(
            "Total Rows: {}, Matches: {}, Misses: {}",
            stats.total, stats.matched, stats.unmatched
        );
        (records, stats)
    }
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAMPLE_LINE: &str =
        r#"1.2.3.4 - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#;

    #[test]
    fn test_parse_sample_line() {
        let parser = LogParser::new();
        let record = parser.parse_line(SAMPLE_LINE).expect("line should match");

        assert_eq!(record.remote_addr, "1.2.3.4");
        assert_eq!(record.remote_user, "-");
        assert_eq!(record.request, "GET / HTTP/1.1");
        assert_eq!(record.status, 200);
        assert_eq!(record.body_bytes_sent, 512);
        assert_eq!(record.http_referer, "-");
        assert_eq!(record.http_user_agent, "curl/7.68");
    }

    #[test]
    fn test_timestamp_is_timezone_aware() {
        let parser = LogParser::new();
        let record = parser.parse_line(SAMPLE_LINE).unwrap();

        assert_eq!(record.time_local.offset().local_minus_utc(), 0);
        assert_eq!(record.time_local.hour(), 13);

        let offset_line = r#"5.6.7.8 - - [10/Oct/2023:13:55:36 +0200] "GET / HTTP/1.1" 200 0 "-" "-""#;
        let record = parser.parse_line(offset_line).unwrap();
        assert_eq!(record.time_local.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_unmatched_line_is_dropped() {
        let parser = LogParser::new();
        assert!(parser.parse_line("not a log line").is_none());
        assert!(parser.parse_line("").is_none());
    }

    #[test]
    fn test_bad_timestamp_counts_as_unmatched() {
        // Pattern matches but the timestamp lacks an offset, so the record is dropped.
        let line = r#"1.2.3.4 - - [10/Oct/2023:13:55:36] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#;
        let parser = LogParser::new();
        assert!(parser.parse_line(line).is_none());

        let (records, stats) = parser.parse_lines([line]);
        assert!(records.is_empty());
        assert_eq!(stats.total, 1);
        assert_eq!(stats.matched, 0);
        assert_eq!(stats.unmatched, 1);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let lines = [
            SAMPLE_LINE.to_string(),
            "garbage".to_string(),
            r#"5.6.7.8 - - [11/Oct/2023:01:02:03 +0100] "POST /api HTTP/1.1" 404 99 "https://example.com" "Mozilla/5.0""#
                .to_string(),
            "".to_string(),
        ];
        let parser = LogParser::new();
        let (records, stats) = parser.parse_lines(&lines);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.matched, 2);
        assert_eq!(stats.unmatched, 2);
        assert_eq!(stats.matched + stats.unmatched, stats.total);
        assert_eq!(records.len(), stats.matched);
    }

    #[test]
    fn test_parse_empty_input() {
        let parser = LogParser::new();
        let (records, stats) = parser.parse_lines(Vec::<String>::new());
        assert!(records.is_empty());
        assert_eq!(stats, ParseStats::default());
    }
}
