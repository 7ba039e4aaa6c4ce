//! Aggregate traffic report.
//!
//! Renders the run's aggregate view of the parsed log and the enriched
//! dataset as plain log output: most active addresses, response codes, user
//! agents, referers, the hourly request profile, and a country breakdown of
//! the stored geolocation records.

use std::collections::BTreeMap;

use chrono::Timelike;
use log::info;

use crate::config::REPORT_TOP_N;
use crate::models::GeoRecord;
use crate::parser::LogRecord;
use crate::selector;

/// Prints the aggregate report for one run.
pub fn print_report(records: &[LogRecord], geo_records: &[GeoRecord]) {
    if records.is_empty() {
        info!("No parsed requests to report on.");
    } else {
        print_top_section(
            "Most active client addresses",
            selector::top_by(records, |r| r.remote_addr.clone(), Some(REPORT_TOP_N)),
        );
        print_top_section(
            "Top response codes",
            selector::top_by(records, |r| r.status.to_string(), Some(5)),
        );
        print_top_section(
            "Top user agents",
            selector::top_by(records, |r| r.http_user_agent.clone(), Some(REPORT_TOP_N)),
        );

        // '-' is nginx for "no referer"; it would dominate every log
        let with_referer: Vec<LogRecord> = records
            .iter()
            .filter(|r| r.http_referer != "-")
            .cloned()
            .collect();
        print_top_section(
            "Top referers",
            selector::top_by(&with_referer, |r| r.http_referer.clone(), Some(REPORT_TOP_N)),
        );

        print_hourly_profile(records);
    }

    print_country_breakdown(geo_records);
}

fn print_top_section(title: &str, entries: Vec<(String, usize)>) {
    if entries.is_empty() {
        return;
    }
    info!("{title}:");
    for (value, count) in entries {
        info!("   {count:>6}  {value}");
    }
}

fn print_hourly_profile(records: &[LogRecord]) {
    let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
    for record in records {
        *hours.entry(record.time_local.hour()).or_insert(0) += 1;
    }

    info!("Requests per hour of day:");
    for (hour, count) in hours {
        info!("   {hour:>2}h  {count}");
    }
}

fn print_country_breakdown(geo_records: &[GeoRecord]) {
    if geo_records.is_empty() {
        info!("No geolocation records in the store yet.");
        return;
    }

    let mut countries: BTreeMap<String, usize> = BTreeMap::new();
    for record in geo_records {
        let country = record
            .country_name
            .clone()
            .unwrap_or_else(|| "(unknown)".to_string());
        *countries.entry(country).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = countries.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(REPORT_TOP_N);

    info!(
        "Geolocation store holds {} address(es); top countries:",
        geo_records.len()
    );
    for (country, count) in ranked {
        info!("   {count:>6}  {country}");
    }
}
