// End-to-end tests for `run_pipeline`: real log file, real SQLite store.
//
// Network calls are avoided by pre-seeding the store (all cache hits) or
// pointed at an unroutable local address to exercise the failure path.

use std::io::Write;

use log_geo::{run_pipeline, GeoRecord, GeoStore, Opt};

fn write_log(dir: &std::path::Path, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join("access.log");
    let mut file = std::fs::File::create(&path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    path
}

fn opt_for(dir: &std::path::Path, log_path: std::path::PathBuf) -> Opt {
    Opt {
        file: log_path,
        fallback_dir: dir.join("nginx"),
        db_path: dir.join("geo.db"),
        workers: 2,
        timeout_seconds: 2,
        // nothing listens here; only reached on a cache miss
        api_base: "http://127.0.0.1:1".to_string(),
        skip_report: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn preseeded_addresses_complete_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(
        dir.path(),
        &[
            r#"1.2.3.4 - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#,
            r#"1.2.3.4 - - [10/Oct/2023:13:56:00 +0000] "GET /a HTTP/1.1" 200 100 "-" "curl/7.68""#,
            r#"5.6.7.8 - - [10/Oct/2023:14:00:00 +0000] "GET /b HTTP/1.1" 404 0 "-" "curl/7.68""#,
            "not a log line",
        ],
    );

    let opt = opt_for(dir.path(), log_path);

    // Seed both addresses so the run never leaves the cache.
    let store = GeoStore::open(&opt.db_path).await.unwrap();
    for ip in ["1.2.3.4", "5.6.7.8"] {
        store
            .put(&GeoRecord {
                ip: ip.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
    }
    store.close().await;

    let report = run_pipeline(opt).await.expect("pipeline should succeed");

    assert_eq!(report.total_lines, 4);
    assert_eq!(report.parsed, 3);
    assert_eq!(report.unmatched, 1);
    assert_eq!(report.candidates, 2);
    assert_eq!(report.cache_hits, 2);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn unreachable_provider_fails_per_address_not_per_run() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(
        dir.path(),
        &[r#"9.9.9.9 - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 1 "-" "curl/7.68""#],
    );

    let opt = opt_for(dir.path(), log_path);
    let db_path = opt.db_path.clone();
    let report = run_pipeline(opt).await.expect("run must complete");

    assert_eq!(report.candidates, 1);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.failed, 1);

    // The address stays absent so a future run retries it naturally.
    let store = GeoStore::open(&db_path).await.unwrap();
    assert!(store.get("9.9.9.9").await.unwrap().is_none());
    store.close().await;
}

#[tokio::test]
async fn missing_log_everywhere_yields_empty_run() {
    let dir = tempfile::tempdir().unwrap();
    let opt = opt_for(dir.path(), dir.path().join("does-not-exist.log"));

    let report = run_pipeline(opt).await.expect("missing log is not an error");

    assert_eq!(report.total_lines, 0);
    assert_eq!(report.parsed, 0);
    assert_eq!(report.candidates, 0);
    assert_eq!(report.fetched, 0);
}

#[tokio::test]
async fn report_rendering_does_not_disturb_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = write_log(
        dir.path(),
        &[r#"1.2.3.4 - - [10/Oct/2023:13:55:36 +0000] "GET / HTTP/1.1" 200 512 "-" "curl/7.68""#],
    );

    let mut opt = opt_for(dir.path(), log_path);
    opt.skip_report = false;

    let store = GeoStore::open(&opt.db_path).await.unwrap();
    store
        .put(&GeoRecord {
            ip: "1.2.3.4".to_string(),
            country_name: Some("Austria".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    store.close().await;

    let report = run_pipeline(opt).await.expect("pipeline should succeed");
    assert_eq!(report.cache_hits, 1);
}
