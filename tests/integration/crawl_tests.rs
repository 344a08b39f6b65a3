//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the search and metadata
//! endpoints and run the full crawl cycle end-to-end.

use iso_spider::config::{
    Config, CrawlerConfig, EndpointConfig, HeartbeatConfig, HttpConfig, OutputConfig,
};
use iso_spider::crawler::{run_crawl, Coordinator, CrawlOutcome};
use iso_spider::output::{DiscoveredFile, JsonlSink};
use iso_spider::state::NodeKind;
use iso_spider::SpiderError;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir, seeds: &[&str]) -> Config {
    let base = server.uri();
    Config {
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
        crawler: CrawlerConfig {
            request_delay_ms: 0,
            ..CrawlerConfig::default()
        },
        http: HttpConfig {
            timeout_secs: 5,
            retries: 0,
            backoff_factor: 0.0,
            user_agent: "TestSpider/1.0".to_string(),
        },
        endpoints: EndpointConfig {
            search_url: format!("{}/advancedsearch.php", base),
            metadata_url: format!("{}/metadata", base),
            download_base: format!("{}/download", base),
        },
        heartbeat: HeartbeatConfig { interval_secs: 60 },
        output: OutputConfig {
            results_path: dir.path().join("results.jsonl").display().to_string(),
            stats_path: dir.path().join("stats.json").display().to_string(),
            log_file: None,
        },
    }
}

/// Serves an item record at `/metadata/{identifier}`
async fn mount_record(server: &MockServer, identifier: &str, record: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/metadata/{}", identifier)))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .mount(server)
        .await;
}

/// Serves the record of a collection seed
async fn mount_collection_record(server: &MockServer, collection: &str) {
    mount_record(server, collection, json!({"metadata": {"mediatype": "collection"}})).await;
}

/// Serves one search page for a collection, expected to be requested exactly once
async fn mount_page(
    server: &MockServer,
    collection: &str,
    page: u32,
    num_found: u64,
    identifiers: &[&str],
) {
    let docs: Vec<Value> = identifiers
        .iter()
        .map(|id| json!({"identifier": id, "title": format!("Title of {}", id)}))
        .collect();

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", format!("collection:{}", collection)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"numFound": num_found, "docs": docs}
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Builds an item record with the given files and parent collections
fn item_record(title: &str, files: &[&str], parents: &[&str]) -> Value {
    let files: Vec<Value> = files
        .iter()
        .map(|name| json!({"name": name, "size": "1024"}))
        .collect();
    json!({
        "files": files,
        "metadata": {"mediatype": "software", "title": title, "collection": parents}
    })
}

fn read_results(path: &Path) -> Vec<DiscoveredFile> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_identifier_seed_emits_files_and_queues_parent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_record(
        &server,
        "linux-distro-2020",
        item_record(
            "Linux Distro 2020",
            &["disc1.iso", "disc2.ISO", "readme.txt"],
            &["X"],
        ),
    )
    .await;

    let mut config = create_test_config(&server, &dir, &["linux-distro-2020"]);
    config.crawler.max_visits = 1;
    let results_path = dir.path().join("results.jsonl");

    let sink = JsonlSink::create(&results_path).unwrap();
    let mut coordinator = Coordinator::new(config, Box::new(sink)).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::LimitReached);
    assert_eq!(report.visits, 1);
    assert_eq!(report.total_files, 2);
    assert!(report.stats.is_empty());

    let queued: Vec<_> = coordinator.state().frontier.iter().collect();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].kind, NodeKind::Collection);
    assert_eq!(queued[0].value, "X");
    assert_eq!(queued[0].depth, 1);
    assert!((queued[0].priority - 0.5).abs() < 1e-9);

    let results = read_results(&results_path);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].identifier, "linux-distro-2020");
    assert_eq!(results[0].title, "Linux Distro 2020");
    assert_eq!(results[0].file_name, "disc1.iso");
    assert_eq!(results[0].size, "1024");
    assert_eq!(
        results[0].download_url,
        format!("{}/download/linux-distro-2020/disc1.iso", server.uri())
    );
    assert_eq!(results[1].file_name, "disc2.ISO");
}

#[tokio::test]
async fn test_pagination_fetches_exact_page_count() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "big").await;
    mount_page(&server, "big", 1, 1200, &["big-1"]).await;
    mount_page(&server, "big", 2, 1200, &["big-2"]).await;
    mount_page(&server, "big", 3, 1200, &["big-3"]).await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for id in ["big-1", "big-2", "big-3"] {
        mount_record(&server, id, item_record(id, &[], &[])).await;
    }

    let config = create_test_config(&server, &dir, &["big"]);
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 1);
    assert_eq!(report.visited_items, 3);

    let stats: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats["big"]["items"], 3);
    assert_eq!(stats["big"]["files"], 0);
}

#[tokio::test]
async fn test_collection_cycle_terminates_without_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "A").await;
    mount_page(&server, "A", 1, 1, &["item-a"]).await;
    mount_page(&server, "B", 1, 2, &["item-b", "item-a"]).await;

    Mock::given(method("GET"))
        .and(path("/metadata/item-a"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(item_record("A", &["a.iso"], &["A", "B"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_record(
        &server,
        "item-b",
        item_record("B", &["b.iso", "b.img"], &["A", "B"]),
    )
    .await;

    let config = create_test_config(&server, &dir, &["A"]);
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 2);
    assert_eq!(report.visited_collections, 2);
    assert_eq!(report.visited_items, 2);
    assert_eq!(report.total_files, 3);

    let results = read_results(&dir.path().join("results.jsonl"));
    let mut names: Vec<_> = results
        .iter()
        .map(|f| format!("{}/{}", f.identifier, f.file_name))
        .collect();
    names.sort();
    assert_eq!(names, vec!["item-a/a.iso", "item-b/b.img", "item-b/b.iso"]);

    let a = report.stats.get("A").unwrap();
    assert_eq!((a.items_seen, a.files_found), (1, 1));
    let b = report.stats.get("B").unwrap();
    assert_eq!((b.items_seen, b.files_found), (1, 2));
}

#[tokio::test]
async fn test_dry_streak_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "root").await;
    mount_page(&server, "root", 1, 1, &["empty-item"]).await;
    mount_record(
        &server,
        "empty-item",
        item_record("Nothing here", &["notes.txt"], &["c1", "c2", "c3"]),
    )
    .await;
    mount_page(&server, "c1", 1, 0, &[]).await;

    let mut config = create_test_config(&server, &dir, &["root"]);
    config.crawler.stop_on_dry_spell = 2;
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::DryStreakStopped);
    assert_eq!(report.visits, 2);
    assert_eq!(report.total_files, 0);
    assert_eq!(report.frontier_remaining, 2);
    assert!(read_results(&dir.path().join("results.jsonl")).is_empty());
}

#[tokio::test]
async fn test_failed_page_truncates_only_that_collection() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "flaky").await;
    mount_collection_record(&server, "steady").await;

    mount_page(&server, "flaky", 1, 3, &["flaky-1"]).await;
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", "collection:flaky"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", "collection:flaky"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "steady", 1, 1, &["steady-1"]).await;

    mount_record(&server, "flaky-1", item_record("F", &["f.iso"], &[])).await;
    mount_record(&server, "steady-1", item_record("S", &["s.iso"], &[])).await;

    let mut config = create_test_config(&server, &dir, &["flaky", "steady"]);
    config.crawler.rows = 1;
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 2);
    assert_eq!(report.total_files, 2);

    let flaky = report.stats.get("flaky").unwrap();
    assert_eq!((flaky.items_seen, flaky.files_found), (1, 1));
    let steady = report.stats.get("steady").unwrap();
    assert_eq!((steady.items_seen, steady.files_found), (1, 1));
}

#[tokio::test]
async fn test_failed_first_page_leaves_no_trace() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "down").await;
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", "collection:down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &dir, &["down"]);
    config.crawler.stop_on_dry_spell = 1;
    let report = run_crawl(config).await.unwrap();

    // Counted as a visit, but neither a dry collection nor a stats entry
    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 1);
    assert_eq!(report.visited_collections, 1);
    assert!(report.stats.get("down").is_none());

    let stats: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("stats.json")).unwrap())
            .unwrap();
    assert_eq!(stats, json!({}));
}

#[tokio::test]
async fn test_depth_limit_skips_deep_collections() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "root").await;
    mount_page(&server, "root", 1, 1, &["root-item"]).await;
    mount_record(
        &server,
        "root-item",
        item_record("Root", &["root.iso"], &["deep"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", "collection:deep"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, &dir, &["root"]);
    config.crawler.max_depth = 0;
    let results_path = dir.path().join("results.jsonl");

    let sink = JsonlSink::create(&results_path).unwrap();
    let mut coordinator = Coordinator::new(config, Box::new(sink)).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 1);
    assert_eq!(report.visited_collections, 1);
    assert_eq!(report.total_files, 1);
    assert!(!coordinator.state().visited.contains_collection("deep"));
    assert!(report.stats.get("deep").is_none());
}

#[tokio::test]
async fn test_productive_collection_resets_dry_streak() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for collection in ["dry-a", "rich", "dry-b"] {
        mount_collection_record(&server, collection).await;
    }
    mount_page(&server, "dry-a", 1, 0, &[]).await;
    mount_page(&server, "rich", 1, 1, &["rich-item"]).await;
    mount_page(&server, "dry-b", 1, 0, &[]).await;
    mount_record(&server, "rich-item", item_record("Rich", &["rich.iso"], &[])).await;

    let mut config = create_test_config(&server, &dir, &["dry-a", "rich", "dry-b"]);
    config.crawler.stop_on_dry_spell = 2;
    let report = run_crawl(config).await.unwrap();

    // dry, productive, dry: the streak never reaches two
    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visits, 3);
    assert_eq!(report.total_files, 1);
}

#[tokio::test]
async fn test_max_visits_limit_respected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_collection_record(&server, "root").await;
    mount_page(&server, "root", 1, 1, &["root-item"]).await;
    mount_record(
        &server,
        "root-item",
        item_record("Root", &["root.iso"], &["c1", "c2", "c3"]),
    )
    .await;
    mount_page(&server, "c1", 1, 0, &[]).await;

    for collection in ["c2", "c3"] {
        Mock::given(method("GET"))
            .and(path("/advancedsearch.php"))
            .and(query_param("q", format!("collection:{}", collection)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server, &dir, &["root"]);
    config.crawler.max_visits = 2;
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::LimitReached);
    assert_eq!(report.visits, 2);
    assert_eq!(report.total_files, 1);
    assert_eq!(report.frontier_remaining, 2);
}

#[tokio::test]
async fn test_unresolvable_seed_is_treated_as_collection() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_record(&server, "ghost", json!({})).await;
    mount_page(&server, "ghost", 1, 0, &[]).await;

    let config = create_test_config(&server, &dir, &["ghost"]);
    let report = run_crawl(config).await.unwrap();

    assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    assert_eq!(report.visited_collections, 1);
    assert_eq!(report.total_files, 0);
}

#[tokio::test]
async fn test_invalid_config_fails_before_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server, &dir, &["anything"]);
    config.crawler.rows = 0;

    let result = run_crawl(config).await;
    assert!(matches!(result, Err(SpiderError::Config(_))));
    assert!(!dir.path().join("results.jsonl").exists());
}
