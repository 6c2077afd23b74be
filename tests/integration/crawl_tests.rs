//! End-to-end crawl tests against a mock site

use crate::common::*;
use howto_harvest::crawler::run_crawl;
use howto_harvest::storage::{failure_log_path, shard_path, CATALOG_FILE};
use howto_harvest::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_discovery_and_processing() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    let summary = run_crawl(test_config(&server, dir.path(), -1))
        .await
        .expect("crawl failed");

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.total_successes(), 3);
    assert_eq!(summary.total_failures(), 0);
    assert_eq!(summary.successes["es"]["Salud"], 2);
    assert_eq!(summary.unprocessed_total, 0);

    let catalog = read_catalog(dir.path());
    assert_eq!(catalog.len(), 3);
    assert!(catalog.iter().all(|e| e.is_processed));
    assert!(catalog.iter().all(|e| e.lang == "es" && e.page == 1));

    let base = server.uri();
    assert_eq!(
        shard_urls(dir.path(), "Salud"),
        vec![format!("{}/Dormir-bien", base), format!("{}/Beber-agua", base)]
    );
    assert_eq!(
        shard_urls(dir.path(), "Viajes"),
        vec![format!("{}/Hacer-la-maleta", base)]
    );

    let shard = std::fs::read_to_string(shard_path(dir.path(), "es", "Viajes")).unwrap();
    let record: serde_json::Value = serde_json::from_str(shard.lines().next().unwrap()).unwrap();
    assert_eq!(record["title"], "Hacer la maleta");
    assert_eq!(record["is_steps"], true);
    assert_eq!(record["num_methods"], 1);
    assert_eq!(record["num_refs"], 1);
}

#[tokio::test]
async fn test_rerun_does_no_work() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    let catalog_before = std::fs::read_to_string(dir.path().join(CATALOG_FILE)).unwrap();

    let summary = run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    assert_eq!(summary.discovered, 0);
    assert_eq!(summary.total_successes(), 0);
    assert_eq!(summary.processed_total, 3);

    let catalog_after = std::fs::read_to_string(dir.path().join(CATALOG_FILE)).unwrap();
    assert_eq!(catalog_before, catalog_after);
    assert_eq!(shard_urls(dir.path(), "Salud").len(), 2);
}

#[tokio::test]
async fn test_rediscover_keeps_entries() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    let ids: Vec<String> = read_catalog(dir.path()).into_iter().map(|e| e.id).collect();

    let mut config = test_config(&server, dir.path(), -1);
    config.rediscover = true;
    let summary = run_crawl(config).await.unwrap();
    assert_eq!(summary.discovered, 0);

    let catalog = read_catalog(dir.path());
    assert_eq!(catalog.iter().map(|e| e.id.clone()).collect::<Vec<_>>(), ids);
    assert!(catalog.iter().all(|e| e.is_processed));
}

#[tokio::test]
async fn test_failure_does_not_stop_category() {
    let server = MockServer::start().await;
    mount_listing(&server, &["Salud"]).await;
    mount_category(&server, "Salud", &["Roto", "Caido", "Dormir-bien"]).await;
    Mock::given(method("GET"))
        .and(path("/Roto"))
        .respond_with(html("<html><body><p>Sin artículo</p></body></html>".to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Caido"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_article(&server, "Dormir-bien", 1).await;

    let dir = TempDir::new().unwrap();
    let summary = run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();

    assert_eq!(summary.total_successes(), 1);
    assert_eq!(summary.total_failures(), 2);
    assert_eq!(summary.unprocessed_total, 2);

    let base = server.uri();
    assert_eq!(
        shard_urls(dir.path(), "Salud"),
        vec![format!("{}/Dormir-bien", base)]
    );

    let log = std::fs::read_to_string(failure_log_path(dir.path(), "es", "Salud")).unwrap();
    assert_eq!(
        log,
        format!("Salud\t{}/Roto\nSalud\t{}/Caido\n", base, base)
    );

    let pending: Vec<String> = read_catalog(dir.path())
        .into_iter()
        .filter(|e| !e.is_processed)
        .map(|e| e.url)
        .collect();
    assert_eq!(pending, vec![format!("{}/Roto", base), format!("{}/Caido", base)]);
}

#[tokio::test]
async fn test_crash_after_shard_write_is_not_refetched() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();

    // The record reached the shard but the checkpoint never did
    let mut catalog = read_catalog(dir.path());
    catalog[0].is_processed = false;
    write_catalog(dir.path(), &catalog);

    let summary = run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    assert_eq!(summary.recovered, 1);
    assert_eq!(summary.total_successes(), 0);
    assert!(read_catalog(dir.path()).iter().all(|e| e.is_processed));
    assert_eq!(shard_urls(dir.path(), "Salud").len(), 2);
}

#[tokio::test]
async fn test_crash_before_shard_write_is_refetched() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 2).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();

    // Drop the second Salud record, leaving half a line behind
    let shard = shard_path(dir.path(), "es", "Salud");
    let content = std::fs::read_to_string(&shard).unwrap();
    let first_line = content.lines().next().unwrap();
    std::fs::write(&shard, format!("{}\n{{\"url\":\"trunc", first_line)).unwrap();

    let mut catalog = read_catalog(dir.path());
    let beber = catalog
        .iter_mut()
        .find(|e| e.url.ends_with("/Beber-agua"))
        .unwrap();
    beber.is_processed = false;
    write_catalog(dir.path(), &catalog);

    let summary = run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    assert_eq!(summary.recovered, 0);
    assert_eq!(summary.total_successes(), 1);

    let base = server.uri();
    assert_eq!(
        shard_urls_lenient(dir.path()),
        vec![format!("{}/Dormir-bien", base), format!("{}/Beber-agua", base)]
    );
}

/// Shard URLs, skipping lines a crash left incomplete
fn shard_urls_lenient(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(shard_path(dir, "es", "Salud"))
        .unwrap()
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter_map(|v| v["url"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_category_cap_then_resume() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    let summary = run_crawl(test_config(&server, dir.path(), 1)).await.unwrap();
    assert_eq!(summary.successes["es"]["Salud"], 1);
    assert_eq!(summary.successes["es"]["Viajes"], 1);
    assert_eq!(summary.unprocessed_total, 1);

    let summary = run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();
    assert_eq!(summary.total_successes(), 1);
    assert_eq!(summary.unprocessed_total, 0);
    assert_eq!(shard_urls(dir.path(), "Salud").len(), 2);
}

#[tokio::test]
async fn test_discovery_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Special:CategoryListing"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let result = run_crawl(test_config(&server, dir.path(), -1)).await;

    assert!(matches!(result, Err(HarvestError::Transport { .. })));
    assert!(!dir.path().join(CATALOG_FILE).exists());
}

#[tokio::test]
async fn test_damaged_catalog_stops_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CATALOG_FILE), "{not json}\n").unwrap();

    let result = run_crawl(test_config(&server, dir.path(), -1)).await;
    assert!(matches!(result, Err(HarvestError::Catalog(_))));
}
