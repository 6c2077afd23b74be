//! Merge and export tests over crawled and hand-written shards

use crate::common::*;
use howto_harvest::config::SiteTable;
use howto_harvest::crawler::run_crawl;
use howto_harvest::output::{export, merge_shards, CorpusRecord, Dataset, MergeOptions};
use howto_harvest::HarvestError;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::MockServer;

fn options(dir: &Path) -> MergeOptions {
    MergeOptions {
        dir: dir.to_path_buf(),
        lang: "es".to_string(),
        output: None,
        seed: Some(7),
        force: false,
    }
}

fn read_corpus(path: &Path) -> Vec<CorpusRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

const SHARD_LINE: &str = concat!(
    r#"{"url":"URL","title":"T","intro":"I","#,
    r#""methods":[{"number":1,"title":"Pasos","steps":["1. A\nb"]}],"#,
    r#""num_methods":1,"is_steps":true,"expert_author":false,"num_refs":REFS}"#
);

fn shard_line(url: &str, refs: &str) -> String {
    SHARD_LINE.replace("URL", url).replace("REFS", refs)
}

#[tokio::test]
async fn test_merge_after_crawl_is_complete() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_article(&server, "Dormir-bien", 1).await;
    mount_article(&server, "Beber-agua", 1).await;
    mount_article(&server, "Hacer-la-maleta", 1).await;

    let dir = TempDir::new().unwrap();
    run_crawl(test_config(&server, dir.path(), -1)).await.unwrap();

    let report = merge_shards(&options(dir.path())).unwrap();
    assert_eq!(report.records, 3);
    assert_eq!(report.skipped_lines, 0);
    assert_eq!(
        report.shards,
        vec![("salud".to_string(), 2), ("viajes".to_string(), 1)]
    );

    let corpus = read_corpus(&report.output);
    let merged: HashSet<String> = corpus.iter().map(|r| r.url.clone()).collect();
    let crawled: HashSet<String> = read_catalog(dir.path()).into_iter().map(|e| e.url).collect();
    assert_eq!(merged, crawled);
    assert!(corpus.iter().all(|r| r.language == "es" && r.num_refs == 1));
    assert!(corpus
        .iter()
        .all(|r| r.category == "salud" || r.category == "viajes"));
}

#[test]
fn test_merge_normalizes_refs_and_skips_bad_lines() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("wikihow_es_salud.jsonl"),
        [
            shard_line("a", "2"),
            shard_line("b", "null"),
            "{broken".to_string(),
            shard_line("c", "4.0"),
        ]
        .join("\n"),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("wikihow_es_viajes.jsonl"),
        shard_line("d", "\"3\"") + "\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("wikihow_pt_saude.jsonl"), shard_line("x", "1")).unwrap();

    let report = merge_shards(&options(dir.path())).unwrap();
    assert_eq!(report.records, 4);
    assert_eq!(report.skipped_lines, 1);

    let mut refs: Vec<(String, u32)> = read_corpus(&report.output)
        .into_iter()
        .map(|r| (r.url, r.num_refs))
        .collect();
    refs.sort();
    assert_eq!(
        refs,
        vec![
            ("a".to_string(), 2),
            ("b".to_string(), 0),
            ("c".to_string(), 4),
            ("d".to_string(), 3)
        ]
    );
}

#[test]
fn test_merge_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("wikihow_es_salud.jsonl"), shard_line("a", "1")).unwrap();

    let first = merge_shards(&options(dir.path())).unwrap();
    let result = merge_shards(&options(dir.path()));
    assert!(matches!(result, Err(HarvestError::OutputExists(_))));

    let mut forced = options(dir.path());
    forced.force = true;
    let second = merge_shards(&forced).unwrap();
    assert_eq!(first.output, second.output);
    assert_eq!(second.records, 1);
}

#[test]
fn test_merge_without_shards() {
    let dir = TempDir::new().unwrap();
    let result = merge_shards(&options(dir.path()));
    assert!(matches!(result, Err(HarvestError::NoShards { .. })));
}

#[test]
fn test_merge_seed_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..20).map(|i| shard_line(&format!("u{}", i), "0")).collect();
    std::fs::write(dir.path().join("wikihow_es_salud.jsonl"), lines.join("\n")).unwrap();

    let mut first = options(dir.path());
    first.output = Some(dir.path().join("one.jsonl"));
    let mut second = options(dir.path());
    second.output = Some(dir.path().join("two.jsonl"));

    merge_shards(&first).unwrap();
    merge_shards(&second).unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("one.jsonl")).unwrap(),
        std::fs::read_to_string(dir.path().join("two.jsonl")).unwrap()
    );
}

#[test]
fn test_export_merged_corpus() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("wikihow_es_salud.jsonl"), shard_line("a", "1")).unwrap();
    std::fs::write(dir.path().join("wikihow_es_viajes.jsonl"), shard_line("b", "1")).unwrap();
    let report = merge_shards(&options(dir.path())).unwrap();

    let table = SiteTable::builtin().unwrap();
    let site = table.get("es").unwrap();
    let dataset = Dataset::open(&report.output, "Salud", site).unwrap();

    let examples: Vec<_> = dataset.examples().unwrap().map(|r| r.unwrap().1).collect();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].url, "a");
    assert_eq!(examples[0].question, "¿T?");
    assert_eq!(examples[0].short_answers, vec!["Sigue los siguientes pasos:\n1. A"]);
    assert_eq!(examples[0].answers, vec!["Sigue los siguientes pasos:\n\n1. A\nb"]);

    let out = dir.path().join("export.jsonl");
    assert_eq!(export(&dataset, &out, false).unwrap(), 1);
}

#[test]
fn test_merge_with_only_unreadable_lines_keeps_corpus() {
    let dir = TempDir::new().unwrap();
    let shard = dir.path().join("wikihow_es_salud.jsonl");
    std::fs::write(&shard, shard_line("a", "1")).unwrap();
    let report = merge_shards(&options(dir.path())).unwrap();
    let corpus_before = std::fs::read_to_string(&report.output).unwrap();

    std::fs::write(&shard, "{\"category\":\"salud\",\"question\":\"¿T?\"}\n").unwrap();
    let mut forced = options(dir.path());
    forced.force = true;
    let result = merge_shards(&forced);

    assert!(matches!(result, Err(HarvestError::NoRecords { .. })));
    assert_eq!(
        std::fs::read_to_string(&report.output).unwrap(),
        corpus_before
    );
}

#[test]
fn test_default_export_leaves_shards_alone() {
    let dir = TempDir::new().unwrap();
    let salud = dir.path().join("wikihow_es_salud.jsonl");
    let viajes = dir.path().join("wikihow_es_viajes.jsonl");
    std::fs::write(&salud, shard_line("a", "1") + "\n").unwrap();
    std::fs::write(&viajes, shard_line("b", "2") + "\n").unwrap();
    let report = merge_shards(&options(dir.path())).unwrap();

    let table = SiteTable::builtin().unwrap();
    let site = table.get("es").unwrap();
    for config in ["salud", "all"] {
        let dataset = Dataset::open(&report.output, config, site).unwrap();
        let out = dataset.default_export_path();
        export(&dataset, &out, false).unwrap();

        // A second export with the same name needs --force
        let again = export(&dataset, &out, false);
        assert!(matches!(again, Err(HarvestError::OutputExists(_))));
    }

    assert_eq!(
        std::fs::read_to_string(&salud).unwrap(),
        shard_line("a", "1") + "\n"
    );
    assert_eq!(
        std::fs::read_to_string(&viajes).unwrap(),
        shard_line("b", "2") + "\n"
    );

    let mut forced = options(dir.path());
    forced.force = true;
    let remerged = merge_shards(&forced).unwrap();
    assert_eq!(remerged.records, 2);
    assert_eq!(remerged.skipped_lines, 0);
    assert_eq!(
        remerged.shards,
        vec![("salud".to_string(), 1), ("viajes".to_string(), 1)]
    );
}
