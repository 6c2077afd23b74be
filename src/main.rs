//! howto-harvest main entry point
//!
//! This is the command-line interface for the WikiHow harvester.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use howto_harvest::config::{CrawlConfig, HttpConfig, SiteTable};
use howto_harvest::crawler::{lookup_article_id, run_crawl, Fetcher};
use howto_harvest::output::{
    builder_configs, export, load_catalog_statistics, merge_shards, print_catalog_statistics,
    print_run_summary, Dataset, MergeOptions, SPANISH_CATEGORIES,
};
use howto_harvest::storage::{UrlCatalog, CATALOG_FILE};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// howto-harvest: a resumable WikiHow harvester
///
/// Discovers articles on the localized WikiHow sites, extracts them into
/// line-delimited records and resumes where it left off when interrupted.
/// Run at most one crawl per output directory at a time.
#[derive(Parser, Debug)]
#[command(name = "howto-harvest")]
#[command(version)]
#[command(about = "A resumable WikiHow harvester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover and process articles, resuming from the catalog when present
    Crawl(CrawlArgs),

    /// Merge every shard of a language into one shuffled corpus
    Merge(MergeArgs),

    /// Write the question/answer projection of a corpus as JSONL
    Export(ExportArgs),

    /// Show catalog progress and exit
    Stats {
        /// Output directory holding the catalog
        #[arg(short, long, default_value = "./output")]
        out_dir: PathBuf,
    },

    /// Print the numeric page id of an article
    LookupId {
        /// Site language
        #[arg(short, long, default_value = "es")]
        lang: String,

        /// Article URL
        url: String,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Languages to crawl
    #[arg(short, long, num_args = 1.., default_values_t = vec!["es".to_string()])]
    langs: Vec<String>,

    /// Output directory for the catalog, shards and failure logs
    #[arg(short, long, default_value = "./output")]
    out_dir: PathBuf,

    /// Successful articles per category in this run (negative means unlimited)
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    max_per_category: i64,

    /// Seconds to wait before every article request
    #[arg(short, long, default_value_t = 5.0)]
    delay: f64,

    /// Walk the category listings even when a catalog exists
    #[arg(long)]
    rediscover: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Language whose shards are merged
    #[arg(short, long, default_value = "es")]
    lang: String,

    /// Directory holding the shard files
    #[arg(short, long, default_value = "./output")]
    out_dir: PathBuf,

    /// Corpus file to write (default: <out_dir>/wikihow_<lang>.jsonl)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Shuffle seed for a reproducible corpus
    #[arg(long)]
    seed: Option<u64>,

    /// Overwrite an existing corpus file
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Merged corpus file
    #[arg(short, long)]
    input: PathBuf,

    /// Language of the corpus, for question and answer formatting
    #[arg(short, long, default_value = "es")]
    lang: String,

    /// `all` or a category name
    #[arg(short, long, default_value = "all")]
    config: String,

    /// Destination file (default: <input stem>.<config>.dataset.jsonl)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing destination file
    #[arg(long)]
    force: bool,

    /// List the available configs and exit
    #[arg(long)]
    list_configs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Crawl(args) => handle_crawl(args).await,
        Command::Merge(args) => handle_merge(args),
        Command::Export(args) => handle_export(args),
        Command::Stats { out_dir } => handle_stats(out_dir),
        Command::LookupId { lang, url } => handle_lookup_id(&lang, &url).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("howto_harvest=info,warn"),
            1 => EnvFilter::new("howto_harvest=debug,info"),
            2 => EnvFilter::new("howto_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the crawl subcommand
async fn handle_crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let table = SiteTable::builtin()?;
    let sites = table
        .select(&args.langs)
        .with_context(|| format!("supported languages: {}", table.codes().join(", ")))?;

    anyhow::ensure!(
        args.delay.is_finite() && args.delay >= 0.0,
        "delay must be a non-negative number of seconds"
    );

    let config = CrawlConfig {
        sites,
        out_dir: args.out_dir,
        max_per_category: args.max_per_category,
        delay: Duration::from_secs_f64(args.delay),
        rediscover: args.rediscover,
        http: HttpConfig {
            timeout: Duration::from_secs(args.timeout),
            ..HttpConfig::default()
        },
    };

    tracing::info!(
        "Crawling {} into {} (delay {:?}, cap {})",
        args.langs.join(", "),
        config.out_dir.display(),
        config.delay,
        config
            .category_cap()
            .map_or_else(|| "none".to_string(), |cap| cap.to_string())
    );

    match run_crawl(config).await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the merge subcommand
fn handle_merge(args: MergeArgs) -> anyhow::Result<()> {
    let options = MergeOptions {
        dir: args.out_dir,
        lang: args.lang,
        output: args.output,
        seed: args.seed,
        force: args.force,
    };

    let report = merge_shards(&options)?;

    println!("=== Merge Summary ===\n");
    for (category, count) in &report.shards {
        println!("  {}: {}", category, count);
    }
    println!();
    println!("Records:       {}", report.records);
    println!("Skipped lines: {}", report.skipped_lines);
    println!("\n✓ Corpus written to: {}", report.output.display());

    Ok(())
}

/// Handles the export subcommand
fn handle_export(args: ExportArgs) -> anyhow::Result<()> {
    let table = SiteTable::builtin()?;
    let site = table.get(&args.lang)?;

    if args.list_configs {
        let categories: &[&str] = if site.code == "es" {
            SPANISH_CATEGORIES
        } else {
            &[]
        };
        for config in builder_configs(site, categories) {
            println!("{:<32} {}", config.name, config.description);
        }
        return Ok(());
    }

    let dataset = Dataset::open(&args.input, &args.config, site)
        .with_context(|| format!("cannot open corpus {}", args.input.display()))?;

    let output = args
        .output
        .unwrap_or_else(|| dataset.default_export_path());

    let count = export(&dataset, &output, args.force)?;
    let info = dataset.info();
    println!("{} ({}, version {})", info.description, info.license, info.version);
    println!("✓ Exported {} examples to: {}", count, output.display());

    Ok(())
}

/// Handles the stats subcommand
fn handle_stats(out_dir: PathBuf) -> anyhow::Result<()> {
    let path = out_dir.join(CATALOG_FILE);
    println!("Catalog: {}\n", path.display());

    let catalog = UrlCatalog::load(&path)
        .with_context(|| format!("cannot read catalog {}", path.display()))?;
    let stats = load_catalog_statistics(&catalog);
    print_catalog_statistics(&stats);

    Ok(())
}

/// Handles the lookup-id subcommand
async fn handle_lookup_id(lang: &str, url: &str) -> anyhow::Result<()> {
    let table = SiteTable::builtin()?;
    let site = table.get(lang)?;
    let fetcher = Fetcher::new(&HttpConfig::default())?;

    let id = lookup_article_id(&fetcher, site, url).await?;
    println!("{}", id);

    Ok(())
}
