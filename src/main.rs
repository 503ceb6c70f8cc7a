//! PaperSift - LLM-assisted paper screening for systematic literature reviews
//!
//! A CLI tool that scans a directory of research papers, scores each
//! one against a review protocol using an OpenAI-compatible model, and
//! generates tabular and narrative reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, scan, API, validation, or I/O failure)

mod analysis;
mod analyzer;
mod cli;
mod config;
mod extract;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{PaperRecord, ReportMetadata, ReviewReport};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("PaperSift v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the screening
    if let Err(e) = run_screening(args).await {
        error!("Screening failed: {}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .papersift.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".papersift.toml");

    if path.exists() {
        eprintln!("⚠️  .papersift.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .papersift.toml")?;

    println!("✅ Created .papersift.toml with default settings.");
    println!("   Edit it to customize the model, scanner, and review protocol.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete screening workflow.
async fn run_screening(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let papers_dir = args
        .papers
        .clone()
        .context("A papers directory is required")?;

    // Step 1: Discover papers
    println!("📥 Scanning for papers in: {}", papers_dir.display());
    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let paper_scanner = scanner::PaperScanner::new(papers_dir.clone(), scan_config);
    let papers = paper_scanner.scan()?;
    info!("Found {} candidate papers", papers.len());

    // Handle --dry-run: list papers and exit
    if args.dry_run {
        return handle_dry_run(&papers);
    }

    if papers.is_empty() {
        anyhow::bail!(
            "No papers found in {}. Add PDF files and try again.",
            papers_dir.display()
        );
    }

    // Step 2: Initialize the analyzer
    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY is not set. Export your API key and try again.")?;

    println!("🤖 Initializing analyzer...");
    println!("   Model: {}", config.model.name);
    println!("   API: {}", config.model.api_url);
    println!("   Protocol: {}", config.protocol.title);

    let analyzer_config = analyzer::AnalyzerConfig {
        api_url: config.model.api_url.clone(),
        api_key,
        model_name: config.model.name.clone(),
        temperature: config.model.temperature,
        max_tokens: config.model.max_tokens,
        timeout_seconds: config.model.timeout_seconds,
        retries: config.model.retries,
        max_prompt_chars: config.model.max_prompt_chars,
    };
    let paper_analyzer = analyzer::PaperAnalyzer::new(analyzer_config, &config.protocol)?;

    // Step 3: Analyze papers one by one
    println!("\n🔬 Analyzing {} papers...\n", papers.len());
    let records = analyze_papers(&paper_analyzer, &papers, &config).await;

    let papers_failed = papers.len() - records.len();
    if records.is_empty() {
        anyhow::bail!("No papers could be analyzed. Check the log for per-paper errors.");
    }

    // Step 4: Aggregate
    println!("\n📝 Generating reports...");
    let aggregate = analysis::build_report(&records, &config.protocol)?;

    let metadata = ReportMetadata {
        papers_dir: papers_dir.display().to_string(),
        analysis_date: Utc::now(),
        model_used: config.model.name.clone(),
        papers_scanned: papers.len(),
        papers_analyzed: records.len(),
        papers_failed,
        papers_included: aggregate.included_count(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let review = ReviewReport {
        metadata,
        aggregate,
    };

    // Step 5: Emit reports
    write_reports(&review, &config)?;

    // Step 6: Print summary
    print_summary(&review, &config);

    Ok(())
}

/// Analyze each paper sequentially, skipping papers that fail
/// extraction or analysis.
async fn analyze_papers(
    paper_analyzer: &analyzer::PaperAnalyzer,
    papers: &[scanner::ScannedPaper],
    config: &Config,
) -> Vec<PaperRecord> {
    let progress = ProgressBar::new(papers.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut records = Vec::new();

    for (i, paper) in papers.iter().enumerate() {
        progress.set_message(paper.path.clone());

        let text = match extract::extract_text(&paper.absolute_path, config.scanner.max_pages) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", paper.path, e);
                progress.inc(1);
                continue;
            }
        };

        match paper_analyzer.analyze(&paper.path, &text).await {
            Ok(record) => {
                debug!(
                    "Analyzed {} (overall score {})",
                    paper.path, record.overall_score
                );
                records.push(record);
            }
            Err(e) => {
                warn!("Analysis failed for {}: {}", paper.path, e);
            }
        }

        progress.inc(1);

        // Courtesy pause between API calls
        if i + 1 < papers.len() {
            tokio::time::sleep(std::time::Duration::from_millis(
                config.model.request_delay_ms,
            ))
            .await;
        }
    }

    progress.finish_and_clear();
    records
}

/// Write the CSV, Markdown, and optional JSON reports.
fn write_reports(review: &ReviewReport, config: &Config) -> Result<()> {
    let csv = report::generate_csv_report(review, &config.protocol);
    std::fs::write(&config.general.csv_output, csv)
        .with_context(|| format!("Failed to write {}", config.general.csv_output))?;

    let markdown = report::generate_markdown_report(
        review,
        &config.protocol,
        config.report.top_papers,
        config.report.include_summaries,
    );
    std::fs::write(&config.general.review_output, markdown)
        .with_context(|| format!("Failed to write {}", config.general.review_output))?;

    if let Some(ref json_path) = config.general.json_output {
        let json = report::generate_json_report(review)?;
        std::fs::write(json_path, json)
            .with_context(|| format!("Failed to write {}", json_path))?;
    }

    Ok(())
}

/// Print the run summary and the top papers to stdout.
fn print_summary(review: &ReviewReport, config: &Config) {
    let meta = &review.metadata;

    println!("\n📊 Screening Summary:");
    println!("   Papers scanned: {}", meta.papers_scanned);
    println!("   Papers analyzed: {}", meta.papers_analyzed);
    if meta.papers_failed > 0 {
        println!("   Papers failed: {}", meta.papers_failed);
    }
    println!("   Papers included: {}", meta.papers_included);
    println!("   Duration: {:.1}s", meta.duration_seconds);

    let top: Vec<&PaperRecord> = review.aggregate.included().take(5).collect();
    if !top.is_empty() {
        println!("\n🏆 Top papers for inclusion:");
        for (i, record) in top.iter().enumerate() {
            println!(
                "   {}. {} ({}/100) - {}",
                i + 1,
                record.id,
                record.overall_score,
                if record.domain.is_empty() {
                    "unspecified domain"
                } else {
                    &record.domain
                }
            );
        }
    }

    println!("\n✅ Screening complete! Reports saved:");
    println!("   - {} (tabular export)", config.general.csv_output);
    println!("   - {} (detailed review)", config.general.review_output);
    if let Some(ref json_path) = config.general.json_output {
        println!("   - {} (full JSON report)", json_path);
    }
}

/// Handle --dry-run: print what would be analyzed, exit.
fn handle_dry_run(papers: &[scanner::ScannedPaper]) -> Result<()> {
    println!("\n🔍 Dry run: scanning papers (no API calls)...\n");

    if papers.is_empty() {
        println!("   No matching papers found.");
    } else {
        println!("   Found {} papers that would be analyzed:\n", papers.len());
        for paper in papers {
            println!("     📄 {} ({} bytes)", paper.path, paper.size);
        }
        println!("\n   Total: {} papers", papers.len());
    }

    println!("\n✅ Dry run complete. No API calls were made.");
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .papersift.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
