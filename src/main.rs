use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use serde::Serialize;

use dupcat::logging::init_logging;
use dupcat::utils::{calculate_percentage, format_duration, human_size};
use dupcat::{Analysis, DupError, DuplicateFinder, JunkFile, Resolved, SearchConfig, SkippedFile};

#[derive(Parser)]
#[command(
    name = "dupcat",
    version,
    about = "Find duplicate files and list the copies that are safe to delete",
    long_about = "Groups files by size, fingerprints the files whose sizes collide and reports, \
for every group of duplicates, the copy that is kept and the copies that could be removed. \
Nothing is ever deleted or moved."
)]
struct Cli {
    /// Directory to search
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    recurse: bool,

    /// Group by size only (fast, may report distinct files of equal size)
    #[arg(short = 's', long)]
    size_only: bool,

    /// Fingerprint every file, not only files whose size collides with another
    #[arg(long, conflicts_with = "size_only")]
    hash_all: bool,

    /// Number of leading bytes fingerprinted per file
    #[arg(long, default_value_t = dupcat::HASH_CHUNK_SIZE)]
    chunk_size: usize,

    /// Fingerprint whole files instead of a leading chunk
    #[arg(long, conflicts_with = "chunk_size")]
    full: bool,

    /// Minimum file size to consider (in bytes)
    #[arg(long, default_value = "0")]
    min_size: u64,

    /// Maximum file size to consider (in bytes)
    #[arg(long)]
    max_size: Option<u64>,

    /// File extensions to include (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include_ext: Vec<String>,

    /// File extensions to exclude (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_ext: Vec<String>,

    /// Number of threads for fingerprinting (0 = auto-detect)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Show every duplicate group with its keeper (-vv also raises log output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn search_config(&self) -> SearchConfig {
        let mut config = SearchConfig::new(&self.path)
            .recurse(self.recurse)
            .use_hash(!self.size_only)
            .from_size(!self.hash_all)
            .chunk_size(if self.full { 0 } else { self.chunk_size })
            .min_size(self.min_size)
            .include_extensions(self.include_ext.clone())
            .exclude_extensions(self.exclude_ext.clone())
            .show_progress(!self.json && !self.quiet);
        if let Some(max_size) = self.max_size {
            config = config.max_size(max_size);
        }
        config
    }
}

#[derive(Serialize)]
struct Report<'a> {
    files_scanned: usize,
    junk_files: &'a [JunkFile],
    skipped: &'a [SkippedFile],
    analysis: &'a Analysis,
}

fn main() {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    match run(&args) {
        Ok(()) => {}
        Err(err) if matches!(err.downcast_ref::<DupError>(), Some(DupError::Cancelled)) => {
            eprintln!("{}", style("Search cancelled").yellow());
            process::exit(130);
        }
        Err(err) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), err);
            process::exit(1);
        }
    }
}

fn run(args: &Cli) -> Result<()> {
    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .context("Failed to configure the thread pool")?;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))
        .context("Failed to install the Ctrl+C handler")?;

    if !args.json {
        println!("{}", style("🔍 Searching for duplicate files...").cyan().bold());
    }

    let started = Instant::now();
    let mut finder = DuplicateFinder::new(args.search_config()).with_cancel_flag(cancel);
    finder.search()?;
    let resolved = finder.resolved()?;
    let analysis = finder.analysis()?;
    let junk = finder.junk_files()?;

    if args.json {
        let report = Report {
            files_scanned: resolved.file_count(),
            junk_files: &junk,
            skipped: resolved.skipped(),
            analysis: &analysis,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display_results(resolved, &junk, args.verbose > 0);
    display_skipped(resolved.skipped());
    display_analysis(resolved, &analysis);
    println!("Finished in {}", format_duration(started.elapsed()));

    Ok(())
}

fn display_results(resolved: &Resolved, junk: &[JunkFile], verbose: bool) {
    if junk.is_empty() {
        println!("{}", style("✅ No duplicate files found!").green().bold());
        return;
    }

    println!();
    println!("{}", style("📊 Duplicate Files Found").cyan().bold());
    println!("{}", style("=".repeat(40)).cyan());

    if verbose {
        for group in resolved.groups() {
            let keeper = group.keeper();
            println!();
            println!(
                "{} {} ({})",
                style("Keep:").bold(),
                keeper.path().display(),
                human_size(keeper.size())
            );
            for record in group.junk() {
                println!("  🗑  {}", record.path().display());
            }
        }
    } else {
        for file in junk {
            println!(
                "{}  ({})  duplicate of {}",
                file.record.path().display(),
                human_size(file.record.size()),
                file.keeper.display()
            );
        }
    }
}

fn display_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }

    println!();
    println!("{}", style(format!("⚠️  Skipped {} unreadable files:", skipped.len())).yellow().bold());
    for file in skipped {
        println!("  {}: {}", file.path.display(), file.reason);
    }
}

fn display_analysis(resolved: &Resolved, analysis: &Analysis) {
    let scanned_bytes = resolved.size_index().total_bytes();

    println!();
    println!("{}", style("📈 Summary").green().bold());
    println!("{}", style("-".repeat(20)).green());
    println!("Total files scanned: {}", resolved.file_count());
    println!("Total duplicates found: {}", analysis.total_duplicate_count);
    println!(
        "Reclaimable space: {} ({:.1}% of scanned data)",
        human_size(analysis.total_size),
        calculate_percentage(analysis.total_size, scanned_bytes)
    );
    if let Some(most) = &analysis.most_frequent {
        println!(
            "Most copies: {} ({} files)",
            most.keeper.path().display(),
            most.group_len
        );
    }
}
