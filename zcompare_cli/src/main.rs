use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zcompare_common::{
    ensure_config, load_config, CompareError, ComparisonReport, ComparisonSummary, Credentials,
    EntryComparison, EntryStatus, ExclusionSet, HashAlgorithm,
};
use zcompare_core::ArchiveComparator;

const EXIT_IDENTICAL: i32 = 0;
const EXIT_DIFFERENT: i32 = 1;
const EXIT_FAILURE: i32 = 2;

#[derive(Parser)]
#[command(name = "zcompare")]
#[command(author = "ZCompare Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare the entries of two zip archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two zip archives entry by entry
    Compare {
        /// First zip archive
        first: PathBuf,

        /// Second zip archive
        second: PathBuf,

        /// Password for the first archive
        #[arg(long, env = "ZCOMPARE_PASSWORD1", hide_env_values = true)]
        password1: Option<String>,

        /// Password for the second archive
        #[arg(long, env = "ZCOMPARE_PASSWORD2", hide_env_values = true)]
        password2: Option<String>,

        /// Extensions to exclude, e.g. ".log,.tmp" (can be specified multiple times)
        #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
        exclude: Vec<String>,

        /// Ignore the exclusions from the config file
        #[arg(long)]
        no_default_excludes: bool,

        /// Largest accepted archive size in MiB
        #[arg(long)]
        max_size_mb: Option<u64>,

        /// Content hash used for equally sized entries
        #[arg(long, value_enum)]
        hash: Option<HashArg>,

        /// Show only differences (hide identical entries)
        #[arg(short = 'd', long)]
        diff_only: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Disable ANSI colors in output
        #[arg(long)]
        no_color: bool,
    },

    /// Show the configuration file location and values
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Use a config file next to the executable
        #[arg(long)]
        portable: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HashArg {
    Xxh64,
    Blake3,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Xxh64 => HashAlgorithm::Xxh64,
            HashArg::Blake3 => HashAlgorithm::Blake3,
        }
    }
}

struct CompareArgs {
    first: PathBuf,
    second: PathBuf,
    password1: Option<String>,
    password2: Option<String>,
    exclude: Vec<String>,
    no_default_excludes: bool,
    max_size_mb: Option<u64>,
    hash: Option<HashArg>,
    diff_only: bool,
    json: bool,
    no_color: bool,
}

fn main() {
    // Initialize tracing to stderr (so JSON output can go cleanly to stdout)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            first,
            second,
            password1,
            password2,
            exclude,
            no_default_excludes,
            max_size_mb,
            hash,
            diff_only,
            json,
            no_color,
        } => {
            let args = CompareArgs {
                first,
                second,
                password1,
                password2,
                exclude,
                no_default_excludes,
                max_size_mb,
                hash,
                diff_only,
                json,
                no_color,
            };
            match run_compare(args) {
                Ok(summary) if summary.all_identical() => std::process::exit(EXIT_IDENTICAL),
                Ok(_) => std::process::exit(EXIT_DIFFERENT),
                Err(e) => {
                    match e.downcast_ref::<CompareError>() {
                        Some(failure) => error!(kind = failure.kind(), "Comparison failed: {}", failure),
                        None => error!("Comparison failed: {:#}", e),
                    }
                    std::process::exit(EXIT_FAILURE);
                }
            }
        }
        Commands::Config { init, portable } => {
            if let Err(e) = run_config(init, portable) {
                error!("Config failed: {:#}", e);
                std::process::exit(EXIT_FAILURE);
            }
        }
    }
}

fn run_compare(args: CompareArgs) -> anyhow::Result<ComparisonSummary> {
    if !args.first.exists() {
        bail!("First path does not exist: {}", args.first.display());
    }
    if !args.second.exists() {
        bail!("Second path does not exist: {}", args.second.display());
    }
    if !is_zip_path(&args.first) || !is_zip_path(&args.second) {
        bail!("Both files must be zip files");
    }

    let loaded = load_config(false)?;
    let mut config = loaded.config;

    if let Some(max_size_mb) = args.max_size_mb {
        if max_size_mb == 0 {
            bail!("--max-size-mb must be greater than zero");
        }
        config.max_archive_size_mb = max_size_mb;
    }
    if let Some(hash) = args.hash {
        config.hash_algorithm = hash.into();
    }

    let mut exclusions = if args.no_default_excludes {
        ExclusionSet::new()
    } else {
        config.exclusions()
    };
    exclusions.extend(&ExclusionSet::from_list(&args.exclude));

    let credentials = Credentials::new(args.password1, args.password2);
    let comparator = ArchiveComparator::new(config.compare_options());

    info!(
        "Limit {}MB, {} hash, excluding [{}]",
        comparator.options().max_archive_size_mb(),
        comparator.options().hash_algorithm,
        exclusions.as_list().join(", ")
    );

    let report = comparator.compare_paths(&args.first, &args.second, &credentials, &exclusions)?;
    let summary = report.comparison.summary();

    if args.json {
        let json_report = build_json_report(&report, args.diff_only);
        let output = serde_json::to_string_pretty(&json_report)?;
        println!("{output}");
        return Ok(summary);
    }

    let use_color = !args.no_color && std::io::stdout().is_terminal();
    print_report(&report, args.diff_only, use_color);

    Ok(summary)
}

fn run_config(init: bool, portable: bool) -> anyhow::Result<()> {
    let loaded = if init {
        ensure_config(portable)?
    } else {
        load_config(portable)?
    };

    println!("Config file: {}", loaded.path.display());
    println!("Exists:      {}", loaded.exists || init);
    println!("Portable:    {}", loaded.portable);
    println!("{}", serde_json::to_string_pretty(&loaded.config)?);
    Ok(())
}

fn print_report(report: &ComparisonReport, diff_only: bool, use_color: bool) {
    println!("\n{}", "=".repeat(80));
    println!("Comparison Results: {} vs {}", report.first_name, report.second_name);
    println!("{}", "=".repeat(80));

    for (name, record) in report.comparison.iter() {
        let status = record.status();

        // Skip identical entries if diff_only is set
        if diff_only && status == EntryStatus::Identical {
            continue;
        }

        let (status_color, reset) = if use_color {
            (status_color(status), "\x1b[0m")
        } else {
            ("", "")
        };

        println!(
            "{}{}{} {}  ({})",
            status_color,
            status_symbol(status),
            reset,
            name,
            size_column(record)
        );
    }

    let summary = report.comparison.summary();
    let same_mark = if use_color { "\x1b[32m(==)\x1b[0m" } else { "(==)" };
    let diff_mark = if use_color { "\x1b[31m(!=)\x1b[0m" } else { "(!=)" };
    let first_mark = if use_color { "\x1b[33m(<<)\x1b[0m" } else { "(<<)" };
    let second_mark = if use_color { "\x1b[34m(>>)\x1b[0m" } else { "(>>)" };

    println!("\n{}", "=".repeat(80));
    println!("Summary:");
    println!("  Total entries:   {}", summary.total);
    println!("  Identical:       {} {}", summary.identical, same_mark);
    println!("  Different:       {} {}", summary.different, diff_mark);
    println!("  First only:      {} {}", summary.first_only, first_mark);
    println!("  Second only:     {} {}", summary.second_only, second_mark);
    if !report.exclude_list.is_empty() {
        println!("  Excluded:        {}", report.exclude_list.join(", "));
    }
    println!("{}", "=".repeat(80));
}

fn status_symbol(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Identical => "  ==  ",
        EntryStatus::Different => "  !=  ",
        EntryStatus::FirstOnly => "  <<  ",
        EntryStatus::SecondOnly => "  >>  ",
    }
}

fn status_color(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Identical => "\x1b[32m",  // Green
        EntryStatus::Different => "\x1b[31m",  // Red
        EntryStatus::FirstOnly => "\x1b[33m",  // Yellow
        EntryStatus::SecondOnly => "\x1b[34m", // Blue
    }
}

fn size_column(record: &EntryComparison) -> String {
    format!(
        "{} | {}",
        record.size_first.as_deref().unwrap_or("-"),
        record.size_second.as_deref().unwrap_or("-")
    )
}

#[derive(Serialize)]
struct JsonReport<'a> {
    first_name: &'a str,
    second_name: &'a str,
    summary: ComparisonSummary,
    comparison: BTreeMap<&'a str, &'a EntryComparison>,
    exclude_list: &'a [String],
}

fn build_json_report(report: &ComparisonReport, diff_only: bool) -> JsonReport<'_> {
    let comparison = report
        .comparison
        .iter()
        .filter(|(_, record)| !(diff_only && record.status() == EntryStatus::Identical))
        .map(|(name, record)| (name.as_str(), record))
        .collect();

    JsonReport {
        first_name: &report.first_name,
        second_name: &report.second_name,
        summary: report.comparison.summary(),
        comparison,
        exclude_list: &report.exclude_list,
    }
}

fn is_zip_path(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(".zip"))
        .unwrap_or(false)
}
