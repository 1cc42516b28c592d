//! Attendance reconciliation CLI
//!
//! Command-line tool for merging attendance exports and matching deletion
//! records to the entries they remove.

use attn_core::{
    export_to_file, merge_files, parse_file, reconcile, scan_directory, CellFormatter,
    ColumnResolver, ColumnRole, Config, Diagnostic, ExportOptions, MergeOutcome, Reconciliation,
    ReconcileStatus, Table,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "attn-cli")]
#[command(about = "Merge attendance exports and analyse deletion records", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON); built-in synonyms are used when absent
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge several exports into one table sorted by subject-id
    Merge {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Annotate a merged table with deletion/entry matches
    Reconcile {
        /// Merged table to analyse
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Merge, then reconcile the merged table
    Run {
        #[command(flatten)]
        sources: SourceArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show which header each column role resolves to
    Columns {
        /// Path to CSV or spreadsheet file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Parse and display a single file
    Show {
        /// Path to CSV or spreadsheet file
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Write the default configuration as a starting point
    InitConfig {
        /// Output path for the configuration file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Source files, merged in the order given
    #[arg(short, long, required_unless_present = "root", conflicts_with = "root")]
    input: Vec<PathBuf>,

    /// Directories to scan for .csv/.tsv/.txt and .xlsx/.xls/.ods exports
    #[arg(short, long)]
    root: Vec<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Output format (csv or json)
    #[arg(long, default_value = "csv")]
    format: String,

    /// Prepend a row-number column
    #[arg(long)]
    row_numbers: bool,
}

impl OutputArgs {
    fn options(&self) -> attn_core::Result<ExportOptions> {
        Ok(ExportOptions {
            format: self.format.parse()?,
            row_numbers: self.row_numbers,
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the `-v` level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,attn_core={level},attn_cli={level}",
            level = level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> attn_core::Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            tracing::info!(path = %path.display(), locale = ?config.locale, "loaded configuration");
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Merge { sources, output } => cmd_merge(&sources, &output, &config),
        Commands::Reconcile { input, output } => cmd_reconcile(&input, &output, &config),
        Commands::Run { sources, output } => cmd_run(&sources, &output, &config),
        Commands::Columns { input } => cmd_columns(&input, &config),
        Commands::Show { input, limit } => cmd_show(&input, limit, &config),
        Commands::InitConfig { output } => cmd_init_config(&output),
    }
}

fn cmd_merge(sources: &SourceArgs, output: &OutputArgs, config: &Config) -> attn_core::Result<()> {
    let options = output.options()?;
    let merged = merge_sources(sources, config)?;

    export_to_file(&merged.table, &output.output, options, config)?;
    println!(
        "Merged {} rows into {}",
        merged.table.row_count(),
        output.output.display()
    );

    Ok(())
}

fn cmd_reconcile(input: &Path, output: &OutputArgs, config: &Config) -> attn_core::Result<()> {
    let options = output.options()?;
    let table = parse_file(input)?;
    let result = reconcile(&table, config)?;

    export_to_file(&result.table, &output.output, options, config)?;
    report_reconciliation(&result, &output.output);

    Ok(())
}

fn cmd_run(sources: &SourceArgs, output: &OutputArgs, config: &Config) -> attn_core::Result<()> {
    let options = output.options()?;
    let merged = merge_sources(sources, config)?;
    println!("Merged {} rows", merged.table.row_count());

    let result = reconcile(&merged.table, config)?;
    export_to_file(&result.table, &output.output, options, config)?;
    report_reconciliation(&result, &output.output);

    Ok(())
}

fn cmd_columns(input: &Path, config: &Config) -> attn_core::Result<()> {
    let table = parse_file(input)?;
    let resolver = ColumnResolver::new(&config.columns, config.locale);

    println!("File: {}", input.display());
    println!();
    for role in ColumnRole::ALL {
        let required = if ColumnRole::REQUIRED.contains(&role) {
            " (required)"
        } else {
            ""
        };
        match resolver.find(&table.headers, role) {
            Some(idx) => println!("  {:<12} -> [{}] {}", role.as_str(), idx, table.headers[idx]),
            None => println!("  {:<12} -> not found{}", role.as_str(), required),
        }
    }

    Ok(())
}

fn cmd_show(input: &Path, limit: Option<usize>, config: &Config) -> attn_core::Result<()> {
    let table = parse_file(input)?;

    println!("File: {}", input.display());
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();
    print_table(&table, limit.unwrap_or(table.row_count()), config);

    Ok(())
}

fn cmd_init_config(output: &Path) -> attn_core::Result<()> {
    Config::default().save(output)?;
    println!("Created configuration file: {}", output.display());
    println!();
    println!("Edit the synonym and keyword lists, then pass it with:");
    println!("  attn-cli --config {} run --root <dir> --output <file>", output.display());

    Ok(())
}

/// Resolve explicit files or scanned roots to a merged table
fn merge_sources(sources: &SourceArgs, config: &Config) -> attn_core::Result<MergeOutcome> {
    let files = if sources.input.is_empty() {
        let scan = scan_directory(&sources.root)?;
        println!(
            "Found {} source file(s) in {} root(s)",
            scan.total_files(),
            scan.roots.len()
        );
        scan.sources
    } else {
        sources.input.clone()
    };

    let merged = merge_files(&files, config)?;
    print_diagnostics(&merged.diagnostics);
    Ok(merged)
}

fn report_reconciliation(result: &Reconciliation, output: &Path) {
    print_diagnostics(&result.diagnostics);

    match &result.status {
        ReconcileStatus::Completed(summary) => {
            println!("Reconciliation complete:");
            println!("  {} rows", summary.rows);
            println!(
                "  {} entries, {} exits, {} deletions",
                summary.entries, summary.exits, summary.deletions
            );
            println!(
                "  {} deletions matched, {} unmatched",
                summary.matched, summary.unmatched
            );
            if summary.ungrouped > 0 {
                println!("  {} rows without subject-id or readable date", summary.ungrouped);
            }
        }
        ReconcileStatus::Failed { missing } => {
            let names: Vec<&str> = missing.iter().map(|r| r.as_str()).collect();
            println!("Reconciliation not performed; missing: {}", names.join(", "));
        }
    }

    println!("Wrote {} rows to {}", result.table.row_count(), output.display());
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!("Warnings ({}):", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  - {}", diagnostic);
    }
}

fn print_table(table: &Table, limit: usize, config: &Config) {
    let formatter = CellFormatter::new(&table.headers, config);
    println!("{}", table.headers.join("\t"));
    println!("{}", "-".repeat(table.column_count() * 12));

    for row in table.rows.iter().take(limit) {
        let values: Vec<String> = row
            .cells
            .iter()
            .enumerate()
            .map(|(col, cell)| formatter.format(col, cell))
            .collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > limit {
        println!("... ({} more rows)", table.row_count() - limit);
    }
}
