//! featbin command-line interface.
//!
//! Examples:
//! - Search bins for a weight curve and print every candidate:
//!   `featbin optimize --input weights.csv --beam 32 --max-bins 8`
//!
//! - Write the 4-bin candidate as a Bin Table for feature `MaxLexEGivenF`:
//!   `featbin optimize --input weights.csv --table MaxLexEGivenF --bins 4 > bins.txt`
//!
//! - Discretize a grammar:
//!   `featbin assign --table bins.txt --mode indicator < grammar > grammar.binned`

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use featbin::microbin::{self, IndicatorNaming, MicrobinTable};
use featbin::optimize::choose_candidate;
use featbin::table::text::write_entries;
use featbin::{
    run_with_threads, AssignConfig, Assigner, BinOptimizer, BinTable, Binning, Boundary,
    FeatureRecord, OptimizerConfig, OutputMode, UnmatchedPolicy, WeightSeries,
};

#[derive(Parser)]
#[command(name = "featbin")]
#[command(about = "Quantize weighted feature curves and discretize feature records")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG applies otherwise.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search piecewise-constant binnings of a `value,weight` series
    Optimize {
        /// Series file (header line, then `value,weight`); stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Hypotheses kept per (index, bin count) state
        #[arg(short = 'k', long, default_value = "10")]
        beam: usize,

        /// Largest bin count searched
        #[arg(short = 'b', long, default_value = "10")]
        max_bins: usize,

        /// Print one `value,weight` line per sample instead of bin ranges
        #[arg(long)]
        per_sample: bool,

        /// Write a Bin Table for this source feature instead of candidates
        #[arg(long)]
        table: Option<String>,

        /// Bin count of the candidate written with --table (default: largest)
        #[arg(long, requires = "table")]
        bins: Option<usize>,

        /// Operators written into the Bin Table
        #[arg(long, default_value = "half-open")]
        boundary: Boundary,

        /// Also write all candidates as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Worker threads (0 = auto, 1 = sequential)
        #[arg(short, long, default_value = "1")]
        threads: usize,
    },

    /// Replace real-valued features with binned destination features
    Assign {
        /// Bin Table file
        #[arg(long)]
        table: PathBuf,

        /// Record file; stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// indicator | real
        #[arg(short, long, default_value = "indicator")]
        mode: OutputMode,

        /// Keep each source feature ahead of its destinations
        #[arg(long)]
        keep_original: bool,

        /// Pass features missing from the table through unchanged
        #[arg(long)]
        allow_unrecognized: bool,

        /// Bin only this feature
        #[arg(long)]
        single_feature: Option<String>,

        /// half-open (low <= x < high) | left-open (low < x <= high)
        #[arg(long, default_value = "half-open")]
        boundary: Boundary,

        /// Values in no bin: die | pass | drop
        #[arg(long, default_value = "die")]
        unmatched: UnmatchedPolicy,

        /// Worker threads (0 = auto, 1 = sequential)
        #[arg(short, long, default_value = "1")]
        threads: usize,

        /// Records per batch
        #[arg(long, default_value = "1024")]
        batch_size: usize,
    },

    /// Turn every feature into an indicator named after its value
    Indicators {
        /// Decimals kept in the indicator name
        #[arg(long, conflicts_with = "microbins", required_unless_present = "microbins")]
        prec: Option<usize>,

        /// Snap values to the floor of these microbins instead
        #[arg(long)]
        microbins: Option<PathBuf>,
    },

    /// Resample observed values into microbins under each macrobin
    Microbins {
        /// Macrobin series (header line, then `low,weight`)
        #[arg(long)]
        macrobins: PathBuf,

        /// Observed values (header line, then one value per line)
        #[arg(long)]
        values: PathBuf,

        /// Microbins per macrobin
        #[arg(long)]
        per_bin: usize,
    },

    /// Print `value,weight` for each value on stdin using a microbin file
    Lookup {
        /// Microbin series (header line, then `value,weight`)
        #[arg(long)]
        bins: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Optimize {
            input,
            beam,
            max_bins,
            per_sample,
            table,
            bins,
            boundary,
            report,
            threads,
        } => cmd_optimize(OptimizeArgs {
            input,
            beam,
            max_bins,
            per_sample,
            table,
            bins,
            boundary,
            report,
            threads,
        }),
        Commands::Assign {
            table,
            input,
            mode,
            keep_original,
            allow_unrecognized,
            single_feature,
            boundary,
            unmatched,
            threads,
            batch_size,
        } => {
            let table = BinTable::from_file(&table)
                .with_context(|| format!("failed to read bin table {}", table.display()))?;
            info!(
                features = table.num_features(),
                entries = table.num_entries(),
                "loaded bin table"
            );
            run_with_threads(threads, |parallelism| -> Result<()> {
                let config = AssignConfig::builder()
                    .mode(mode)
                    .keep_original(keep_original)
                    .allow_unrecognized(allow_unrecognized)
                    .maybe_single_feature(single_feature)
                    .boundary(boundary)
                    .unmatched(unmatched)
                    .parallelism(parallelism)
                    .batch_size(batch_size)
                    .build()?;
                let assigner = Assigner::new(table, config)?;
                let stats = assigner.process(open_input(input.as_deref())?, stdout())?;
                info!(?stats, "done");
                Ok(())
            })
            .context("failed to build thread pool")?
        }
        Commands::Indicators { prec, microbins } => {
            let naming = match (prec, microbins) {
                (Some(prec), _) => IndicatorNaming::Precision(prec),
                (None, Some(path)) => IndicatorNaming::Microbins(
                    MicrobinTable::from_file(&path)
                        .with_context(|| format!("failed to read microbins {}", path.display()))?,
                ),
                (None, None) => bail!("one of --prec or --microbins is required"),
            };
            cmd_indicators(&naming)
        }
        Commands::Microbins {
            macrobins,
            values,
            per_bin,
        } => cmd_microbins(&macrobins, &values, per_bin),
        Commands::Lookup { bins } => cmd_lookup(&bins),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn stdout() -> BufWriter<io::StdoutLock<'static>> {
    BufWriter::new(io::stdout().lock())
}

// =============================================================================
// optimize
// =============================================================================

struct OptimizeArgs {
    input: Option<PathBuf>,
    beam: usize,
    max_bins: usize,
    per_sample: bool,
    table: Option<String>,
    bins: Option<usize>,
    boundary: Boundary,
    report: Option<PathBuf>,
    threads: usize,
}

fn cmd_optimize(args: OptimizeArgs) -> Result<()> {
    let series = WeightSeries::from_reader(open_input(args.input.as_deref())?)
        .context("failed to read weight series")?;
    info!(samples = series.len(), "loaded series");

    let candidates = run_with_threads(args.threads, |parallelism| -> Result<Vec<Binning>> {
        let config = OptimizerConfig::builder()
            .beam_width(args.beam)
            .max_bins(args.max_bins)
            .parallelism(parallelism)
            .build()?;
        Ok(BinOptimizer::new(config).optimize_series(&series))
    })
    .context("failed to build thread pool")??;

    if candidates.is_empty() {
        warn!("empty series, no bins");
    }

    if let Some(path) = &args.report {
        let file = File::create(path)
            .with_context(|| format!("failed to create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &candidates)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }

    let mut out = stdout();

    if let Some(source) = &args.table {
        let Some(chosen) = choose_candidate(&candidates, args.bins) else {
            bail!("no candidate with the requested bin count");
        };
        let entries = chosen
            .to_table_entries(&series, source)
            .context("cannot write a Bin Table for this series")?;
        write_entries(source, &entries, args.boundary, &mut out)?;
        return Ok(());
    }

    for candidate in &candidates {
        writeln!(
            out,
            "Bin Count: {}; Final cost: {}",
            candidate.num_bins(),
            candidate.cost()
        )?;
        let ranges = match candidate.collapse(&series) {
            Ok(ranges) if !args.per_sample => Some(ranges),
            Ok(_) => None,
            Err(err) => {
                warn!(bins = candidate.num_bins(), error = %err, "printing per-sample weights");
                None
            }
        };
        match ranges {
            Some(ranges) => {
                for range in ranges {
                    writeln!(out, "{} {} {}", range.low, range.high, range.weight)?;
                }
            }
            None => {
                if let Some(header) = series.header() {
                    writeln!(out, "{header}")?;
                }
                for sample in candidate.binned_series(&series)? {
                    writeln!(out, "{},{}", sample.value, sample.weight)?;
                }
            }
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

// =============================================================================
// indicators / microbins / lookup
// =============================================================================

fn cmd_indicators(naming: &IndicatorNaming) -> Result<()> {
    let mut out = stdout();
    for (idx, line) in io::stdin().lock().lines().enumerate() {
        let line = line?;
        match FeatureRecord::parse(&line) {
            Ok(record) => writeln!(out, "{}", microbin::reals_to_indicators(&record, naming))?,
            Err(err) => warn!(line = idx + 1, error = %err, "skipping malformed record"),
        }
    }
    out.flush()?;
    Ok(())
}

fn cmd_microbins(macrobins: &Path, values: &Path, per_bin: usize) -> Result<()> {
    let macrobins = WeightSeries::from_file(macrobins)
        .with_context(|| format!("failed to read macrobins {}", macrobins.display()))?;
    let file = File::open(values).with_context(|| format!("failed to open {}", values.display()))?;
    let values = microbin::read_values(BufReader::new(file)).context("failed to read values")?;

    let mut out = stdout();
    let written = microbin::write_microbins(&macrobins, &values, per_bin, &mut out)?;
    out.flush()?;
    info!(microbins = written, "wrote microbins");
    Ok(())
}

fn cmd_lookup(bins: &Path) -> Result<()> {
    let series = WeightSeries::from_file(bins)
        .with_context(|| format!("failed to read microbins {}", bins.display()))?;
    let table = MicrobinTable::from_series(&series);
    if table.is_empty() {
        bail!("{} has no microbins", bins.display());
    }

    let mut out = stdout();
    microbin::write_lookups(&table, series.header(), io::stdin().lock(), &mut out)
        .context("failed to look up values")?;
    out.flush()?;
    Ok(())
}
