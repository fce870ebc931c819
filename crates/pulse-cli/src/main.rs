use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use pulse_lib::{
    config::PulseConfig,
    detectors::adaptive::run_pipeline,
    io::{load_samples, text as text_io},
    metrics::hrv::hrv_time,
    report::Document,
    segment::run_segmentwise,
    signal::{RRSeries, TimeSeries},
};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "pulse",
    version,
    about = "pulse: adaptive-threshold heartbeat detection and HRV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where samples come from and how the detector is tuned.
#[derive(Args)]
struct SourceArgs {
    /// Sample rate in Hz
    #[arg(long)]
    fs: f64,
    /// Newline-delimited samples, or a CSV/TSV file with --column; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// Column name to read from a CSV/TSV input
    #[arg(long)]
    column: Option<String>,
    /// TOML file with [detector] and [segment] tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fixed margin percentage; skips the margin search
    #[arg(long)]
    margin: Option<f64>,
    #[arg(long)]
    bpm_min: Option<f64>,
    #[arg(long)]
    bpm_max: Option<f64>,
    /// Rolling mean window (seconds)
    #[arg(long)]
    window_s: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect beats and write corrected intervals plus time-domain HRV
    Detect {
        #[command(flatten)]
        source: SourceArgs,
        /// Interchange document path; printed to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the full pipeline result instead of the interchange document
        #[arg(long)]
        raw: bool,
    },
    /// Run detection over fixed-width windows of the recording
    Segmentwise {
        #[command(flatten)]
        source: SourceArgs,
        /// Segment width (seconds)
        #[arg(long)]
        width_s: Option<f64>,
        /// Fraction of overlap between consecutive segments
        #[arg(long)]
        overlap: Option<f64>,
        /// Minimum trailing segment (seconds)
        #[arg(long)]
        min_size_s: Option<f64>,
    },
    /// Compute time-domain HRV from newline-delimited intervals (milliseconds)
    HrvTime {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Compare the measures of two interchange documents
    Compare {
        left: PathBuf,
        right: PathBuf,
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect { source, out, raw } => cmd_detect(&source, out.as_deref(), raw)?,
        Commands::Segmentwise {
            source,
            width_s,
            overlap,
            min_size_s,
        } => cmd_segmentwise(&source, width_s, overlap, min_size_s)?,
        Commands::HrvTime { input } => cmd_hrv_time(input.as_deref())?,
        Commands::Compare {
            left,
            right,
            tolerance,
        } => cmd_compare(&left, &right, tolerance)?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>, column: Option<&str>) -> Result<Vec<f64>> {
    match input {
        Some(path) => load_samples(path, column),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf).context("parsing samples from stdin")
        }
    }
}

fn source_label(input: Option<&Path>) -> String {
    input
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".into())
}

fn load_config(source: &SourceArgs) -> Result<PulseConfig> {
    let mut cfg = match &source.config {
        Some(path) => PulseConfig::load(path)?,
        None => PulseConfig::default(),
    };
    let det = &mut cfg.detector;
    if source.margin.is_some() {
        det.margin = source.margin;
    }
    if let Some(v) = source.bpm_min {
        det.bpm_min = v;
    }
    if let Some(v) = source.bpm_max {
        det.bpm_max = v;
    }
    if let Some(v) = source.window_s {
        det.window_s = v;
    }
    Ok(cfg)
}

fn load_time_series(source: &SourceArgs) -> Result<TimeSeries> {
    let data = read_samples(source.input.as_deref(), source.column.as_deref())?;
    Ok(TimeSeries::new(source.fs, data))
}

fn cmd_detect(source: &SourceArgs, out: Option<&Path>, raw: bool) -> Result<()> {
    let cfg = load_config(source)?;
    let ts = load_time_series(source)?;
    let result = run_pipeline(&ts, &cfg.detector).with_context(|| {
        format!(
            "detecting beats in {} ({} samples at {} Hz)",
            source_label(source.input.as_deref()),
            ts.len(),
            ts.fs
        )
    })?;

    if raw {
        println!("{}", serde_json::to_string(&result)?);
        return Ok(());
    }
    let doc = Document::from_result(&result);
    match out {
        Some(path) => {
            doc.write_atomic(path)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => println!("{}", doc.to_json_string()?),
    }
    Ok(())
}

fn cmd_segmentwise(
    source: &SourceArgs,
    width_s: Option<f64>,
    overlap: Option<f64>,
    min_size_s: Option<f64>,
) -> Result<()> {
    let mut cfg = load_config(source)?;
    if let Some(v) = width_s {
        cfg.segment.width_s = v;
    }
    if let Some(v) = overlap {
        cfg.segment.overlap = v;
    }
    if let Some(v) = min_size_s {
        cfg.segment.min_size_s = v;
    }
    let ts = load_time_series(source)?;
    let summary = run_segmentwise(&ts, &cfg.detector, &cfg.segment).with_context(|| {
        format!(
            "segmenting {} at {} Hz",
            source_label(source.input.as_deref()),
            ts.fs
        )
    })?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_hrv_time(input: Option<&Path>) -> Result<()> {
    let rr = RRSeries {
        rr: read_samples(input, None)?,
    };
    let Some(m) = hrv_time(&rr) else {
        bail!("need at least two intervals, got {}", rr.len());
    };
    println!("{}", serde_json::to_string(&m)?);
    Ok(())
}

fn cmd_compare(left: &Path, right: &Path, tolerance: f64) -> Result<()> {
    let a = Document::read(left).with_context(|| format!("reading {}", left.display()))?;
    let b = Document::read(right).with_context(|| format!("reading {}", right.display()))?;
    let cmp = a.compare(&b, tolerance);
    println!("{}", serde_json::to_string(&cmp)?);
    if !cmp.is_match() {
        bail!(
            "documents differ: {} changed, {} only in {}, {} only in {}",
            cmp.different.len(),
            cmp.only_in_self.len(),
            left.display(),
            cmp.only_in_other.len(),
            right.display()
        );
    }
    Ok(())
}
