// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Meshbench CLI

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use meshbench::evaluation::{EvaluationReport, Evaluator, Reporter};
use meshbench::io::{load_progressive, StepPolicy};
use meshbench::{DistanceStrategy, EvaluationConfig, ReferenceCatalog};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "meshbench")]
#[command(about = "Rate/quality evaluation of progressive mesh streams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to meshbench.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every step of a stream against a reference model
    Evaluate {
        /// Progressive stream file
        stream: PathBuf,

        /// Reference model id
        #[arg(short, long)]
        reference: String,

        /// Accuracy quantile, in (0, 1]
        #[arg(long)]
        quantile: Option<f64>,

        /// Completeness threshold as a fraction of the reference diagonal
        #[arg(long)]
        ratio: Option<f64>,

        /// Distance kernel
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Directory holding the reference OBJ files
        #[arg(long, value_name = "DIR")]
        references: Option<PathBuf>,

        /// Output directory for reports
        #[arg(short, long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// List the steps of a stream
    Inspect {
        /// Progressive stream file
        stream: PathBuf,
    },

    /// List the reference catalog
    References {
        /// Build the catalog from the OBJ files under a directory instead
        #[arg(long, value_name = "DIR")]
        discover: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Nearest vertex
    Vertex,
    /// Closest point on the nearest triangle
    Triangle,
}

impl From<StrategyArg> for DistanceStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Vertex => DistanceStrategy::VertexToVertex,
            StrategyArg::Triangle => DistanceStrategy::PointToTriangle,
        }
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "meshbench=info",
            2 => "meshbench=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EvaluationConfig> {
    match path {
        Some(path) => EvaluationConfig::from_file(path)?.with_env_overrides(),
        None => EvaluationConfig::load(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Evaluate {
            ref stream,
            ref reference,
            quantile,
            ratio,
            strategy,
            ref references,
            ref out,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(quantile) = quantile {
                config.accuracy_quantile = quantile;
            }
            if let Some(ratio) = ratio {
                config.completeness_ratio = ratio;
            }
            if let Some(strategy) = strategy {
                config.strategy = strategy.into();
            }
            if let Some(dir) = references {
                config.catalog.root = dir.clone();
            }
            if let Some(dir) = out {
                config.output_dir = dir.clone();
            }
            config.validate()?;

            evaluate_command(stream, reference, config, cli.quiet)
        }
        Commands::Inspect { ref stream } => inspect_command(stream),
        Commands::References { ref discover } => {
            let catalog = match discover {
                Some(dir) => ReferenceCatalog::discover(dir)?,
                None => load_config(cli.config.as_deref())?.catalog,
            };
            references_command(&catalog);
            Ok(())
        }
    }
}

fn evaluate_command(
    stream_path: &Path,
    reference_id: &str,
    config: EvaluationConfig,
    quiet: bool,
) -> Result<()> {
    let reference = config
        .catalog
        .load(reference_id)
        .with_context(|| format!("Failed to load reference '{}'", reference_id))?;
    let stream = load_progressive(stream_path)
        .with_context(|| format!("Failed to parse {}", stream_path.display()))?;

    let progress = if quiet || stream.steps().is_empty() {
        None
    } else {
        let pb = ProgressBar::new(stream.steps().len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let evaluator = Evaluator::new(config);
    let evaluation = evaluator.evaluate_with_progress(&stream, &reference, |_| {
        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    })?;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report =
        EvaluationReport::for_file(stream_path, reference_id, evaluator.config(), &evaluation)?;
    let (json_path, md_path) = Reporter::write_all(&report, &evaluator.config().output_dir)?;

    // Print summary
    println!("\n{}", "═".repeat(80).bright_black());
    println!(
        "{} {} {} {}",
        "Evaluation of".bold(),
        report.candidate.cyan(),
        "against".bold(),
        report.reference.cyan()
    );
    println!("{}", "═".repeat(80).bright_black());
    println!(
        "  {} {}",
        "Steps:".bright_black(),
        report.steps.len().to_string().cyan()
    );
    println!(
        "  {} {} (declared {})",
        "Size:".bright_black(),
        report.actual_size.to_string().cyan(),
        report.declared_size
    );

    match report.final_step() {
        Some(last) => {
            println!(
                "  {} {}",
                "Hausdorff:".bright_black(),
                format!("{:.6}", last.hausdorff).yellow()
            );
            println!(
                "  {} {}",
                "Accuracy:".bright_black(),
                format!("{:.6}", last.accuracy).yellow()
            );
            let completeness = format!("{:.2}%", last.completeness * 100.0);
            println!(
                "  {} {}",
                "Completeness:".bright_black(),
                if last.completeness >= 1.0 {
                    completeness.green()
                } else {
                    completeness.yellow()
                }
            );
        }
        None => println!("  {}", "The stream produced no steps".red()),
    }

    println!("\n{}", "Reports:".bold());
    println!("  JSON:     {}", json_path.display().to_string().bright_blue());
    println!("  Markdown: {}", md_path.display().to_string().bright_blue());

    Ok(())
}

fn inspect_command(stream_path: &Path) -> Result<()> {
    let stream = load_progressive(stream_path)
        .with_context(|| format!("Failed to parse {}", stream_path.display()))?;

    let policy = match stream.policy() {
        StepPolicy::Markers => "step markers".to_string(),
        StepPolicy::LineCheckpoints { interval } => {
            format!("line checkpoints every {} lines", interval)
        }
    };

    println!("{} {}", "Stream:".bold(), stream_path.display());
    println!("  {} {}", "Lines:".bright_black(), stream.line_count());
    println!("  {} {}", "Steps:".bright_black(), policy);
    println!(
        "  {} {} (declared {})",
        "Size:".bright_black(),
        stream.actual_size(),
        stream.declared_size()
    );
    println!(
        "  {} {} vertices, {} faces ({} visible)",
        "Final mesh:".bright_black(),
        stream.mesh().vertex_count(),
        stream.mesh().face_count(),
        stream.mesh().visible_face_count()
    );

    if stream.steps().is_empty() {
        println!("\n{}", "No steps".red());
        return Ok(());
    }

    println!(
        "\n  {:>5}  {:>8}  {:>10}  {:>8}  {:>9}  {:>8}",
        "step", "line", "size", "position", "vertices", "faces"
    );
    for step in stream.steps() {
        println!(
            "  {:>5}  {:>8}  {:>10}  {:>8.4}  {:>9}  {:>8}",
            step.ordinal,
            step.line,
            step.encoded_size,
            step.relative_position,
            step.vertices.len(),
            step.faces.len()
        );
    }

    Ok(())
}

fn references_command(catalog: &ReferenceCatalog) {
    println!(
        "{} {} ({} models)",
        "Reference catalog:".bold(),
        catalog.root.display(),
        catalog.len()
    );

    for (id, model) in &catalog.models {
        let watertight = if model.watertight {
            "watertight".green()
        } else {
            "open".yellow()
        };
        println!(
            "  {:<12} {:<20} {:>7} vertices {:>7} faces  {}  manifoldness {}",
            id.cyan(),
            model.file.display(),
            model.vertices,
            model.faces,
            watertight,
            model.manifoldness
        );
    }
}
