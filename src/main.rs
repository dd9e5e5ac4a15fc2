use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use grade_aggregator::generate::{self, GeneratorConfig, SUBJECTS};
use grade_aggregator::{aggregate, error, load, report};

#[derive(Parser)]
#[command(name = "grade-aggregator")]
#[command(about = "Per-student class averages, GPA and class pivots from grade CSVs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a grade CSV into per-record averages and a class pivot
    Aggregate {
        #[arg(long, env = "GRADES_CSV")]
        csv: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write the augmented per-record table as CSV
        #[arg(long)]
        records_out: Option<PathBuf>,
        /// Write the student-by-class pivot as CSV
        #[arg(long)]
        pivot_out: Option<PathBuf>,
    },
    /// Write synthetic grade CSVs, one per subject
    Generate {
        /// Subject to generate; all known subjects when omitted
        #[arg(short, long)]
        subject: Option<String>,
        #[arg(short, long, default_value_t = 100)]
        rows: usize,
        #[arg(short, long, default_value_t = 0)]
        makeups: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Markdown,
    Json,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn write_csv_output<F>(path: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(File) -> error::Result<()>,
{
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write(file).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Table written");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            csv,
            format,
            records_out,
            pivot_out,
        } => {
            let table = load::load_path(&csv)
                .with_context(|| format!("failed to load grades from {}", csv.display()))?;
            let aggregation = aggregate::run(&table)?;

            match format {
                OutputFormat::Table => {
                    println!("{}", report::render_records(&aggregation.records));
                    print!("{}", report::render_pivot(&aggregation.pivot));
                }
                OutputFormat::Markdown => {
                    let source = csv.display().to_string();
                    print!("{}", report::build_report(&source, &aggregation)?);
                }
                OutputFormat::Json => {
                    println!("{}", report::aggregation_json(&aggregation)?);
                }
            }

            if let Some(path) = records_out {
                write_csv_output(&path, |file| {
                    report::write_records_csv(file, &aggregation.records)
                })?;
            }
            if let Some(path) = pivot_out {
                write_csv_output(&path, |file| report::write_pivot_csv(file, &aggregation.pivot))?;
            }
        }
        Commands::Generate {
            subject,
            rows,
            makeups,
            seed,
            out_dir,
        } => {
            let config = GeneratorConfig {
                rows,
                makeups,
                seed,
            };
            let subjects: Vec<String> = match subject {
                Some(s) => vec![s],
                None => SUBJECTS.iter().map(|s| s.to_string()).collect(),
            };

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
            let mut rng = config.rng();
            for subject in &subjects {
                let path = generate::write_subject(&out_dir, subject, &config, &mut rng)?;
                println!("Wrote {}.", path.display());
            }
        }
    }

    Ok(())
}
