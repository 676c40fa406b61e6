use clap::{Parser, Subcommand};
use std::path::PathBuf;
use student_profile_engine::engine::{count_types, read_types};
use student_profile_engine::utils::format_number;
use student_profile_engine::{
    load_dataset, Dimension, PipelineConfig, ProfileEngine, Statistics, Strategy, StudentType,
    DEFAULT_OUTPUT, TYPE_COLUMN,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "student-profile-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Builds four-dimension student profiles and student types from survey records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score and classify a cohort, writing the profile table
    Profile {
        /// Path to the survey file (csv, tsv, txt, json or spreadsheet)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (csv, tsv or json)
        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Classification strategy
        #[arg(short, long, value_enum, default_value_t = Strategy::Threshold)]
        strategy: Strategy,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// K-means seed (overrides the configuration)
        #[arg(long)]
        seed: Option<u64>,

        /// K-means restarts (overrides the configuration)
        #[arg(long)]
        n_init: Option<usize>,
    },

    /// Print dimension statistics and the type distribution of a profile table
    Summary {
        /// Path to a profile table written by `profile`
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("student_profile_engine=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile {
            input,
            output,
            strategy,
            config,
            seed,
            n_init,
        } => {
            let mut pipeline = match config {
                Some(path) => PipelineConfig::from_json_file(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(seed) = seed {
                pipeline.clustering.seed = seed;
            }
            if let Some(n_init) = n_init {
                pipeline.clustering.n_init = n_init;
            }

            let engine = ProfileEngine::with_config(pipeline, strategy);
            let run = engine.run_to_file(&input, &output)?;

            println!(
                "Profiled {} students from {} ({} dropped)",
                run.profiles.len(),
                input.display(),
                run.dropped()
            );
            if !run.schema_gaps.is_empty() {
                println!("Missing dimensions: {:?}", run.schema_gaps);
            }
            print_distribution(&run.type_counts);
            println!("Saved profiles to {}", output.display());
        }

        Commands::Summary { input } => {
            let profiles = load_dataset(&input)?;
            println!("Loaded {} profiles from {}", profiles.len(), input.display());

            for dim in Dimension::ALL {
                match Statistics::compute(&profiles, dim.column_name()) {
                    Some(stats) => print_stats(dim, &stats),
                    None => println!("\n{}: no scores", dim),
                }
            }

            if profiles.has_column(TYPE_COLUMN) {
                print_distribution(&count_types(&read_types(&profiles)));
            } else {
                println!("\nNo '{}' column, run `profile` first", TYPE_COLUMN);
            }
        }
    }

    Ok(())
}

fn print_stats(dim: Dimension, stats: &Statistics) {
    println!("\n=== {} ({}) ===", dim, dim.column_name());
    println!("Count:   {}", stats.count);
    println!("Missing: {}", stats.missing);
    println!("Mean:    {:.2}", stats.mean);
    println!("Median:  {}", format_number(stats.median));
    println!("Min:     {}", format_number(stats.min));
    println!("Max:     {}", format_number(stats.max));
}

fn print_distribution(counts: &std::collections::BTreeMap<StudentType, usize>) {
    let total: usize = counts.values().sum();
    println!("\n=== Student types ===");
    for student_type in StudentType::ALL {
        let count = counts.get(&student_type).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        println!(
            "{:<6} {:<14} {:>6} ({:.1}%)",
            student_type.label(),
            student_type.english_name(),
            count,
            count as f64 / total as f64 * 100.0
        );
    }
}
