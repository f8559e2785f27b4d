//! Linkrank CLI: runs rank propagation jobs over text link graphs

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use linkrank::{
    read_ranking, JobConfig, JobError, JobOutcome, JobReport, RankJob, RankedVertex, SeedBuilder,
    DEFAULT_TOP_N,
};
use tracing_subscriber::EnvFilter;

/// Exit code for bad arguments or configuration (clap uses the same)
const EXIT_USAGE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "linkrank", version, about = "Iterative link-graph rank propagation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run rank propagation until convergence or the round budget
    Run {
        /// Seed file or directory of part files
        input: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Maximum number of rounds
        max_iterations: Option<usize>,

        /// YAML job config; flags and arguments override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Shuffle partitions
        #[arg(long)]
        partitions: Option<usize>,

        /// Dedicated worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Only write the final output, not every round
        #[arg(long)]
        no_iterations: bool,

        /// Replace an existing output directory
        #[arg(long)]
        overwrite: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Build a seed file from vertex and edge listings
    Seed {
        /// Vertex listing (id<TAB>title)
        #[arg(long)]
        vertices: Option<PathBuf>,

        /// Edge listing (source<TAB>target)
        #[arg(long)]
        edges: PathBuf,

        /// Seed file to write
        output: PathBuf,
    },
    /// Show the highest-ranked vertices of a result
    Top {
        /// Result file or directory
        path: PathBuf,

        /// Number of vertices
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        count: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            output,
            max_iterations,
            config,
            partitions,
            threads,
            no_iterations,
            overwrite,
            format,
        } => {
            let settings = RunSettings {
                input,
                output,
                max_iterations,
                config,
                partitions,
                threads,
                no_iterations,
                overwrite,
            };
            run_job(settings, format)
        }
        Commands::Seed {
            vertices,
            edges,
            output,
        } => run_seed(vertices.as_deref(), &edges, &output),
        Commands::Top {
            path,
            count,
            format,
        } => run_top(&path, count, format),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(error_exit_code(&e));
        }
    }
}

/// Exit code of a job that ran to a terminal state
fn outcome_exit_code(outcome: JobOutcome) -> i32 {
    if outcome.is_success() {
        0
    } else {
        1
    }
}

fn error_exit_code(error: &JobError) -> i32 {
    match error {
        JobError::Configuration(_) => EXIT_USAGE,
        _ => 1,
    }
}

struct RunSettings {
    input: PathBuf,
    output: PathBuf,
    max_iterations: Option<usize>,
    config: Option<PathBuf>,
    partitions: Option<usize>,
    threads: Option<usize>,
    no_iterations: bool,
    overwrite: bool,
}

impl RunSettings {
    fn into_config(self) -> Result<JobConfig, JobError> {
        let mut config = match &self.config {
            Some(path) => JobConfig::from_yaml_file(path)?,
            None => JobConfig::default(),
        };

        config.input = self.input;
        config.output = self.output;
        if let Some(max_rounds) = self.max_iterations {
            config.max_rounds = max_rounds;
        }
        if let Some(partitions) = self.partitions {
            config.partitions = partitions;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if self.no_iterations {
            config.write_iterations = false;
        }
        if self.overwrite {
            config.overwrite = true;
        }
        Ok(config)
    }
}

fn run_job(settings: RunSettings, format: OutputFormat) -> Result<i32, JobError> {
    let job = RankJob::new(settings.into_config()?)?;
    let report = job.run()?;

    print_report(&report, format)?;

    Ok(outcome_exit_code(report.outcome))
}

fn print_report(report: &JobReport, format: OutputFormat) -> Result<(), JobError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Csv => {
            println!("outcome,rounds,round_reached,vertices,input_records,skipped_lines");
            println!(
                "{},{},{},{},{},{}",
                report.outcome,
                report.rounds,
                report.round_reached,
                report.vertices,
                report.input_records,
                report.skipped_lines
            );
        }
        OutputFormat::Table => {
            println!("Outcome:        {}", report.outcome);
            println!("Rounds:         {}", report.rounds);
            println!("Vertices:       {}", report.vertices);
            println!("Seed records:   {}", report.input_records);
            println!("Skipped lines:  {}", report.skipped_lines);
            println!(
                "Changed/round:  {}",
                report
                    .changed_history
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            if let Some(dir) = &report.final_output {
                println!("Final output:   {}", dir.display());
            }
            if let Some(failure) = &report.failure {
                println!("Failure:        {}", failure);
            }
        }
    }
    Ok(())
}

fn run_seed(vertices: Option<&Path>, edges: &Path, output: &Path) -> Result<i32, JobError> {
    let mut builder = SeedBuilder::new();
    if let Some(vertices) = vertices {
        builder.load_vertices(vertices)?;
    }
    builder.load_edges(edges)?;
    let written = builder.write(output)?;

    println!(
        "Wrote {} seed records to {} ({} line(s) skipped)",
        written,
        output.display(),
        builder.skipped()
    );
    Ok(0)
}

fn run_top(path: &Path, count: usize, format: OutputFormat) -> Result<i32, JobError> {
    let ranking = read_ranking(path, count)?;
    print_ranking(&ranking, format)?;
    Ok(0)
}

fn print_ranking(ranking: &[RankedVertex], format: OutputFormat) -> Result<(), JobError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(ranking)?);
        }
        OutputFormat::Csv => {
            println!("position,id,rank,out_degree");
            for row in ranking {
                println!(
                    "{},{},{:.6},{}",
                    row.position,
                    format_csv_value(&row.id),
                    row.rank,
                    row.out_degree
                );
            }
        }
        OutputFormat::Table => {
            if ranking.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "id", "rank", "out-degree"]);

            for row in ranking {
                table.add_row(vec![
                    row.position.to_string(),
                    row.id.clone(),
                    format!("{:.6}", row.rank),
                    row.out_degree.to_string(),
                ]);
            }

            println!("{}", table);
            println!("{} row(s)", ranking.len());
        }
    }
    Ok(())
}

fn format_csv_value(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkrank::ConfigurationError;

    fn settings(max_iterations: Option<usize>) -> RunSettings {
        RunSettings {
            input: PathBuf::from("missing-seed.txt"),
            output: PathBuf::from("missing-out"),
            max_iterations,
            config: None,
            partitions: None,
            threads: None,
            no_iterations: false,
            overwrite: false,
        }
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(outcome_exit_code(JobOutcome::Converged), 0);
        assert_eq!(outcome_exit_code(JobOutcome::MaxRoundsReached), 0);
        assert_eq!(outcome_exit_code(JobOutcome::Failed), 1);
    }

    #[test]
    fn test_error_exit_codes() {
        let config = JobError::Configuration(ConfigurationError::InvalidMaxRounds(0));
        assert_eq!(error_exit_code(&config), EXIT_USAGE);

        let io = JobError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(error_exit_code(&io), 1);
    }

    #[test]
    fn test_zero_max_iterations_is_a_usage_error() {
        let err = run_job(settings(Some(0)), OutputFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            JobError::Configuration(ConfigurationError::InvalidMaxRounds(0))
        ));
        assert_eq!(error_exit_code(&err), EXIT_USAGE);
    }

    #[test]
    fn test_bad_arguments_exit_with_usage_code() {
        let err = Cli::try_parse_from(["linkrank", "run", "seed.txt"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);

        let err = Cli::try_parse_from(["linkrank", "run", "in", "out", "many"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn test_format_only_on_commands_that_print_results() {
        let cli = Cli::try_parse_from(["linkrank", "top", "out/final", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Top {
                format: OutputFormat::Json,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["linkrank", "run", "in", "out", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                format: OutputFormat::Table,
                max_iterations: Some(3),
                ..
            }
        ));

        assert!(Cli::try_parse_from([
            "linkrank", "seed", "--edges", "edges.txt", "seed.txt", "--format", "json"
        ])
        .is_err());
    }
}
