mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "verdict-cli")]
#[command(about = "Verdict CLI - Run submissions against test cases locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a source file against a JSON tests file
    Run {
        /// Source file (.js or .py)
        #[arg(short, long)]
        source: PathBuf,

        /// Tests file: a list of cases or {"function_name", "test_cases"}
        #[arg(short, long)]
        tests: PathBuf,

        /// Function to call (defaults to the tests file, then "solution")
        #[arg(short, long)]
        function: Option<String>,

        /// Language identifier (inferred from the source extension when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Time budget in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the raw JSON result
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List configured languages
    Languages {
        /// Path to languages.json
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            tests,
            function,
            language,
            timeout_ms,
            json,
        } => {
            let all_passed = commands::run_tests(commands::RunOptions {
                source: &source,
                tests: &tests,
                function: function.as_deref(),
                language: language.as_deref(),
                timeout_ms,
                json,
            })
            .await?;

            if !all_passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Languages { config } => {
            commands::list_languages(config.as_deref())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
