use clap::{Parser, Subcommand, ValueEnum};
use shellprobe::case::Target;
use shellprobe::catalog;
use shellprobe::config::{HarnessConfig, generate_schema};
use shellprobe::loader;
use shellprobe::report::Reporter;
use shellprobe::runner::{self, RunReport, Runner};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable report grouped by category
    #[default]
    Human,
    /// Machine-readable JSON output
    Json,
    /// JUnit XML output for CI systems
    Junit,
}

#[derive(Parser)]
#[command(name = "shellprobe")]
#[command(about = "A black-box test harness for the smash shell")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Path to the target executable (overrides the config file)
    #[arg(short, long)]
    target: Option<PathBuf>,
    /// Harness config file (.yaml, .yml or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Filter tests by name pattern (substring match)
    #[arg(short, long)]
    filter: Option<String>,
    /// Output format
    #[arg(short, long, default_value = "human")]
    output: OutputFormat,
    /// Log spawns, timeouts and per-case timings to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List every category and case without running anything
    List,
    /// Output the config file schema
    Schema,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Some(Command::List) => list(),
        Some(Command::Schema) => match serde_json::to_string_pretty(&generate_schema()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing schema: {e}");
                std::process::exit(1);
            }
        },
        None => {
            if !run(&cli) {
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .try_init();

    // Case panics are already recorded as errored verdicts; anything else
    // still goes through the default hook.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if runner::inside_case() {
            tracing::debug!("panic inside test case: {info}");
        } else {
            default_hook(info);
        }
    }));
}

fn list() {
    let categories = match catalog::categories() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading test catalog: {e}");
            std::process::exit(1);
        }
    };
    for category in &categories {
        println!("{}", category.name());
        for case in category.cases() {
            println!("  {}", case.name);
        }
    }
}

/// Run the catalog and print the report. Returns true if every case passed.
fn run(cli: &Cli) -> bool {
    let config = match &cli.config {
        Some(path) => match loader::load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config: {e}");
                return false;
            }
        },
        None => HarnessConfig::default(),
    };

    let report = match loader::resolve_target(cli.target.as_deref(), &config) {
        Ok(program) => {
            let target = Target::from_config(program, &config);
            match catalog::categories() {
                Ok(categories) => Runner::new(&target)
                    .with_filter(cli.filter.as_deref())
                    .run(&categories),
                Err(e) => RunReport::setup_failure(e.to_string()),
            }
        }
        Err(e) => RunReport::setup_failure(e.to_string()),
    };

    let reporter = Reporter::new(config.truncate);
    let rendered = match cli.output {
        OutputFormat::Human => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            reporter
                .human(&report, &mut out)
                .and_then(|()| out.flush().map_err(Into::into))
        }
        OutputFormat::Json => reporter.json(&report).map(|json| println!("{json}")),
        OutputFormat::Junit => reporter.junit(&report).map(|xml| print!("{xml}")),
    };
    if let Err(e) = rendered {
        eprintln!("Error: {e}");
        return false;
    }

    report.success()
}
