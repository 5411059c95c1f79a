//! ArazzoGen CLI Entry Point
//!
//! Provides command-line interface for documentation and test-suite generation.
//!
//! # Usage
//!
//! ```bash
//! # Markdown documentation with PlantUML diagrams
//! arazzo-gen doc --spec shop.arazzo.yaml --output docs
//!
//! # Robot Framework suites, resolving operations through a catalog
//! arazzo-gen robot --spec shop.arazzo.yaml --catalog operations.json
//!
//! # JSON suites from a remote document, four workers
//! arazzo-gen robot --spec https://example.com/shop.arazzo.json --format json --parallel 4
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info};

use arazzo_gen::generation::{DocumentationGenerator, GenerationReport, Generator, SuiteGenerator};
use arazzo_gen::render::{write_suites, JsonRenderer, MarkdownWriter, RobotRenderer, SuiteRenderer};
use arazzo_gen::{load_and_build, load_catalog, Specification, APP_NAME, VERSION};

/// Default output directory.
const DEFAULT_OUTPUT: &str = "generated";

/// Default number of generation workers.
const DEFAULT_MAX_PARALLEL: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Doc,
    Robot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SuiteFormat {
    Robot,
    Json,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    command: Option<Command>,
    spec: Option<String>,
    output: PathBuf,
    format: SuiteFormat,
    catalog: Option<String>,
    max_parallel: usize,
    fail_fast: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: None,
            spec: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: SuiteFormat::Robot,
            catalog: None,
            max_parallel: DEFAULT_MAX_PARALLEL,
            fail_fast: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Arazzo Workflow Documentation and Test Generator");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: arazzo-gen <COMMAND> --spec <PATH|URL> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  doc                 Generate Markdown documentation with PlantUML diagrams");
    println!("  robot               Generate test suites");
    println!();
    println!("Options:");
    println!("  --spec PATH|URL     Arazzo specification (JSON or YAML)");
    println!("  --output DIR        Output directory (default: {})", DEFAULT_OUTPUT);
    println!("  --format FORMAT     Suite format for 'robot': robot or json (default: robot)");
    println!("  --catalog PATH      Operation catalog used to resolve HTTP calls");
    println!("  --parallel N        Generation workers, 0 for one per CPU (default: {})", DEFAULT_MAX_PARALLEL);
    println!("  --fail-fast         Stop at the first workflow that fails");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  arazzo-gen doc --spec shop.arazzo.yaml");
    println!("  arazzo-gen robot --spec shop.arazzo.yaml --catalog operations.json --output tests");
}

/// Returns the value following the option at `*i`, advancing the cursor.
fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", option))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--fail-fast" => {
                config.fail_fast = true;
            }
            "--spec" => {
                config.spec = Some(option_value(args, &mut i, "--spec")?.to_string());
            }
            "--output" => {
                config.output = PathBuf::from(option_value(args, &mut i, "--output")?);
            }
            "--catalog" => {
                config.catalog = Some(option_value(args, &mut i, "--catalog")?.to_string());
            }
            "--format" => {
                config.format = match option_value(args, &mut i, "--format")? {
                    "robot" => SuiteFormat::Robot,
                    "json" => SuiteFormat::Json,
                    other => return Err(format!("Unknown format: {}", other)),
                };
            }
            "--parallel" => {
                let value = option_value(args, &mut i, "--parallel")?;
                config.max_parallel = value
                    .parse()
                    .map_err(|_| format!("Invalid parallel value: {}", value))?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            command => {
                if config.command.is_some() {
                    return Err(format!("Unexpected argument: {}", command));
                }
                config.command = Some(match command {
                    "doc" => Command::Doc,
                    "robot" => Command::Robot,
                    other => return Err(format!("Unknown command: {}", other)),
                });
            }
        }
        i += 1;
    }

    if config.command.is_none() {
        return Err("Missing command (doc or robot)".to_string());
    }
    if config.spec.is_none() {
        return Err("--spec is required".to_string());
    }

    Ok(config)
}

/// Prints the outcome of a generation run. Returns true if every workflow
/// produced an artifact.
fn print_summary<A>(report: &GenerationReport<A>, written: usize, output: &Path, verbose: bool) -> bool {
    if verbose {
        println!();
        print!("{}", report.timeline().report());
    }

    println!();
    if report.is_success() {
        println!(
            "{} {} files written to {}",
            "Done:".green().bold(),
            written,
            output.display()
        );
    } else {
        println!(
            "{} {} files written, {} failed, {} skipped",
            "Finished with errors:".red().bold(),
            written,
            report.failures().len(),
            report.skipped().len()
        );
    }

    report.is_success()
}

fn generate_docs(spec: &Specification, config: &Config) -> Result<bool, Box<dyn std::error::Error>> {
    let backend = DocumentationGenerator::new();
    let mut generator = Generator::new(&backend);
    generator.set_max_parallel(config.max_parallel);
    generator.set_fail_fast(config.fail_fast);
    let report = generator.run(spec);

    let writer = MarkdownWriter::new(&config.output);
    let written = writer.write_all(report.artifacts().map(|(_, document)| document))?;

    Ok(print_summary(&report, written.len(), &config.output, config.verbose))
}

fn generate_suites(spec: &Specification, config: &Config) -> Result<bool, Box<dyn std::error::Error>> {
    let mut backend = SuiteGenerator::new();
    if let Some(ref locator) = config.catalog {
        backend = backend.with_catalog(Arc::new(load_catalog(locator)?));
    }

    let mut generator = Generator::new(&backend);
    generator.set_max_parallel(config.max_parallel);
    generator.set_fail_fast(config.fail_fast);
    let report = generator.run(spec);

    let renderer: Box<dyn SuiteRenderer> = match config.format {
        SuiteFormat::Robot => Box::new(RobotRenderer::new()),
        SuiteFormat::Json => Box::new(JsonRenderer::new()),
    };
    let written = write_suites(renderer.as_ref(), report.artifacts().map(|(_, s)| s), &config.output)?;

    Ok(print_summary(&report, written.len(), &config.output, config.verbose))
}

/// Main application entry point. Returns false if any workflow failed.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let locator = config.spec.as_deref().unwrap_or_default();
    let spec = load_and_build(locator).map_err(|e| {
        error!("Failed to load specification: {}", e);
        e
    })?;

    info!("Output directory: {}", config.output.display());

    match config.command {
        Some(Command::Doc) => generate_docs(&spec, &config),
        Some(Command::Robot) | None => generate_suites(&spec, &config),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("arazzo-gen")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_doc_command() {
        let config = parse_arguments(&args(&["doc", "--spec", "shop.yaml"])).unwrap();
        assert_eq!(config.command, Some(Command::Doc));
        assert_eq!(config.spec.as_deref(), Some("shop.yaml"));
        assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(config.max_parallel, DEFAULT_MAX_PARALLEL);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_parse_robot_options() {
        let config = parse_arguments(&args(&[
            "--verbose",
            "robot",
            "--spec",
            "https://example.com/shop.json",
            "--format",
            "json",
            "--output",
            "tests",
            "--catalog",
            "ops.yaml",
            "--parallel",
            "0",
            "--fail-fast",
        ]))
        .unwrap();

        assert_eq!(config.command, Some(Command::Robot));
        assert_eq!(config.format, SuiteFormat::Json);
        assert_eq!(config.output, PathBuf::from("tests"));
        assert_eq!(config.catalog.as_deref(), Some("ops.yaml"));
        assert_eq!(config.max_parallel, 0);
        assert!(config.fail_fast);
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--spec", "a.yaml"])).is_err());
        assert!(parse_arguments(&args(&["doc"])).is_err());
        assert!(parse_arguments(&args(&["render", "--spec", "a.yaml"])).is_err());
        assert!(parse_arguments(&args(&["doc", "robot", "--spec", "a.yaml"])).is_err());
        assert!(parse_arguments(&args(&["doc", "--spec"])).is_err());
        assert!(parse_arguments(&args(&["doc", "--spec", "a", "--format", "xml"])).is_err());
        assert!(parse_arguments(&args(&["doc", "--spec", "a", "--parallel", "many"])).is_err());
        assert!(parse_arguments(&args(&["doc", "--spec", "a", "--bogus"])).is_err());
    }
}
