use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use graphdump_core::backtrace::capture_backtrace;
use graphdump_core::classify::TypeClassifier;
use graphdump_core::{DumpConfig, Dumper, HeapImage, IntrospectionProvider};
use graphdump_utils::{info, init_logging_with, warn, LogLevel, LogSettings};

/// Diagnostic log used when neither the command line nor the config names one.
const DEFAULT_DIAGNOSTICS_PATH: &str = "error.log";

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Dump a paused process's object graph to JSON, cycle-safe and field-fault-tolerant.
#[derive(Parser, Debug)]
#[command(name = "graphdump")]
#[command(version)]
#[command(about = "Dump a paused process's object graph to JSON", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Dump the object graph reachable from an expression
    Dump
    {
        /// Root expression, e.g. `thd->lex` or `*head`
        expr: String,
        /// Heap image to read the process state from
        #[arg(long)]
        image: PathBuf,
        /// Output file or directory (default: `<expr>_<timestamp>.json` in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Declared type name to leave unexpanded (repeatable)
        #[arg(long = "ignore-type", value_name = "TYPE")]
        ignore_types: Vec<String>,
        /// Deepest nesting level to expand
        #[arg(long)]
        max_depth: Option<usize>,
        /// Diagnostic log for fields that could not be dumped
        #[arg(long)]
        diagnostics: Option<PathBuf>,
    },
    /// Print the backtrace of the selected frame
    Backtrace
    {
        /// Heap image to read the process state from
        #[arg(long)]
        image: PathBuf,
    },
    /// Print how the dumper classifies the named types
    Classify
    {
        /// Heap image holding the type table
        #[arg(long)]
        image: PathBuf,
        /// Optional TOML configuration (ignore list, namespace markers)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Type names to classify
        #[arg(required = true)]
        types: Vec<String>,
    },
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    // Reads GRAPHDUMP_LOG_FORMAT / GRAPHDUMP_LOG_FILE; --log-level beats RUST_LOG
    let settings = LogSettings::from_env().map(|settings| settings.with_level(cli.log_level));
    let guard = match settings.and_then(|settings| init_logging_with(&settings)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = guard.file() {
        info!(path = %path.display(), "Logging to file");
    }

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_command(command: Commands) -> CliResult<()>
{
    match command {
        Commands::Dump {
            expr,
            image,
            output,
            config,
            ignore_types,
            max_depth,
            diagnostics,
        } => {
            let config = resolve_config(config.as_deref(), &ignore_types, max_depth, diagnostics)?;
            let image = HeapImage::load(&image)?;
            let path = run_dump(&image, config, &expr, output.as_deref())?;
            println!("Saved in {}", path.display());
            Ok(())
        }
        Commands::Backtrace { image } => {
            let image = HeapImage::load(&image)?;
            let frames = capture_backtrace(&image, image.selected_frame());
            if frames.is_empty() {
                println!("No stack.");
            }
            for (index, frame) in frames.iter().enumerate() {
                println!("#{index:<3} {} (line {})", frame.function, frame.line);
            }
            Ok(())
        }
        Commands::Classify { image, config, types } => {
            let config = match config {
                Some(path) => DumpConfig::load(&path)?,
                None => DumpConfig::default(),
            }
            .with_env_overrides();
            let image = HeapImage::load(&image)?;
            let classifier = TypeClassifier::from_config(&config);

            for type_name in &types {
                match image.describe(type_name) {
                    Ok(descriptor) => {
                        println!("{type_name}: {} ({})", classifier.classify(&descriptor), descriptor.kind);
                    }
                    Err(e) => println!("{type_name}: error: {e}"),
                }
            }
            Ok(())
        }
    }
}

/// Config file, then `GRAPHDUMP_IGNORE_TYPES`, then command-line flags.
fn resolve_config(
    path: Option<&Path>,
    ignore_types: &[String],
    max_depth: Option<usize>,
    diagnostics: Option<PathBuf>,
) -> CliResult<DumpConfig>
{
    let mut config = match path {
        Some(path) => DumpConfig::load(path)?,
        None => DumpConfig::default(),
    }
    .with_env_overrides();

    for type_name in ignore_types {
        config = config.with_ignored_type(type_name.clone());
    }
    if let Some(max_depth) = max_depth {
        config = config.with_max_depth(max_depth);
    }
    match diagnostics {
        Some(diagnostics) => config = config.with_diagnostics_path(diagnostics),
        None if config.diagnostics_path.is_none() => config = config.with_diagnostics_path(DEFAULT_DIAGNOSTICS_PATH),
        None => {}
    }
    Ok(config)
}

/// Dump `expr` and write the artifact; returns the path written.
fn run_dump<P: IntrospectionProvider + ?Sized>(
    provider: &P,
    config: DumpConfig,
    expr: &str,
    output: Option<&Path>,
) -> CliResult<PathBuf>
{
    let started = Instant::now();
    let run = Dumper::new(provider, config).run(expr)?;

    let path = match output {
        Some(output) if output.is_dir() => output.join(run.result.file_name()),
        Some(output) => output.to_path_buf(),
        None => PathBuf::from(run.result.file_name()),
    };
    run.result.write_json(&path)?;

    if !run.diagnostics.is_empty() {
        warn!(skipped = run.diagnostics.len(), "Some fields could not be dumped, see the diagnostic log");
    }
    info!(
        fields = run.stats.fields,
        depth = run.result.depth(),
        back_references = run.stats.back_references,
        "Dump complete"
    );
    println!("Time taken: {:?}", started.elapsed());
    Ok(path)
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    fn image() -> HeapImage
    {
        HeapImage::from_value(json!({
            "types": {
                "int": { "kind": "int" },
                "Node": { "kind": "struct", "fields": [
                    { "name": "id", "type": "int" },
                    { "name": "next", "type": "Node *" }
                ] }
            },
            "symbols": { "head": { "address": "0x100", "type": "Node *" } },
            "objects": {
                "0x100": "0x1000",
                "0x1000": { "id": 1, "next": "0x1000" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_dump_command()
    {
        let cli = Cli::try_parse_from([
            "graphdump",
            "dump",
            "thd->lex",
            "--image",
            "core.json",
            "--ignore-type",
            "THD *",
            "--ignore-type",
            "MEM_ROOT",
            "--max-depth",
            "5",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Dump {
                expr,
                ignore_types,
                max_depth,
                diagnostics,
                ..
            } => {
                assert_eq!(expr, "thd->lex");
                assert_eq!(ignore_types, vec!["THD *".to_string(), "MEM_ROOT".to_string()]);
                assert_eq!(max_depth, Some(5));
                assert_eq!(diagnostics, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_classify_requires_types()
    {
        assert!(Cli::try_parse_from(["graphdump", "classify", "--image", "core.json"]).is_err());
    }

    #[test]
    fn test_resolve_config_layers()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphdump.toml");
        std::fs::write(&path, "ignore_types = [\"MEM_ROOT\"]\nmax_depth = 3\n").unwrap();

        let config = resolve_config(Some(&path), &["THD *".to_string()], Some(8), None).unwrap();
        assert!(config.ignore_types.contains("MEM_ROOT"));
        assert!(config.ignore_types.contains("THD *"));
        assert_eq!(config.max_depth, Some(8));
        assert_eq!(config.diagnostics_path, Some(PathBuf::from(DEFAULT_DIAGNOSTICS_PATH)));

        let config = resolve_config(None, &[], None, Some(dir.path().join("x.log"))).unwrap();
        assert_eq!(config.diagnostics_path, Some(dir.path().join("x.log")));
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn test_run_dump_into_directory()
    {
        let dir = tempfile::tempdir().unwrap();
        let config = DumpConfig::default().with_diagnostics_path(dir.path().join("error.log"));

        let path = run_dump(&image(), config, "head", Some(dir.path())).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("head_"), "{name}");

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["expr"], "head");
        assert_eq!(json["value"]["next"]["value"], "(back-reference: head)");
    }
}
