use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tea_transpiler::{
    BundleError, Error, GenerateOptions, GenerateResult, Injection, TemplateBundle, Variant,
    generate_bundle,
};
use tracing_subscriber::prelude::*;
use walkdir::WalkDir;

const BUNDLE_SUFFIX: &str = ".bundle.json";

#[derive(Parser)]
#[command(name = "tea")]
#[command(about = "Tea - text templates to C# with exact source projections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate C# from parsed template bundles (*.bundle.json)
    Generate {
        /// Path to a bundle file or a directory of bundles
        #[arg(required_unless_present = "stdin")]
        path: Option<PathBuf>,

        /// Read one bundle from stdin and write the program to stdout
        #[arg(long)]
        stdin: bool,

        /// Output as JSON with projections and problems
        #[arg(long)]
        json: bool,

        /// Include editor injections for the root template in JSON output
        #[arg(long)]
        injection: bool,

        /// Shape of the generated program
        #[arg(long, value_enum, default_value_t = VariantArg::CodeBehind)]
        variant: VariantArg,

        /// Wrap the generated class in this namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Name of the generated class
        #[arg(long)]
        class_name: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VariantArg {
    CodeBehind,
    Executable,
    Interactive,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::CodeBehind => Variant::CodeBehind,
            VariantArg::Executable => Variant::Executable,
            VariantArg::Interactive => Variant::Interactive,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read stdin")]
    Stdin(#[source] io::Error),
    #[error("{}", path.display())]
    Bundle {
        path: PathBuf,
        #[source]
        source: Error,
    },
    #[error(transparent)]
    Generate(#[from] Error),
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode JSON output")]
    Json(#[from] serde_json::Error),
    #[error("{} is not a .bundle.json file", .0.display())]
    NotABundle(PathBuf),
    #[error("no .bundle.json files found in {}", .0.display())]
    NoBundles(PathBuf),
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("{0} of {1} bundles failed")]
    Partial(usize, usize),
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    result: &'a GenerateResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    injections: Option<Vec<Injection>>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Generate {
            path,
            stdin,
            json,
            injection,
            variant,
            namespace,
            class_name,
        } => {
            let options = GenerateOptions {
                variant: variant.into(),
                namespace,
                class_name,
                ..GenerateOptions::default()
            };
            if stdin {
                generate_stdin(&options, json, injection)
            } else if let Some(path) = path {
                generate_path(&path, &options, json)
            } else {
                eprintln!("Error: provide a bundle file/directory or use --stdin");
                return ExitCode::FAILURE;
            }
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr, filtered by `TEA_LOG` (default `warn`).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("TEA_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn generate_stdin(
    options: &GenerateOptions,
    json_output: bool,
    include_injections: bool,
) -> Result<(), CliError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(CliError::Stdin)?;

    let bundle = TemplateBundle::from_json(&input).map_err(Error::from)?;
    let result = generate_bundle(&bundle, options)?;
    report_problems(&bundle, &result);

    if json_output {
        let injections = if include_injections {
            bundle
                .root_tree()
                .ok()
                .map(|root| result.injections(&root.source, &root.text))
        } else {
            None
        };
        let output = JsonOutput {
            result: &result,
            injections,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        print!("{}", result.code);
    }
    Ok(())
}

fn generate_path(
    path: &Path,
    options: &GenerateOptions,
    json_output: bool,
) -> Result<(), CliError> {
    if path.is_file() {
        if !is_bundle(path) {
            return Err(CliError::NotABundle(path.to_path_buf()));
        }
        let start = Instant::now();
        generate_file(path, options, json_output)?;
        print_summary(1, start.elapsed());
        Ok(())
    } else if path.is_dir() {
        generate_directory(path, options, json_output)
    } else {
        Err(CliError::Missing(path.to_path_buf()))
    }
}

fn generate_directory(
    dir: &Path,
    options: &GenerateOptions,
    json_output: bool,
) -> Result<(), CliError> {
    let start = Instant::now();
    let mut generated = 0;
    let mut failed = 0;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_bundle(e.path()))
    {
        match generate_file(entry.path(), options, json_output) {
            Ok(()) => generated += 1,
            Err(err) => {
                failed += 1;
                print_error(&err);
            }
        }
    }

    if generated + failed == 0 {
        return Err(CliError::NoBundles(dir.to_path_buf()));
    }

    print_summary(generated, start.elapsed());
    if failed > 0 {
        return Err(CliError::Partial(failed, generated + failed));
    }
    Ok(())
}

/// Writes `<stem>.cs` next to the bundle, or prints one JSON line per bundle.
fn generate_file(
    path: &Path,
    options: &GenerateOptions,
    json_output: bool,
) -> Result<(), CliError> {
    let bundle_error = |source: Error| CliError::Bundle {
        path: path.to_path_buf(),
        source,
    };

    let bundle = TemplateBundle::load(path).map_err(|err: BundleError| bundle_error(err.into()))?;
    let result = generate_bundle(&bundle, options).map_err(bundle_error)?;
    report_problems(&bundle, &result);

    if json_output {
        let output = JsonOutput {
            result: &result,
            injections: None,
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let output = output_path(path);
    fs::write(&output, &result.code).map_err(|source| CliError::Write {
        path: output.clone(),
        source,
    })?;
    tracing::debug!(
        bundle = %path.display(),
        projections = result.projections.len(),
        "wrote program"
    );
    print_generated(&output.display().to_string());
    Ok(())
}

fn is_bundle(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(BUNDLE_SUFFIX))
}

/// `dir/name.bundle.json` -> `dir/name.cs`
fn output_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(BUNDLE_SUFFIX))
        .filter(|stem| !stem.is_empty())
        .unwrap_or("Template");
    path.with_file_name(format!("{}.cs", name))
}

fn report_problems(bundle: &TemplateBundle, result: &GenerateResult) {
    let color = io::stderr().is_terminal();
    for problem in &result.problems {
        let text = bundle
            .get(&problem.source)
            .map(|tree| tree.text.as_str())
            .unwrap_or_default();
        eprint!("{}", problem.render(text, color));
    }
}

fn print_error(err: &CliError) {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = std::error::Error::source(cause);
    }

    if io::stderr().is_terminal() {
        eprintln!("\x1b[1;31merror:\x1b[0m {}", message);
    } else {
        eprintln!("error: {}", message);
    }
}

fn print_generated(path: &str) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "program" } else { "programs" };

    if is_tty {
        eprintln!("\n\x1b[1mGenerated {} {} in {}\x1b[0m", count, files_word, time_str);
    } else {
        eprintln!("\nGenerated {} {} in {}", count, files_word, time_str);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
