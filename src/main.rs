use anyhow::{bail, Context, Result};
use clap::Parser;
use stackscrub::cli::{Cli, InputFormat, OutputFormat};
use stackscrub::classifier::TestClassPredicate;
use stackscrub::cleaner::StackTraceCleaner;
use stackscrub::throwable::{Throwable, ThrowableRecord};
use stackscrub::trace_text::{self, RenderedTrace};
use stackscrub::type_hierarchy::TypeTable;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Deepest throwable nesting written as JSON. serde_json reads back at most
/// 128 nested values and a suppressed level costs two of them.
const MAX_JSON_DEPTH: usize = 63;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read trace from stdin")?;
            Ok(buffer)
        }
    }
}

fn parse_input(text: &str, format: InputFormat) -> Result<Throwable> {
    match format {
        InputFormat::Text => trace_text::parse_trace(text).context("Failed to parse stack trace"),
        InputFormat::Json => {
            let record: ThrowableRecord =
                serde_json::from_str(text).context("Invalid throwable JSON")?;
            Ok(Throwable::from_record(&record))
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let types = match &args.types {
        Some(path) => TypeTable::from_file(path)?,
        None => TypeTable::new(),
    };
    tracing::debug!("Loaded {} type hierarchy entries", types.len());

    let mut cleaner = StackTraceCleaner::with_hierarchy(types);
    if !args.test_suffixes.is_empty() {
        cleaner = cleaner.with_test_class_predicate(TestClassPredicate::Suffixes(args.test_suffixes));
    }

    let text = read_input(args.input.as_deref())?;
    let throwable = parse_input(&text, args.input_format)?;

    cleaner.clean(&throwable);

    match args.format {
        OutputFormat::Text => print!("{}", RenderedTrace(&throwable)),
        OutputFormat::Json => {
            let depth = throwable.depth();
            if depth > MAX_JSON_DEPTH {
                bail!(
                    "Throwable nesting depth {} exceeds the JSON output limit of {}; use --format text",
                    depth,
                    MAX_JSON_DEPTH
                );
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&throwable.to_record())
                    .context("Failed to serialize cleaned trace")?
            );
        }
    }

    Ok(())
}
