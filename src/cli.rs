//! Minimal CLI: load type graphs → (paths | count)
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};

use sample_keys::load::{load_file, Document};
use sample_keys::report::{for_each_root, key_count, key_paths, render_counts, render_paths};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// enumerate the key fields of structures and unions in parsed IDL type graphs
#[derive(Parser, Debug)]
#[command(name = "sample-keys", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the accessor path and type of every key leaf
    Paths(InputSettings),
    /// print the number of key leaves per root
    Count(InputSettings),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer selecting the type graph inside each document (e.g. /idl/graph)
    #[arg(long)]
    json_pointer: Option<String>,

    /// only analyze these types (default: the document's roots)
    #[arg(long = "root")]
    roots: Vec<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = expand_inputs(&self.input)
            .context("failed to resolve input file paths")?;
        let mut out = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            tracing::info!(path = %source_path.display(), "loading type graph");
            let doc = load_file(&source_path, self.json_pointer.as_deref())
                .with_context(|| format!("failed to load {}", source_path.display()))?;
            out.push(doc);
        }
        Ok(out)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Failure exit status when any root was misconfigured.
    pub fn run(&self) -> Result<ExitCode> {
        let mut all_ok = true;
        match &self.cmd {
            Command::Paths(settings) => {
                for doc in settings.load_documents()? {
                    let reports = for_each_root(&doc, &settings.roots, key_paths);
                    all_ok &= reports.iter().all(|r| r.is_ok());
                    print!("{}", render_paths(&reports));
                }
            }
            Command::Count(settings) => {
                for doc in settings.load_documents()? {
                    let reports = for_each_root(&doc, &settings.roots, key_count);
                    all_ok &= reports.iter().all(|r| r.is_ok());
                    print!("{}", render_counts(&reports));
                }
            }
        }
        Ok(if all_ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Literal paths pass through untouched (even if the file is missing, so the
/// loader reports it); anything with glob metacharacters must match a file.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let expanded = inputs.iter().map(|input| -> Result<Vec<PathBuf>> {
        if glob::Pattern::escape(input) == *input {
            return Ok(vec![PathBuf::from(input)]);
        }
        let matches = glob::glob(input)
            .with_context(|| format!("invalid glob pattern: {input}"))?
            .collect::<Result<Vec<_>, _>>()?;
        ensure!(!matches.is_empty(), "glob pattern matched no files: {input}");
        Ok(matches)
    });
    expanded.collect::<Result<Vec<_>>>().map(|groups| groups.concat())
}
