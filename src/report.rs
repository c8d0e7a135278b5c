//! Per-root analysis for the command line.
//!
//! Every root gets its own enumeration; a misconfigured root is reported and
//! the others still run.
use colored::Colorize;
use rayon::prelude::*;

use crate::error::ConfigurationError;
use crate::ir::{Schema, TypeId};
use crate::keys::SampleKeys;
use crate::load::Document;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootReport<T> {
    pub root: String,
    pub outcome: Result<T, ConfigurationError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLine {
    pub path: String,
    pub ty: String,
}

impl<T> RootReport<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Run `analyze` over the document's roots, or over `selected` names when given.
pub fn for_each_root<T, A>(doc: &Document, selected: &[String], analyze: A) -> Vec<RootReport<T>>
where
    T: Send,
    A: Fn(&Schema, TypeId) -> Result<T, ConfigurationError> + Sync,
{
    let targets: Vec<(String, Option<TypeId>)> = if selected.is_empty() {
        doc.roots.iter().map(|id| (doc.schema.type_name(*id), Some(*id))).collect()
    } else {
        selected.iter().map(|name| (name.clone(), doc.schema.lookup(name))).collect()
    };
    targets
        .into_par_iter()
        .map(|(root, id)| {
            let outcome = match id {
                Some(id) => analyze(&doc.schema, id),
                None => Err(ConfigurationError::new(format!("no type named `{root}` in {}", doc.source))),
            };
            if let Err(error) = &outcome {
                tracing::warn!(root = %root, %error, "key enumeration failed");
            }
            RootReport { root, outcome }
        })
        .collect()
}

pub fn key_paths(schema: &Schema, root: TypeId) -> Result<Vec<KeyLine>, ConfigurationError> {
    let keys = SampleKeys::new(schema, root)?;
    let lines = keys
        .entries()?
        .into_iter()
        .map(|entry| KeyLine { path: entry.path, ty: schema.type_name(entry.ty) })
        .collect();
    Ok(lines)
}

pub fn key_count(schema: &Schema, root: TypeId) -> Result<usize, ConfigurationError> {
    SampleKeys::new(schema, root)?.count()
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

pub fn render_paths(reports: &[RootReport<Vec<KeyLine>>]) -> String {
    let mut out = String::new();
    for report in reports {
        match &report.outcome {
            Ok(lines) if lines.is_empty() => {
                out.push_str(&format!("{}: {}\n", report.root.bold(), "(no keys)".dimmed()));
            }
            Ok(lines) => {
                for line in lines {
                    out.push_str(&format!("{}: {} ({})\n", report.root.bold(), line.path, line.ty));
                }
            }
            Err(error) => out.push_str(&render_error(&report.root, error)),
        }
    }
    out
}

pub fn render_counts(reports: &[RootReport<usize>]) -> String {
    let mut out = String::new();
    for report in reports {
        match &report.outcome {
            Ok(n) => out.push_str(&format!("{}: {n}\n", report.root.bold())),
            Err(error) => out.push_str(&render_error(&report.root, error)),
        }
    }
    out
}

fn render_error(root: &str, error: &ConfigurationError) -> String {
    format!("{}: {}\n", root.bold(), error.to_string().red())
}
