// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations for the document tool.

use nodewire_editor_merge::merge as merge_documents;
use nodewire_editor_model::{DocumentError, Project, TypeLibrary, Validator};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Whether a command found anything the caller must act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No validation errors, no conflicts
    Clean,
    /// Validation errors or unresolved conflicts were reported
    Findings,
}

/// Hard failure of a command (as opposed to reported findings)
#[derive(Debug, Error)]
pub enum CommandError {
    /// Reading or writing a file failed
    #[error("Failed to read or write {path}: {source}")]
    Io {
        /// The offending path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A document could not be parsed or serialized
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The type library file could not be parsed
    #[error("Failed to parse type library: {0}")]
    TypeLibrary(#[source] serde_json::Error),
}

fn read_file(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), CommandError> {
    std::fs::write(path, content).map_err(|source| CommandError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn load_project(path: &Path) -> Result<Project, CommandError> {
    Ok(Project::from_json_str(&read_file(path)?)?)
}

fn load_types(path: Option<&Path>) -> Result<Arc<TypeLibrary>, CommandError> {
    let Some(path) = path else {
        return Ok(Arc::new(TypeLibrary::new()));
    };
    let library =
        serde_json::from_str(&read_file(path)?).map_err(CommandError::TypeLibrary)?;
    Ok(Arc::new(library))
}

/// Validate a document and print every structural error found
pub fn validate(document: &Path, types: Option<&Path>) -> Result<Outcome, CommandError> {
    let project = load_project(document)?;
    let mut validator = Validator::new(load_types(types)?);
    let errors = validator.validate(&project);

    if errors.is_empty() {
        tracing::info!("document is structurally valid");
        return Ok(Outcome::Clean);
    }
    for error in errors {
        println!("{error}");
    }
    Ok(Outcome::Findings)
}

/// Remove dangling connections, then report what remains unrepaired
pub fn fix(
    document: &Path,
    output: Option<&Path>,
    types: Option<&Path>,
) -> Result<Outcome, CommandError> {
    let mut project = load_project(document)?;
    let mut validator = Validator::new(load_types(types)?);
    let removed = validator.fix(&mut project);
    tracing::info!(removed, "removed dangling connections");

    write_file(output.unwrap_or(document), &project.to_json_string()?)?;

    if validator.has_errors() {
        for error in validator.errors() {
            println!("{error}");
        }
        return Ok(Outcome::Findings);
    }
    Ok(Outcome::Clean)
}

/// Three-way merge; the merged document is written even on conflicts so the
/// caller can inspect the best-effort result
pub fn merge(
    ancestor: &Path,
    mine: &Path,
    theirs: &Path,
    output: &Path,
    types: Option<&Path>,
) -> Result<Outcome, CommandError> {
    let ancestor = load_project(ancestor)?;
    let mine = load_project(mine)?;
    let theirs = load_project(theirs)?;
    let library = load_types(types)?;

    let outcome = merge_documents(&ancestor, &mine, &theirs, &library);
    write_file(output, &outcome.result.to_json_string()?)?;

    if outcome.has_conflicts() {
        for conflict in &outcome.conflicts {
            println!("{conflict}");
        }
        return Ok(Outcome::Findings);
    }
    tracing::info!("merged cleanly");
    Ok(Outcome::Clean)
}
