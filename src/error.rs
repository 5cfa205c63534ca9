//! Error types for the md2abnt library.
//!
//! Only *fatal* conditions become [`Md2AbntError`] — conditions under which
//! the pipeline cannot produce a usable document at all (missing required
//! input, a converter that cannot even be spawned, malformed bibliography
//! data).
//!
//! A pandoc pass that *runs* but exits non-zero is deliberately **not** an
//! error: the section keeps whatever partial output pandoc produced, a
//! `tracing::warn!` diagnostic carries the captured stderr, and the pipeline
//! continues. Callers who need stricter behaviour can inspect
//! [`crate::pipeline::renderer::RenderedSection`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2abnt library.
#[derive(Debug, Error)]
pub enum Md2AbntError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required input file is absent (e.g. `errata.md` while the work
    /// declares `has_errata`).
    #[error("Required input file not found: '{path}': {source}")]
    MissingInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The templates directory does not hold the expected `templates/`
    /// subtree with the technical-configuration file.
    #[error(
        "Invalid templates directory '{path}': missing templates/{file}\n\
         Point templates_dir at a template bundle that contains it."
    )]
    TemplatesDirInvalid { path: PathBuf, file: String },

    // ── Converter errors ──────────────────────────────────────────────────
    /// The external converter could not be spawned at all (not on PATH,
    /// not executable). Distinct from a non-zero exit, which is non-fatal.
    #[error("Failed to spawn '{program}': {source}\nIs it installed and on PATH?")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O on a child-process pipe failed mid-conversation.
    #[error("I/O error talking to '{program}': {source}")]
    PipeIo {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── Bibliography errors ───────────────────────────────────────────────
    /// The bibliography source is not parseable BibTeX. There is no
    /// partial-success mode: the whole normalization step fails.
    #[error("Malformed BibTeX at offset {offset}: {detail}")]
    BibliographyParse { offset: usize, detail: String },

    // ── Serialisation errors ──────────────────────────────────────────────
    /// The work's configuration map could not be serialized to YAML.
    #[error("Failed to serialize document configuration: {0}")]
    ConfigSerialize(#[from] serde_yaml::Error),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an artifact in the output directory.
    #[error("Failed to write artifact '{path}': {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create a scoped staging artifact.
    #[error("Failed to create staging artifact: {0}")]
    StagingArtifact(#[source] std::io::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}
