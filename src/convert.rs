//! The assembly orchestrator: front matter → back matter → body.
//!
//! Pandoc's `--include-before-body`/`--include-after-body` flags take file
//! paths, so the two fragments are staged in `tempfile::NamedTempFile`s.
//! RAII ties their lifetime to this function: whether `convert` returns
//! normally or bails out of any stage with `?`, the staging files are
//! closed and deleted. The durable copies (`xxx-pretextual.tex`,
//! `xxx-postextual.tex`) land in the output directory for inspection and
//! are never rolled back.

use crate::config::Options;
use crate::error::Md2AbntError;
use crate::pipeline::bibliography::BIBLIOGRAPHY_FILE;
use crate::pipeline::postextual::{self, POSTEXTUAL_FILE};
use crate::pipeline::pretextual::{self, PRETEXTUAL_FILE};
use crate::pipeline::renderer::SectionRenderer;
use crate::work::Work;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Canonical name of the assembled document inside the output directory.
pub const TEX_FILE: &str = "xxx-trabalho-academico.tex";

/// Everything `convert` produced, texts in memory and paths on disk.
#[derive(Debug)]
pub struct Conversion {
    /// Concatenated front-matter LaTeX.
    pub pretextual_tex: String,
    /// Concatenated back-matter LaTeX.
    pub postextual_tex: String,
    /// The assembled document body.
    pub document_tex: String,
    /// `<output_dir>/xxx-trabalho-academico.tex`, input to
    /// [`crate::pipeline::compile::compile`].
    pub document_path: PathBuf,
    /// `<output_dir>/xxx-pretextual.tex`.
    pub pretextual_path: PathBuf,
    /// `<output_dir>/xxx-postextual.tex`.
    pub postextual_path: PathBuf,
    /// `<output_dir>/xxx-referencias.bib`.
    pub bibliography_path: PathBuf,
}

/// Convert the work into the assembled LaTeX document.
///
/// Stages run strictly in order — the body pass reads the staging artifacts
/// as include files, so both must hold final content before pandoc starts.
/// Compilation to PDF is a separate, explicitly invoked operation
/// ([`crate::pipeline::compile::compile`]).
pub async fn convert(work: &Work, options: &Options) -> Result<Conversion, Md2AbntError> {
    std::fs::create_dir_all(&options.output_dir).map_err(|source| {
        Md2AbntError::ArtifactWrite {
            path: options.output_dir.clone(),
            source,
        }
    })?;

    // Scoped staging artifacts: deleted on every exit path from here on.
    let front_staging = NamedTempFile::new().map_err(Md2AbntError::StagingArtifact)?;
    let back_staging = NamedTempFile::new().map_err(Md2AbntError::StagingArtifact)?;

    let pretextual_tex = pretextual::assemble(work, options).await?;
    stage(front_staging.path(), &pretextual_tex)?;
    let pretextual_path = persist(&options.output_dir, PRETEXTUAL_FILE, &pretextual_tex)?;

    let postextual_tex = postextual::assemble(work, options).await?;
    stage(back_staging.path(), &postextual_tex)?;
    let postextual_path = persist(&options.output_dir, POSTEXTUAL_FILE, &postextual_tex)?;

    let renderer = SectionRenderer::new(work, options);
    let body = renderer
        .render_document(front_staging.path(), back_staging.path())
        .await?;
    let document_path = persist(&options.output_dir, TEX_FILE, &body.text)?;

    info!(document = %document_path.display(), "conversion complete");
    Ok(Conversion {
        pretextual_tex,
        postextual_tex,
        document_tex: body.text,
        document_path,
        pretextual_path,
        postextual_path,
        bibliography_path: options.output_dir.join(BIBLIOGRAPHY_FILE),
    })
}

/// Write a fragment to its staging artifact.
fn stage(path: &Path, text: &str) -> Result<(), Md2AbntError> {
    std::fs::write(path, text).map_err(|source| Md2AbntError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a fragment to its durable artifact in the output directory.
fn persist(dir: &Path, name: &str, text: &str) -> Result<PathBuf, Md2AbntError> {
    let path = dir.join(name);
    std::fs::write(&path, text).map_err(|source| Md2AbntError::ArtifactWrite {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
