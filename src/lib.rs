//! # md2abnt
//!
//! Assemble ABNT-compliant academic documents (monographs, theses,
//! dissertations) from Markdown by driving pandoc through multiple ordered
//! passes, then optionally compiling the result to PDF with latexmk and
//! extracting ligature-corrected plain text.
//!
//! ## Why multiple passes?
//!
//! ABNT front matter is not body content: a title page, approval sheet, or
//! abstract is produced by *its own* pandoc template, fed only the work's
//! metadata. The pipeline therefore runs one converter pass per section —
//! thirteen pretextual, three postextual — concatenates the fragments in the
//! fixed document order, and hands them to the final standalone pass as
//! `--include-before-body`/`--include-after-body` files.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Work + Options
//!  │
//!  ├─ 1. Front matter   13 template passes → xxx-pretextual.tex
//!  ├─ 2. Back matter    references/appendices/annexes → xxx-postextual.tex
//!  │                    + bibliography normalization → xxx-referencias.bib
//!  ├─ 3. Body           standalone pass consuming both staging files
//!  │                    → xxx-trabalho-academico.tex
//!  └─ 4. Compile        latexmk → PDF, pdftotext → corrected .txt  (optional)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2abnt::{convert, Options, Work};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let work = Work {
//!         format: "markdown".into(),
//!         body_text: "# Introdução\n\nTexto.".into(),
//!         ..Default::default()
//!     };
//!     let options = Options::builder("build/", "/usr/share/limarka").build()?;
//!     let conversion = convert(&work, &options).await?;
//!     println!("assembled: {}", conversion.document_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A single broken section template does not fail the run: its pandoc pass
//! logs a diagnostic with the captured stderr and contributes whatever
//! partial output it produced. Malformed bibliography data, a missing
//! required input, or an unspawnable converter are fatal. Staging artifacts
//! are scoped and deleted on every exit path; durable artifacts are left on
//! disk for inspection even after a failure.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod pipeline;
pub mod work;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Options, OptionsBuilder};
pub use convert::{convert, Conversion, TEX_FILE};
pub use error::Md2AbntError;
pub use pipeline::compile::{compile, correct_ligatures, CompileOutput};
pub use work::Work;
