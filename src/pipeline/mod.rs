//! Pipeline stages for academic-document assembly.
//!
//! Each submodule owns exactly one stage. Order matters: the body pass
//! consumes the two staging artifacts the assemblers wrote, so front and
//! back matter must be final on disk before it runs.
//!
//! ## Data Flow
//!
//! ```text
//! work ──▶ pretextual ──▶ postextual ──▶ body pass ──▶ compile
//!          (13 passes)    (3 passes +     (pandoc -s)   (latexmk,
//!                          bibliography)                 pdftotext)
//! ```
//!
//! 1. [`renderer`]     — one pandoc invocation per named template; the only
//!    place child processes are spawned for conversion
//! 2. [`pretextual`]   — ordered front-matter fragments
//! 3. [`postextual`]   — ordered back-matter fragments + bibliography
//! 4. [`bibliography`] — BibTeX title/subtitle normalization
//! 5. [`compile`]      — latexmk/pdftotext, ligature correction

pub mod bibliography;
pub mod compile;
pub mod postextual;
pub mod pretextual;
pub mod renderer;
