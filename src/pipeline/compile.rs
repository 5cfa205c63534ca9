//! Compilation: assembled LaTeX → PDF → optional plain text.
//!
//! This stage shells out to the typesetting toolchain. latexmk's exit status
//! is recorded but not interpreted — LaTeX exits non-zero for recoverable
//! warnings all the time, so the only reliable success signal is the PDF
//! artifact itself, and callers check for it. Standard streams go to log
//! files in the output directory rather than the terminal; a full xelatex
//! run prints thousands of lines.
//!
//! Text extraction runs pdftotext and then repairs the typographic ligature
//! glyphs xelatex embeds (ﬁ, ﬀ, ﬂ, ﬃ, ﬄ) back into their ASCII character
//! sequences, editing the `.txt` artifact in place.

use crate::config::Options;
use crate::error::Md2AbntError;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Log artifacts written next to the PDF.
pub const TEXLIVEONFLY_LOG: &str = "xxx-texliveonfly-std.txt";
pub const LATEXMK_STDOUT_LOG: &str = "xxx-latexmk-std.txt";
pub const LATEXMK_STDERR_LOG: &str = "xxx-latexmk-erros.txt";

/// Ligature glyphs and their ASCII expansions. Each glyph is a single
/// `char`, so the replacements are independent of one another.
const LIGATURES: [(char, &str); 5] = [
    ('\u{FB03}', "ffi"), // ﬃ
    ('\u{FB04}', "ffl"), // ﬄ
    ('\u{FB01}', "fi"),  // ﬁ
    ('\u{FB00}', "ff"),  // ﬀ
    ('\u{FB02}', "fl"),  // ﬂ
];

/// Result of a compilation run.
#[derive(Debug)]
pub struct CompileOutput {
    /// Expected location of the PDF artifact. May be absent when the
    /// LaTeX run failed; callers must check before assuming success.
    pub pdf_path: PathBuf,
    /// latexmk's exit status, passed through uninterpreted.
    pub latexmk_status: ExitStatus,
    /// Ligature-corrected plain text, when extraction was enabled and the
    /// PDF exists.
    pub text: Option<String>,
}

/// Compile the assembled document in `output_dir` and optionally extract
/// its plain text.
///
/// `tex_path` is the canonical assembled document produced by
/// [`crate::convert::convert`]. If a `texliveonfly` helper is on PATH it
/// runs first to pull missing packages (best effort — its absence or
/// failure is not an error).
pub async fn compile(options: &Options, tex_path: &Path) -> Result<CompileOutput, Md2AbntError> {
    let basename = tex_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            Md2AbntError::InvalidOptions(format!(
                "not a .tex path: '{}'",
                tex_path.display()
            ))
        })?
        .to_string();
    let out_dir = &options.output_dir;

    // Capability probe, queried once per run.
    if find_on_path("texliveonfly").is_some() {
        debug!("texliveonfly found; fetching missing packages");
        let log = log_file(out_dir, TEXLIVEONFLY_LOG)?;
        let run = Command::new("texliveonfly")
            .args(["-c", "xelatex", "-f", &basename])
            .current_dir(out_dir)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = run {
            warn!("texliveonfly run failed: {e}");
        }
    }

    info!(%basename, "running latexmk");
    let stdout_log = log_file(out_dir, LATEXMK_STDOUT_LOG)?;
    let stderr_log = log_file(out_dir, LATEXMK_STDERR_LOG)?;
    let latexmk_status = Command::new("latexmk")
        .args(["--quiet", "--xelatex", "-f", &basename])
        .current_dir(out_dir)
        .stdin(Stdio::null())
        .stdout(stdout_log)
        .stderr(stderr_log)
        .status()
        .await
        .map_err(|source| Md2AbntError::SpawnFailed {
            program: "latexmk".into(),
            source,
        })?;

    let pdf_path = out_dir.join(format!("{basename}.pdf"));
    let text = if options.extract_text && pdf_path.is_file() {
        Some(extract_text(out_dir, &basename).await?)
    } else {
        if options.extract_text {
            warn!(pdf = %pdf_path.display(), "no PDF artifact; skipping text extraction");
        }
        None
    };

    Ok(CompileOutput {
        pdf_path,
        latexmk_status,
        text,
    })
}

/// Run pdftotext, repair ligatures in the `.txt` artifact in place, and
/// return the corrected text.
async fn extract_text(out_dir: &Path, basename: &str) -> Result<String, Md2AbntError> {
    let status = Command::new("pdftotext")
        .args(["-enc", "UTF-8", &format!("{basename}.pdf")])
        .current_dir(out_dir)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|source| Md2AbntError::SpawnFailed {
            program: "pdftotext".into(),
            source,
        })?;
    if !status.success() {
        warn!(%status, "pdftotext exited non-zero");
    }

    let txt_path = out_dir.join(format!("{basename}.txt"));
    let raw = std::fs::read_to_string(&txt_path).map_err(|source| Md2AbntError::MissingInput {
        path: txt_path.clone(),
        source,
    })?;
    let corrected = correct_ligatures(&raw);
    if corrected != raw {
        std::fs::write(&txt_path, &corrected).map_err(|source| Md2AbntError::ArtifactWrite {
            path: txt_path,
            source,
        })?;
    }
    Ok(corrected)
}

/// Replace typographic ligature glyphs with their ASCII expansions.
/// Idempotent: the expansions contain no ligature glyphs.
pub fn correct_ligatures(text: &str) -> String {
    let mut out = text.to_string();
    for (glyph, expansion) in LIGATURES {
        if out.contains(glyph) {
            out = out.replace(glyph, expansion);
        }
    }
    out
}

/// Open a log file for a child's standard stream, truncating prior runs.
fn log_file(dir: &Path, name: &str) -> Result<Stdio, Md2AbntError> {
    let path = dir.join(name);
    std::fs::File::create(&path)
        .map(Stdio::from)
        .map_err(|source| Md2AbntError::ArtifactWrite { path, source })
}

/// Locate an executable on PATH. Returns the first hit.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
