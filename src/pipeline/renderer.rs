//! Converter invocation: one pandoc pass per named template.
//!
//! ## Pipe discipline
//!
//! Every pass opens three pipes at once: we feed stdin from an in-memory
//! buffer while pandoc writes stdout and stderr. If we wrote the whole input
//! first and only then read the output, a pass whose output exceeds the OS
//! pipe buffer would deadlock — pandoc blocked writing, us blocked writing.
//! [`run_converter`] therefore drives all three pipes concurrently with
//! `tokio::join!`; from the caller's perspective the invocation is still
//! synchronous (it returns only after the exit status is observed and both
//! output streams are drained).
//!
//! ## Failure policy
//!
//! A pass that exits non-zero is *not* an error: the captured stderr is
//! surfaced as a `tracing::warn!` diagnostic and the section keeps whatever
//! partial stdout was produced. Only a converter that cannot be spawned at
//! all is fatal. This reproduces the source system's documented behaviour —
//! a broken template must not take the other fourteen sections down with it.

use crate::config::Options;
use crate::error::Md2AbntError;
use crate::work::Work;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Template driving the outer body-compilation pass.
pub const DOCUMENT_TEMPLATE: &str = "trabalho-academico";

/// Result of one converter pass.
///
/// `text` holds everything the converter wrote to stdout, even on failure.
#[derive(Debug, Clone)]
pub struct RenderedSection {
    /// Converted output (LaTeX), possibly partial or empty on failure.
    pub text: String,
    /// Whether the converter exited with status zero.
    pub success: bool,
    /// Captured diagnostics from the converter's stderr.
    pub stderr: String,
}

/// Renders named templates against one work, one pass per call.
///
/// Borrows the work and options for the duration of the pipeline run; both
/// are read-only to the renderer.
pub struct SectionRenderer<'a> {
    work: &'a Work,
    options: &'a Options,
}

impl<'a> SectionRenderer<'a> {
    pub fn new(work: &'a Work, options: &'a Options) -> Self {
        Self { work, options }
    }

    /// Render one front-/back-matter section.
    ///
    /// Stdin receives the work's serialized configuration block, then
    /// `content` plus a trailing newline when provided. `top_level_chapters`
    /// adds `--top-level-division=chapter` (back-matter sections promote
    /// their first-level headings to chapters; front-matter ones do not).
    pub async fn render_section(
        &self,
        template: &str,
        content: Option<&str>,
        top_level_chapters: bool,
    ) -> Result<RenderedSection, Md2AbntError> {
        let mut input = self.work.front_matter_block()?;
        if let Some(text) = content {
            input.push_str(text);
            input.push('\n');
        }

        let mut args = self.base_args(template);
        if top_level_chapters {
            args.push("--top-level-division=chapter".to_string());
        }
        args.extend(["--filter".to_string(), self.options.abnt_filter.clone()]);

        debug!(template, "rendering section");
        let section = run_converter(&self.options.pandoc_program, &args, &input).await?;
        if !section.success {
            warn!(template, stderr = %section.stderr, "converter pass failed; keeping partial output");
        }
        Ok(section)
    }

    /// Render the assembled document body.
    ///
    /// The two staging artifacts must already hold their final content:
    /// pandoc reads them as `--include-before-body` / `--include-after-body`
    /// files. Stdin receives, in order, the technical-configuration YAML
    /// from the template bundle, the work's configuration block, and the
    /// body text.
    pub async fn render_document(
        &self,
        before_body: &Path,
        after_body: &Path,
    ) -> Result<RenderedSection, Md2AbntError> {
        let tech_path = self.options.technical_config_path();
        let technical = std::fs::read_to_string(&tech_path).map_err(|source| {
            Md2AbntError::MissingInput {
                path: tech_path,
                source,
            }
        })?;

        let mut input = technical;
        input.push('\n');
        input.push_str(&self.work.front_matter_block()?);
        input.push('\n');
        input.push_str(&self.work.body_text);

        let mut args = self.base_args(DOCUMENT_TEMPLATE);
        args.extend([
            "-s".to_string(),
            "--top-level-division=chapter".to_string(),
            format!("--include-before-body={}", before_body.display()),
            format!("--include-after-body={}", after_body.display()),
        ]);
        for lua in &self.options.lua_filters {
            args.extend(["--lua-filter".to_string(), lua.clone()]);
        }
        for filter in &self.options.filters {
            args.extend(["--filter".to_string(), filter.clone()]);
        }
        args.extend(["--filter".to_string(), self.options.abnt_filter.clone()]);

        debug!("rendering document body");
        let section = run_converter(&self.options.pandoc_program, &args, &input).await?;
        if !section.success {
            warn!(stderr = %section.stderr, "body pass failed; keeping partial output");
        }
        Ok(section)
    }

    /// Flags shared by every pass: source format, template bundle, named
    /// template, LaTeX target.
    fn base_args(&self, template: &str) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.work.format.clone(),
            format!("--data-dir={}", self.options.templates_dir.display()),
            format!("--template={}", template),
            "-t".to_string(),
            "latex".to_string(),
        ]
    }
}

/// Spawn the converter, feed `input` on stdin, and drain stdout/stderr
/// concurrently until the process exits.
async fn run_converter(
    program: &Path,
    args: &[String],
    input: &str,
) -> Result<RenderedSection, Md2AbntError> {
    let program_name = program.display().to_string();
    let pipe_err = |source: std::io::Error| Md2AbntError::PipeIo {
        program: program_name.clone(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Md2AbntError::SpawnFailed {
            program: program_name.clone(),
            source,
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| pipe_err(std::io::Error::other("stdin not captured")))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| pipe_err(std::io::Error::other("stdout not captured")))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| pipe_err(std::io::Error::other("stderr not captured")))?;

    let payload = input.as_bytes();
    let write_input = async move {
        // A converter that dies before consuming its input yields EPIPE
        // here; that surfaces through the exit status, not as pipe I/O.
        let wrote = match stdin.write_all(payload).await {
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        };
        // Dropping stdin closes the pipe; the child must see EOF while the
        // output pipes are still being drained.
        drop(stdin);
        wrote
    };
    let read_stdout = async {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).await.map(|_| buf)
    };
    let read_stderr = async {
        let mut buf = String::new();
        stderr.read_to_string(&mut buf).await.map(|_| buf)
    };

    let (wrote, out, err) = tokio::join!(write_input, read_stdout, read_stderr);
    wrote.map_err(&pipe_err)?;
    let text = out.map_err(&pipe_err)?;
    let diagnostics = err.map_err(&pipe_err)?;

    let status = child.wait().await.map_err(&pipe_err)?;

    Ok(RenderedSection {
        text,
        success: status.success(),
        stderr: diagnostics,
    })
}
