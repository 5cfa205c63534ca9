//! Run options for the assembly pipeline.
//!
//! All pipeline behaviour outside the work itself is controlled through
//! [`Options`], built via its [`OptionsBuilder`]. The original system passed
//! a loose options mapping around and read `PANDOC_ABNT_BAT` from the
//! environment on every converter invocation; here every knob is an explicit
//! typed field, validated once at construction, then threaded through as an
//! immutable value.

use crate::error::Md2AbntError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File the templates directory must contain, relative to `templates/`.
pub const TECHNICAL_CONFIG_FILE: &str = "configuracao-tecnica.yaml";

/// Environment variable overriding the ABNT filter path. Read once by
/// [`OptionsBuilder::build`], never per invocation.
pub const ABNT_FILTER_ENV: &str = "PANDOC_ABNT_BAT";

/// Default ABNT filter executable when the environment does not override it.
pub const DEFAULT_ABNT_FILTER: &str = "pandoc_abnt";

/// Configuration for one pipeline run.
///
/// Built via [`Options::builder()`].
///
/// # Example
/// ```rust,no_run
/// use md2abnt::Options;
///
/// let options = Options::builder("build/", "/usr/share/limarka")
///     .lua_filter("paginas.lua")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Destination for every generated artifact. Created if absent.
    pub output_dir: PathBuf,

    /// Root of the template bundle consumed by pandoc (`--data-dir`). Must
    /// contain a `templates/` subtree with [`TECHNICAL_CONFIG_FILE`] and one
    /// template file per section identifier.
    pub templates_dir: PathBuf,

    /// Ordered `--filter` identifiers appended to the body pass, applied
    /// left to right.
    pub filters: Vec<String>,

    /// Ordered `--lua-filter` identifiers appended to the body pass.
    pub lua_filters: Vec<String>,

    /// Path of the ABNT normalization filter applied unconditionally to
    /// every pass. Resolved once at build time: `PANDOC_ABNT_BAT` if set,
    /// else `pandoc_abnt`.
    pub abnt_filter: String,

    /// Converter executable. Default `pandoc`; an explicit field so tests
    /// can substitute a stub.
    pub pandoc_program: PathBuf,

    /// Whether [`crate::pipeline::compile::compile`] extracts plain text
    /// from the produced PDF. Default: true.
    pub extract_text: bool,
}

impl Options {
    /// Create a builder with the two mandatory paths.
    pub fn builder(
        output_dir: impl Into<PathBuf>,
        templates_dir: impl Into<PathBuf>,
    ) -> OptionsBuilder {
        OptionsBuilder {
            options: Options {
                output_dir: output_dir.into(),
                templates_dir: templates_dir.into(),
                filters: Vec::new(),
                lua_filters: Vec::new(),
                abnt_filter: DEFAULT_ABNT_FILTER.to_string(),
                pandoc_program: PathBuf::from("pandoc"),
                extract_text: true,
            },
        }
    }

    /// Path of the technical-configuration front-matter file inside the
    /// template bundle.
    pub fn technical_config_path(&self) -> PathBuf {
        self.templates_dir
            .join("templates")
            .join(TECHNICAL_CONFIG_FILE)
    }
}

/// Builder for [`Options`].
#[derive(Debug)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Append one `--filter` identifier to the body pass.
    pub fn filter(mut self, f: impl Into<String>) -> Self {
        self.options.filters.push(f.into());
        self
    }

    /// Replace the whole `--filter` sequence.
    pub fn filters(mut self, fs: impl IntoIterator<Item = String>) -> Self {
        self.options.filters = fs.into_iter().collect();
        self
    }

    /// Append one `--lua-filter` identifier to the body pass.
    pub fn lua_filter(mut self, f: impl Into<String>) -> Self {
        self.options.lua_filters.push(f.into());
        self
    }

    /// Replace the whole `--lua-filter` sequence.
    pub fn lua_filters(mut self, fs: impl IntoIterator<Item = String>) -> Self {
        self.options.lua_filters = fs.into_iter().collect();
        self
    }

    /// Override the ABNT filter path (takes precedence over the
    /// environment).
    pub fn abnt_filter(mut self, path: impl Into<String>) -> Self {
        self.options.abnt_filter = path.into();
        self
    }

    /// Override the converter executable.
    pub fn pandoc_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.options.pandoc_program = program.into();
        self
    }

    /// Enable or disable plain-text extraction after compilation.
    pub fn extract_text(mut self, v: bool) -> Self {
        self.options.extract_text = v;
        self
    }

    /// Build the options, validating the template bundle.
    ///
    /// Resolves the ABNT filter from `PANDOC_ABNT_BAT` exactly once, unless
    /// the builder already overrode it.
    pub fn build(mut self) -> Result<Options, Md2AbntError> {
        if self.options.abnt_filter == DEFAULT_ABNT_FILTER {
            if let Ok(env_filter) = std::env::var(ABNT_FILTER_ENV) {
                if !env_filter.is_empty() {
                    self.options.abnt_filter = env_filter;
                }
            }
        }

        if self.options.output_dir.as_os_str().is_empty() {
            return Err(Md2AbntError::InvalidOptions(
                "output_dir must not be empty".into(),
            ));
        }

        validate_templates_dir(&self.options.templates_dir)?;
        Ok(self.options)
    }
}

/// Check the template bundle holds the technical-configuration file.
fn validate_templates_dir(dir: &Path) -> Result<(), Md2AbntError> {
    let tech = dir.join("templates").join(TECHNICAL_CONFIG_FILE);
    if !tech.is_file() {
        return Err(Md2AbntError::TemplatesDirInvalid {
            path: dir.to_path_buf(),
            file: TECHNICAL_CONFIG_FILE.to_string(),
        });
    }
    Ok(())
}
