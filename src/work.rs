//! The source work: everything the pipeline reads, nothing it writes.
//!
//! A [`Work`] is constructed once per run by the caller (the CLI/config
//! layer is outside this crate) and is read-only to the pipeline. The
//! `configuration` map is insertion-ordered so its YAML serialization is
//! byte-for-byte identical every time it is re-embedded — it prefixes every
//! one of the ~20 converter passes, and pandoc template output must not
//! differ between sections because of map ordering.

use crate::error::Md2AbntError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The academic document to be produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Work {
    /// Pandoc source-format identifier, e.g. `markdown+smart`.
    pub format: String,

    /// Ordered document metadata (title, authors, institution, …).
    /// Serialized as a YAML front-matter block before every pass.
    pub configuration: IndexMap<String, serde_yaml::Value>,

    /// Main document content, in `format`.
    pub body_text: String,

    /// Raw bibliography text, in BibTeX.
    pub bibliography_source: String,

    /// Whether the work carries an errata section (content read from
    /// `errata.md` in the working directory).
    pub has_errata: bool,

    /// Whether the work carries appendices.
    pub has_appendices: bool,

    /// Whether the work carries annexes.
    pub has_annexes: bool,

    /// Appendices content, consumed only when `has_appendices`.
    pub appendices_text: String,

    /// Annexes content, consumed only when `has_annexes`.
    pub annexes_text: String,
}

impl Work {
    /// Serialize `configuration` to a YAML front-matter block followed by
    /// the separator line pandoc expects:
    ///
    /// ```text
    /// ---
    /// titulo: …
    /// ---
    ///
    /// ```
    pub fn front_matter_block(&self) -> Result<String, Md2AbntError> {
        let yaml = serde_yaml::to_string(&self.configuration)?;
        Ok(format!("---\n{yaml}---\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_work() -> Work {
        let mut configuration = IndexMap::new();
        configuration.insert("titulo".to_string(), "Sistemas".into());
        configuration.insert("autor".to_string(), "Fulano de Tal".into());
        configuration.insert("ano".to_string(), 2024.into());
        Work {
            format: "markdown".into(),
            configuration,
            ..Default::default()
        }
    }

    #[test]
    fn front_matter_block_is_delimited() {
        let block = sample_work().front_matter_block().unwrap();
        assert!(block.starts_with("---\n"));
        assert!(block.ends_with("---\n\n"));
        assert!(block.contains("titulo: Sistemas"));
    }

    #[test]
    fn front_matter_block_preserves_insertion_order() {
        let block = sample_work().front_matter_block().unwrap();
        let titulo = block.find("titulo").unwrap();
        let autor = block.find("autor").unwrap();
        let ano = block.find("ano").unwrap();
        assert!(titulo < autor && autor < ano);
    }

    #[test]
    fn front_matter_block_is_deterministic() {
        let work = sample_work();
        let a = work.front_matter_block().unwrap();
        let b = work.front_matter_block().unwrap();
        assert_eq!(a, b);
    }
}
