//! Front-matter assembly: the ordered pretextual sections.
//!
//! ABNT front matter has a fixed section order; position *is* the document
//! order, so the identifier list below must never be reordered. Every
//! section renders unconditionally — an empty fragment is valid output for a
//! work that, say, has no epigraph — and only the errata section injects
//! content, read from `errata.md` in the working directory when the work
//! declares `has_errata`.

use crate::config::Options;
use crate::error::Md2AbntError;
use crate::pipeline::renderer::SectionRenderer;
use crate::work::Work;
use std::path::Path;
use tracing::info;

/// Artifact name of the persisted front-matter fragment.
pub const PRETEXTUAL_FILE: &str = "xxx-pretextual.tex";

/// File the errata content is read from, relative to the working directory.
pub const ERRATA_FILE: &str = "errata.md";

/// Ordered pretextual section identifiers. Entry *i* (1-indexed) renders
/// with template `pretextual{i}-{identifier}`.
pub const SECTIONS: [&str; 13] = [
    "folha_de_rosto",
    "errata",
    "folha_de_aprovacao",
    "dedicatoria",
    "agradecimentos",
    "epigrafe",
    "resumo",
    "abstract",
    "lista_ilustracoes",
    "lista_tabelas",
    "lista_siglas",
    "lista_simbolos",
    "sumario",
];

/// Template name for the section at `index` (0-based) — the 1-based
/// position is baked into the name so templates sort in document order.
pub fn template_name(index: usize, identifier: &str) -> String {
    format!("pretextual{}-{}", index + 1, identifier)
}

/// Render all pretextual sections in order and return the concatenation.
pub async fn assemble(work: &Work, options: &Options) -> Result<String, Md2AbntError> {
    let renderer = SectionRenderer::new(work, options);
    let mut assembled = String::new();

    for (index, identifier) in SECTIONS.iter().enumerate() {
        let content = section_content(work, identifier)?;
        let section = renderer
            .render_section(&template_name(index, identifier), content.as_deref(), false)
            .await?;
        assembled.push_str(&section.text);
    }

    info!(sections = SECTIONS.len(), "front matter assembled");
    Ok(assembled)
}

/// Injected content for one section: only errata currently carries any,
/// gated on the work's predicate. A missing `errata.md` while the gate is
/// set is fatal.
fn section_content(work: &Work, identifier: &str) -> Result<Option<String>, Md2AbntError> {
    if identifier != "errata" || !work.has_errata {
        return Ok(None);
    }
    let path = Path::new(ERRATA_FILE);
    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| Md2AbntError::MissingInput {
            path: path.to_path_buf(),
            source,
        })
}
