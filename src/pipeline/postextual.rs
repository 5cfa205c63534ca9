//! Back-matter assembly: the ordered postextual sections.
//!
//! Five positions, fixed order: references, glossary, appendices, annexes,
//! index. Glossary and index are stubs that contribute nothing yet but keep
//! their slots so adding them later cannot reorder the document. References
//! always render (the entries themselves reach LaTeX through the normalized
//! `.bib` file, not through pandoc); appendices and annexes inject their
//! content only when the work's predicate is set.
//!
//! Assembling back matter also triggers bibliography normalization — the
//! `.bib` artifact must exist before the LaTeX run, and this is the last
//! stage that owns bibliography data.

use crate::config::Options;
use crate::error::Md2AbntError;
use crate::pipeline::bibliography;
use crate::pipeline::renderer::SectionRenderer;
use crate::work::Work;
use tracing::info;

/// Artifact name of the persisted back-matter fragment.
pub const POSTEXTUAL_FILE: &str = "xxx-postextual.tex";

/// Render all postextual sections in order, write the normalized
/// bibliography, and return the concatenation.
pub async fn assemble(work: &Work, options: &Options) -> Result<String, Md2AbntError> {
    let renderer = SectionRenderer::new(work, options);
    let mut assembled = String::new();

    // 1. References: template only; the entries come from the .bib file.
    let references = renderer
        .render_section("postextual1-referencias", None, true)
        .await?;
    assembled.push_str(&references.text);

    // 2. Glossary: not implemented.

    // 3. Appendices.
    let appendices = renderer
        .render_section(
            "postextual3-apendices",
            work.has_appendices.then_some(work.appendices_text.as_str()),
            true,
        )
        .await?;
    assembled.push_str(&appendices.text);

    // 4. Annexes.
    let annexes = renderer
        .render_section(
            "postextual4-anexos",
            work.has_annexes.then_some(work.annexes_text.as_str()),
            true,
        )
        .await?;
    assembled.push_str(&annexes.text);

    // 5. Index: not implemented.

    bibliography::write_normalized(&work.bibliography_source, &options.output_dir)?;

    info!("back matter assembled");
    Ok(assembled)
}
