//! End-to-end pipeline tests against a stub converter.
//!
//! Real pandoc/latexmk installs are not assumed: each test builds a throwaway
//! template bundle and a small shell script standing in for pandoc. The stub
//! prints a `[[template-name]]` marker, echoes its stdin, and inlines any
//! `--include-*-body` files, which is enough to observe section order,
//! content gating, staging lifetime, and the non-fatal failure policy from
//! the outside.

#![cfg(unix)]

use md2abnt::pipeline::pretextual::SECTIONS;
use md2abnt::{convert, Md2AbntError, Options, Work};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────

const STUB_BODY: &str = r#"
template=""
before=""
after=""
for arg in "$@"; do
  case "$arg" in
    --template=*) template="${arg#--template=}" ;;
    --include-before-body=*)
      before="${arg#*=}"
      echo "$before" >> "$(dirname "$0")/includes.txt" ;;
    --include-after-body=*)
      after="${arg#*=}"
      echo "$after" >> "$(dirname "$0")/includes.txt" ;;
  esac
done
[ -n "$before" ] && cat "$before"
printf '[[%s]]\n' "$template"
cat
[ -n "$after" ] && cat "$after"
exit 0
"#;

/// Stub that fails (stderr + exit 1) for one template and behaves normally
/// for all others.
fn failing_stub_body(bad_template: &str) -> String {
    format!(
        r#"
template=""
for arg in "$@"; do
  case "$arg" in
    --template=*) template="${{arg#--template=}}" ;;
  esac
done
if [ "$template" = "{bad_template}" ]; then
  cat >/dev/null
  echo "template exploded" >&2
  exit 1
fi
printf '[[%s]]\n' "$template"
cat
exit 0
"#
    )
}

struct Fixture {
    /// Owns the stub, the template bundle, and the output directory.
    dir: tempfile::TempDir,
    options: Options,
}

fn fixture_with_stub(stub_body: &str) -> Fixture {
    // Surface pipeline diagnostics when running with RUST_LOG set.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let dir = tempfile::tempdir().unwrap();

    let stub = dir.path().join("pandoc-stub.sh");
    fs::write(&stub, format!("#!/bin/sh\n{stub_body}")).unwrap();
    let mut perms = fs::metadata(&stub).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&stub, perms).unwrap();

    let templates = dir.path().join("bundle").join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("configuracao-tecnica.yaml"), "# TECHCONF\n").unwrap();

    let options = Options::builder(dir.path().join("out"), dir.path().join("bundle"))
        .pandoc_program(&stub)
        .abnt_filter("true") // /usr/bin/true: the stub ignores --filter anyway
        .extract_text(false)
        .build()
        .unwrap();

    Fixture { dir, options }
}

fn fixture() -> Fixture {
    fixture_with_stub(STUB_BODY)
}

fn sample_work() -> Work {
    let mut work = Work::default();
    work.format = "markdown".into();
    work.configuration
        .insert("titulo".into(), "Um Trabalho".into());
    work.body_text = "# Introducao\n\nCORPO-DO-TEXTO\n".into();
    work
}

fn marker_positions(haystack: &str, markers: &[String]) -> Vec<usize> {
    markers
        .iter()
        .map(|m| {
            haystack
                .find(m.as_str())
                .unwrap_or_else(|| panic!("marker {m} missing from:\n{haystack}"))
        })
        .collect()
}

// ── Front matter ─────────────────────────────────────────────────────────

#[tokio::test]
async fn front_matter_renders_all_sections_in_order() {
    let fx = fixture();
    let conversion = convert(&sample_work(), &fx.options).await.unwrap();

    let markers: Vec<String> = SECTIONS
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[[pretextual{}-{}]]", i + 1, s))
        .collect();
    let positions = marker_positions(&conversion.pretextual_tex, &markers);
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "sections out of order: {positions:?}"
    );
}

#[tokio::test]
async fn front_matter_embeds_configuration_before_every_section() {
    let fx = fixture();
    let conversion = convert(&sample_work(), &fx.options).await.unwrap();
    // The stub echoes stdin, so every pass should carry the YAML block.
    let count = conversion.pretextual_tex.matches("titulo: Um Trabalho").count();
    assert_eq!(count, SECTIONS.len());
}

// ── Back matter ──────────────────────────────────────────────────────────

#[tokio::test]
async fn back_matter_renders_three_passes_and_gates_content() {
    let fx = fixture();
    let mut work = sample_work();
    work.has_appendices = true;
    work.appendices_text = "TEXTO-DOS-APENDICES".into();
    // has_annexes stays false; annexes_text must not leak through.
    work.annexes_text = "TEXTO-DOS-ANEXOS".into();

    let conversion = convert(&work, &fx.options).await.unwrap();
    let post = &conversion.postextual_tex;

    let markers = vec![
        "[[postextual1-referencias]]".to_string(),
        "[[postextual3-apendices]]".to_string(),
        "[[postextual4-anexos]]".to_string(),
    ];
    let positions = marker_positions(post, &markers);
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(post.contains("TEXTO-DOS-APENDICES"));
    assert!(!post.contains("TEXTO-DOS-ANEXOS"));
}

#[tokio::test]
async fn back_matter_writes_normalized_bibliography() {
    let fx = fixture();
    let mut work = sample_work();
    work.bibliography_source =
        "@book{b, title = {{Systems: Design Patterns}}, year = 2020 }".into();

    let conversion = convert(&work, &fx.options).await.unwrap();
    let bib = fs::read_to_string(&conversion.bibliography_path).unwrap();
    assert!(bib.contains("title = {Systems}"), "got:\n{bib}");
    assert!(bib.contains("subtitle = {Design Patterns}"));
}

#[tokio::test]
async fn malformed_bibliography_fails_the_run_but_keeps_prior_artifacts() {
    let fx = fixture();
    let mut work = sample_work();
    work.bibliography_source = "@book{broken, title = {no closing".into();

    let err = convert(&work, &fx.options).await.unwrap_err();
    assert!(matches!(err, Md2AbntError::BibliographyParse { .. }));

    // Front matter was already persisted and is not rolled back.
    assert!(fx.options.output_dir.join("xxx-pretextual.tex").is_file());
    // The canonical document was never reached.
    assert!(!fx.options.output_dir.join("xxx-trabalho-academico.tex").exists());
}

// ── Body pass ────────────────────────────────────────────────────────────

#[tokio::test]
async fn body_pass_prepends_technical_config_and_consumes_staging() {
    let fx = fixture();
    let conversion = convert(&sample_work(), &fx.options).await.unwrap();
    let doc = &conversion.document_tex;

    // Stdin order: technical config, then work configuration, then body.
    // The configuration block also occurs in the echoed section passes, so
    // look for the occurrence following the technical config specifically.
    let tech = doc.find("# TECHCONF").expect("technical config missing");
    let config = tech + doc[tech..].find("titulo: Um Trabalho").unwrap();
    let body = doc.find("CORPO-DO-TEXTO").unwrap();
    assert!(tech < config && config < body);

    // The staging inclusions carry the section markers into the document.
    assert!(doc.contains("[[pretextual1-folha_de_rosto]]"));
    assert!(doc.contains("[[postextual1-referencias]]"));
    // Front matter precedes the body, back matter follows it.
    assert!(doc.find("[[pretextual1-folha_de_rosto]]").unwrap() < body);
    assert!(doc.find("[[postextual1-referencias]]").unwrap() > body);

    let on_disk = fs::read_to_string(&conversion.document_path).unwrap();
    assert_eq!(&on_disk, doc);
}

// ── Staging lifetime ─────────────────────────────────────────────────────

#[tokio::test]
async fn staging_artifacts_are_deleted_after_convert_returns() {
    let fx = fixture();
    convert(&sample_work(), &fx.options).await.unwrap();

    // The stub recorded the --include-*-body paths it was handed.
    let recorded = fs::read_to_string(fx.dir.path().join("includes.txt")).unwrap();
    let paths: Vec<&str> = recorded.lines().collect();
    assert_eq!(paths.len(), 2, "body pass should receive both staging files");
    for p in paths {
        assert!(
            !Path::new(p).exists(),
            "staging artifact leaked: {p}"
        );
    }
}

#[tokio::test]
async fn staging_artifacts_are_deleted_when_convert_errors() {
    let fx = fixture();

    // Make the canonical document path unwritable (a directory in its
    // place), so convert fails while persisting it — after the body pass
    // has already been handed both staging files.
    let blocked = fx.options.output_dir.join("xxx-trabalho-academico.tex");
    fs::create_dir_all(&blocked).unwrap();

    let err = convert(&sample_work(), &fx.options).await.unwrap_err();
    assert!(matches!(err, Md2AbntError::ArtifactWrite { .. }));

    let recorded = fs::read_to_string(fx.dir.path().join("includes.txt")).unwrap();
    let paths: Vec<&str> = recorded.lines().collect();
    assert_eq!(paths.len(), 2, "body pass should receive both staging files");
    for p in paths {
        assert!(
            !Path::new(p).exists(),
            "staging artifact leaked on the error path: {p}"
        );
    }
}

// ── Scenario 1: everything optional disabled ─────────────────────────────

#[tokio::test]
async fn minimal_work_produces_empty_optional_sections_and_trivial_bib() {
    let fx = fixture();
    let work = sample_work(); // all predicates false, empty bibliography

    let conversion = convert(&work, &fx.options).await.unwrap();

    // Errata section rendered (its marker is present) but carries no content
    // beyond the configuration block.
    assert!(conversion.pretextual_tex.contains("[[pretextual2-errata]]"));
    assert!(!conversion.postextual_tex.contains("TEXTO-DOS-APENDICES"));

    let bib = fs::read_to_string(&conversion.bibliography_path).unwrap();
    assert_eq!(bib, "", "empty bibliography normalizes to an empty artifact");
}

// ── Scenario 3: one failing section pass ─────────────────────────────────

#[tokio::test]
async fn failing_section_pass_is_non_fatal_and_document_is_still_written() {
    let fx = fixture_with_stub(&failing_stub_body("pretextual4-dedicatoria"));
    let conversion = convert(&sample_work(), &fx.options).await.unwrap();

    // The broken section contributed nothing…
    assert!(!conversion.pretextual_tex.contains("[[pretextual4-dedicatoria]]"));
    // …its neighbours are intact…
    assert!(conversion.pretextual_tex.contains("[[pretextual3-folha_de_aprovacao]]"));
    assert!(conversion.pretextual_tex.contains("[[pretextual5-agradecimentos]]"));
    // …and the canonical output exists.
    assert!(conversion.document_path.is_file());
}

// ── Fatal spawn failure ──────────────────────────────────────────────────

#[tokio::test]
async fn unspawnable_converter_is_fatal() {
    let fx = fixture();
    let options = Options::builder(
        fx.options.output_dir.clone(),
        fx.options.templates_dir.clone(),
    )
    .pandoc_program(PathBuf::from("/definitely/not/pandoc"))
    .build()
    .unwrap();

    let err = convert(&sample_work(), &options).await.unwrap_err();
    assert!(matches!(err, Md2AbntError::SpawnFailed { .. }));
}
