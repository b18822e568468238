use publishr_core::merge::{MergeOutcome, SkipReason};
use publishr_core::{Project, ProjectBuilder};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const BIB: &str = r#"@book{smith2001,
  author = {Smith, John},
  title = {Rust Book},
  year = {2001},
}
"#;

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_continuous_footnote_numbering_across_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "metadata.en.yml", "continuous_footnote_numbering_ebook: true\n");
    write(
        dir.path(),
        "a.en.page",
        "---\ntitle: A\n---\nOne[^x] and two[^y].\n\n[^x]: First.\n[^y]: Second.\n",
    );
    write(dir.path(), "b.en.page", "---\ntitle: B\n---\nThree[^z].\n\n[^z]: Third.\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    let report = ProjectBuilder::new(project).build_ebook().unwrap();
    assert_eq!(report.files.len(), 2);

    let second = fs::read_to_string(dir.path().join("epub/b.en.html")).unwrap();
    assert!(second.contains(r##"<a href="#fn:3" ><sup> [3]</sup></a>"##));
    assert!(second.contains(r#"id="fn:3"><b>[3]</b>: "#));
    assert!(!second.contains("#fn:1"));
}

#[test]
fn test_continuous_numbering_counts_indented_definitions() {
    let dir = tempdir().unwrap();
    write(dir.path(), "metadata.en.yml", "continuous_footnote_numbering_ebook: true\n");
    write(dir.path(), "a.en.page", "One[^x].\n\n [^x]: First.\n");
    write(dir.path(), "b.en.page", "Three[^z].\n\n[^z]: Third.\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    ProjectBuilder::new(project).build_ebook().unwrap();

    let second = fs::read_to_string(dir.path().join("epub/b.en.html")).unwrap();
    assert!(second.contains(r##"<a href="#fn:2" ><sup> [2]</sup></a>"##));
    assert!(!second.contains("#fn:1\""));
}

#[test]
fn test_continuous_numbering_counts_citation_footnotes() {
    let dir = tempdir().unwrap();
    write(dir.path(), "metadata.en.yml", "continuous_footnote_numbering_ebook: true\n");
    write(dir.path(), "refs.en.bib", BIB);
    write(
        dir.path(),
        "a.en.page",
        "One[^x] and a claim CITE[12]{smith2001}.\n\n[^x]: First.\n",
    );
    write(dir.path(), "b.en.page", "Three[^z].\n\n[^z]: Third.\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    let report = ProjectBuilder::new(project).build_ebook().unwrap();
    assert!(report.diagnostics.iter().all(|d| d.code != "citation.missing"));

    let first = fs::read_to_string(dir.path().join("epub/a.en.html")).unwrap();
    assert!(first.contains(r##"<a href="#fn:2" ><sup> [2]</sup></a>"##));
    assert!(first.contains("Rust Book"));

    let second = fs::read_to_string(dir.path().join("epub/b.en.html")).unwrap();
    assert!(second.contains(r##"<a href="#fn:3" ><sup> [3]</sup></a>"##));
    assert!(second.contains(r#"id="fn:3"><b>[3]</b>: "#));
}

#[test]
fn test_footnotes_restart_without_continuous_numbering() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.page", "One[^x].\n\n[^x]: First.\n");
    write(dir.path(), "b.page", "Two[^x].\n\n[^x]: Second.\n");

    let project = Project::open(dir.path(), None).unwrap();
    ProjectBuilder::new(project).build_ebook().unwrap();

    let second = fs::read_to_string(dir.path().join("epub/b.html")).unwrap();
    assert!(second.contains(r##"<a href="#fn:1" ><sup> [1]</sup></a>"##));
}

#[test]
fn test_ebook_classic_citations_and_bibliography_page() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "metadata.en.yml",
        "ebook_citation_style: classic\nebook_citation_page_one: p.\nebook_citation_heading: References\n",
    );
    write(dir.path(), "refs.en.bib", BIB);
    write(dir.path(), "chapter.en.page", "---\n---\nSee CITE[12]{smith2001} and CITE[3]{nobody}.\n");
    write(dir.path(), "toc.en.txt", "Contents\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    let report = ProjectBuilder::new(project).build_ebook().unwrap();

    assert_eq!(report.merge, Some(MergeOutcome::Performed { fragments: 1 }));
    let names: Vec<String> = report
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["toc.en.html", "chapter.en.html", "bibliography.en.html"]);

    let chapter = fs::read_to_string(dir.path().join("epub/chapter.en.html")).unwrap();
    assert!(chapter.contains("[ 1 p. 12]"));
    assert!(chapter.contains("Missing definition for entry <b>nobody</b>"));

    let missing: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.code == "citation.missing")
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].source_path.as_deref(), Some("chapter.en.page"));

    let bibliography = fs::read_to_string(dir.path().join("epub/bibliography.en.html")).unwrap();
    assert!(bibliography.starts_with("<h1>References</h1>"));
    assert!(bibliography.contains("<p><b>[1]</b> Smith, <i>Rust Book</i>.</p>"));
}

#[test]
fn test_merge_runs_before_builds_and_is_idempotent() {
    let dir = tempdir().unwrap();
    write(dir.path(), "refs.en.bib", BIB);
    write(dir.path(), "chapter.en.page", "Plain text.\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    let builder = ProjectBuilder::new(project);

    builder.build_latex().unwrap();
    let first = fs::read_to_string(dir.path().join("bibliography.en.bib")).unwrap();
    builder.build_ebook().unwrap();
    let second = fs::read_to_string(dir.path().join("bibliography.en.bib")).unwrap();
    assert_eq!(first, second);

    fs::write(dir.path().join("bibliography.en.bib"), BIB).unwrap();
    let report = builder.build_ebook().unwrap();
    assert_eq!(
        report.merge,
        Some(MergeOutcome::Skipped(SkipReason::ManuallyOwned))
    );
}

#[test]
fn test_latex_build_renames_localized_images() {
    let dir = tempdir().unwrap();
    let images = dir.path().join("images");
    fs::create_dir(&images).unwrap();
    fs::write(images.join("map.en.eps"), b"%!PS").unwrap();
    fs::write(images.join("map.jpg"), b"jpg").unwrap();
    write(dir.path(), "chapter.en.page", "![A map](map.jpg)\n");
    write(dir.path(), "indexterms.en.txt", "map\n");

    let project = Project::open(dir.path(), Some("en")).unwrap();
    let report = ProjectBuilder::new(project).build_latex().unwrap();

    assert_eq!(report.files.len(), 1);
    let latex_dir = dir.path().join("latex");
    assert!(latex_dir.join("map-en.eps").exists());
    assert!(!latex_dir.join("map.en.eps").exists());
    assert!(!latex_dir.join("indexterms.en.tex").exists());

    let tex = fs::read_to_string(latex_dir.join("chapter.en.tex")).unwrap();
    assert!(tex.contains(r"\includegraphics{map-en}"));
    assert!(tex.contains(r"\caption{A map\index{map}}"));
}
