//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::models::CourseDocument;
use crate::rag::RagSystem;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the ingest command.
pub async fn run_ingest(path: &str, force: bool, settings: Settings) -> Result<()> {
    let files = collect_document_files(Path::new(path))?;
    if files.is_empty() {
        Output::warning(&format!("No course document files found under '{}'", path));
        return Ok(());
    }

    let mut documents = Vec::with_capacity(files.len());
    for file in &files {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let document: CourseDocument = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid course document {}", file.display()))?;
        documents.push(document);
    }

    let system = RagSystem::new(&settings)?;

    let pb = Output::progress_bar(documents.len() as u64, "Indexing courses");
    let mut courses_added = 0;
    let mut chunks_indexed = 0;
    let mut skipped = Vec::new();

    for document in &documents {
        pb.set_message(document.course.title.clone());
        let report = system
            .add_course_documents(std::slice::from_ref(document), !force)
            .await?;
        courses_added += report.courses_added;
        chunks_indexed += report.chunks_indexed;
        skipped.extend(report.skipped);
        pb.inc(1);
    }
    pb.finish_and_clear();

    for title in &skipped {
        Output::info(&format!("Skipped '{}' (already indexed, use --force)", title));
    }
    Output::success(&format!(
        "Indexed {} courses ({} chunks)",
        courses_added, chunks_indexed
    ));

    Ok(())
}

/// Resolve a path argument to the JSON files it names.
fn collect_document_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to read directory {}", path.display()))?
    {
        let entry = entry?;
        let candidate = entry.path();
        if candidate.extension().is_some_and(|ext| ext == "json") {
            files.push(candidate);
        }
    }
    files.sort();
    Ok(files)
}
