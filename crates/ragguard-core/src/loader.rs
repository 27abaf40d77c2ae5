//! Turns a department-per-folder data directory (and uploaded files) into
//! [`Document`]s.
//!
//! Layout: `<data_dir>/<department>/<file>`. Only folders named after a
//! configured department are read; each supported file directly inside one
//! becomes a single document whose identifier and source label are
//! `<department>/<file name>`.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::IngestSettings;
use crate::error::{Error, Result};
use crate::policy::AccessPolicy;
use crate::types::{Department, Document, DocumentDraft, DocumentId};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "csv"];

pub struct DocumentLoader<'a> {
    policy: &'a AccessPolicy,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(policy: &'a AccessPolicy) -> Self {
        Self { policy }
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load(data_dir, None)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        self.load(data_dir, Some(limit))
    }

    fn load(&self, data_dir: &Path, limit: Option<usize>) -> Result<Vec<Document>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let mut files = self.list_files(data_dir);
        if let Some(limit) = limit {
            if files.len() > limit {
                files.truncate(limit);
                debug!(limit, "limited directory load");
            }
        }

        let mut documents = Vec::with_capacity(files.len());
        for (department, path) in files {
            let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            let label = format!("{department}/{file_name}");
            let content = parse_document(&file_name, &fs::read(&path)?)?;
            documents.push(Document::new(
                DocumentDraft {
                    id: DocumentId::new(label.as_str()),
                    content,
                    department,
                    source_label: label,
                },
                self.policy,
            )?);
        }
        documents.sort_by(|a, b| a.id().cmp(b.id()));
        info!(count = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    fn list_files(&self, root: &Path) -> Vec<(Department, PathBuf)> {
        let mut files = Vec::new();
        let folders = WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name();
        for folder in folders.into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_dir()) {
            let department = Department::new(folder.file_name().to_string_lossy().as_ref());
            if !self.policy.contains_department(&department) {
                warn!(folder = %folder.path().display(), "skipping folder that names no configured department");
                continue;
            }
            let entries = WalkDir::new(folder.path()).min_depth(1).max_depth(1).sort_by_file_name();
            for entry in entries.into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
                if is_supported(entry.path()) {
                    files.push((department.clone(), entry.path().to_path_buf()));
                } else {
                    warn!(file = %entry.path().display(), "skipping unsupported file");
                }
            }
        }
        files
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    ext.is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Extract the text of an uploaded or on-disk file, chosen by extension.
pub fn parse_document(file_name: &str, bytes: &[u8]) -> Result<String> {
    let text = match extension_of(file_name).as_str() {
        "md" | "markdown" | "txt" => decode_text(file_name, bytes),
        "csv" => render_csv(file_name, bytes)?,
        "" => return Err(Error::UnsupportedFormat(format!("{file_name} has no extension"))),
        other => {
            return Err(Error::UnsupportedFormat(format!(
                ".{other} (supported: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    };
    if text.trim().is_empty() {
        return Err(Error::Parse { source_label: file_name.to_string(), reason: "no text content".into() });
    }
    Ok(text)
}

fn decode_text(file_name: &str, bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!(file = file_name, "invalid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Render CSV as a whitespace-aligned table: header line, then one line per row.
fn render_csv(file_name: &str, bytes: &[u8]) -> Result<String> {
    let parse_err = |e: csv::Error| Error::Parse { source_label: file_name.to_string(), reason: e.to_string() };
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let header: Vec<String> = reader.headers().map_err(parse_err)?.iter().map(str::to_string).collect();
    let mut rows = vec![header];
    for record in reader.records() {
        rows.push(record.map_err(parse_err)?.iter().map(str::to_string).collect());
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect();
    Ok(lines.join("\n"))
}

/// Guesses an upload's department from keywords in its file name.
#[derive(Debug, Clone)]
pub struct DepartmentKeywords {
    rules: Vec<(Department, Vec<String>)>,
}

impl DepartmentKeywords {
    pub fn from_settings(settings: &IngestSettings) -> Self {
        let rules = settings
            .department_keywords
            .iter()
            .map(|rule| {
                let keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                (Department::new(rule.department.as_str()), keywords)
            })
            .collect();
        Self { rules }
    }

    /// First rule, in configured order, with a keyword inside `file_name`.
    pub fn infer(&self, file_name: &str) -> Option<Department> {
        let name = file_name.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(department, _)| department.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_passes_through() {
        assert_eq!(parse_document("a.md", b"# Title\nbody").unwrap(), "# Title\nbody");
    }

    #[test]
    fn csv_renders_aligned_table() {
        let text = parse_document("q4.csv", b"region,revenue\nnorth,120\nsouth-east,95\n").unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "region      revenue");
        assert_eq!(lines[2], "south-east  95");
    }

    #[test]
    fn pdf_and_unknown_extensions_are_unsupported() {
        assert!(matches!(parse_document("report.pdf", b"%PDF"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(parse_document("image.png", b"x"), Err(Error::UnsupportedFormat(_))));
        assert!(matches!(parse_document("README", b"x"), Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn blank_content_is_a_parse_error() {
        assert!(matches!(parse_document("empty.md", b"  \n "), Err(Error::Parse { .. })));
    }

    #[test]
    fn department_inference_uses_first_matching_rule() {
        let keywords = DepartmentKeywords::from_settings(&IngestSettings::default());
        assert_eq!(keywords.infer("Q4_Financial_Report.pdf"), Some(Department::new("finance")));
        assert_eq!(keywords.infer("campaign_results.csv"), Some(Department::new("marketing")));
        assert_eq!(keywords.infer("payroll.md"), Some(Department::new("hr")));
        assert_eq!(keywords.infer("system_architecture.md"), Some(Department::new("engineering")));
        assert_eq!(keywords.infer("notes.md"), None);
    }
}
