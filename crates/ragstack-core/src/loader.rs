//! Plain-text document loading from a directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Document;

#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    limit: Option<usize>,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Load every `.txt` file under `root`, sorted by path. The document id is
    /// the file stem, the title the file name and the source the full path.
    pub fn load_directory(&self, root: &Path) -> Result<Vec<Document>> {
        if !root.is_dir() {
            return Err(Error::NotFound(format!("directory {}", root.display())));
        }
        let mut files = list_txt_files(root);
        if let Some(limit) = self.limit {
            if files.len() > limit {
                files.truncate(limit);
                info!(limit, "limiting documents loaded");
            }
        }
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let text = read_file_content(path)?;
            let id = path.file_stem().map_or_else(|| path.to_string_lossy().to_string(), |s| s.to_string_lossy().to_string());
            let title = path.file_name().map_or_else(|| id.clone(), |s| s.to_string_lossy().to_string());
            debug!(path = %path.display(), chars = text.chars().count(), "loaded document");
            documents.push(Document::new(id, text).with_title(title).with_source(path.to_string_lossy()));
        }
        info!(root = %root.display(), documents = documents.len(), "loaded text documents");
        Ok(documents)
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(path).map_err(|e| Error::storage(format!("reading {}", path.display()), e))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}
