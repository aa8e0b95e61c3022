//! Where baked documents end up
//!
//! Output goes either to an explicit path or into `<root>/<category>/<file>`,
//! where the category must be on an allow-list and the file name must be a
//! bare name.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FolderSink {
    root: PathBuf,
    categories: Vec<String>,
}

impl FolderSink {
    pub fn new(root: impl Into<PathBuf>, categories: Vec<String>) -> Self {
        Self {
            root: root.into(),
            categories,
        }
    }

    /// Destination for `filename` in `category`, after validation
    pub fn destination(&self, category: &str, filename: &str) -> Result<PathBuf> {
        if !self.categories.iter().any(|c| c == category) {
            bail!(
                "Unknown category '{}' (allowed: {})",
                category,
                self.categories.join(", ")
            );
        }
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(|c: char| c == '/' || c == '\\')
        {
            bail!("Invalid file name '{}'", filename);
        }
        Ok(self.root.join(category).join(filename))
    }

    /// Write `bytes`, creating the category folder if needed
    pub fn save(&self, category: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.destination(category, filename)?;
        write_file(&path, bytes)?;
        Ok(path)
    }

    /// PDF files per allowed category, sorted by name. Missing folders are
    /// listed as empty.
    pub fn list(&self) -> Result<Vec<(String, Vec<String>)>> {
        let mut listing = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let folder = self.root.join(category);
            let mut files = Vec::new();
            if folder.is_dir() {
                for entry in fs::read_dir(&folder)
                    .with_context(|| format!("Failed to read {}", folder.display()))?
                {
                    let entry = entry?;
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if entry.path().is_file() && name.to_ascii_lowercase().ends_with(".pdf") {
                        files.push(name);
                    }
                }
            }
            files.sort();
            listing.push((category.clone(), files));
        }
        Ok(listing)
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved");
    Ok(())
}
