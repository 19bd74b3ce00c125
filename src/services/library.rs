use crate::models::{DirEntry, DirLayout, FileCategory, FileCollection, FileEntity};
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Match criteria for [`FileLibrary::find_file`]. All set fields must hold.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub contains: Option<String>,
}

impl FileQuery {
    fn is_empty(&self) -> bool {
        self.starts_with.is_none() && self.ends_with.is_none() && self.contains.is_none()
    }

    fn matches(&self, file_name: &str) -> bool {
        if let Some(prefix) = &self.starts_with {
            if !file_name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(suffix) = &self.ends_with {
            if !file_name.ends_with(suffix.as_str()) {
                return false;
            }
        }
        if let Some(needle) = &self.contains {
            if !file_name.contains(needle.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Owner of the input file tree.
///
/// Builds the tree once from the directory-layout document (category →
/// optional subcategory → collection, source paths resolved against the base
/// path) and repopulates the collections from disk on [`reload`](Self::reload).
pub struct FileLibrary {
    base_path: Utf8PathBuf,
    input_tree: FileCategory,
}

impl FileLibrary {
    /// Build the input tree from a layout and populate it from disk.
    ///
    /// # Errors
    /// Fails when a configured directory does not exist or cannot be listed.
    pub fn from_layout(layout: &DirLayout, base_path: impl AsRef<Utf8Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        let mut input_tree = FileCategory::new("input");

        for (name, entry) in &layout.categories {
            match entry {
                DirEntry::Path(path) => {
                    let collection =
                        FileCollection::shared(name, base_path.join(path), Vec::new())
                            .with_context(|| format!("invalid source for category '{name}'"))?;
                    input_tree.add(FileEntity::Collection(collection));
                }
                DirEntry::Subdirs(subdirs) => {
                    let mut category = FileCategory::new(name);
                    for (sub_name, path) in subdirs {
                        let collection =
                            FileCollection::shared(sub_name, base_path.join(path), Vec::new())
                                .with_context(|| {
                                    format!("invalid source for category '{name}/{sub_name}'")
                                })?;
                        category.add(FileEntity::Collection(collection));
                    }
                    input_tree.add(FileEntity::Category(category));
                }
            }
        }

        let mut library = Self {
            base_path,
            input_tree,
        };
        library.reload()?;
        Ok(library)
    }

    /// Re-list every collection directory and replace the file lists.
    ///
    /// Only regular files are kept; subdirectories are ignored. A directory
    /// that cannot be listed aborts the whole reload. Layout changes are not
    /// picked up, only file contents.
    pub fn reload(&mut self) -> Result<()> {
        let failure = self.input_tree.for_each_recursive(
            |entity| {
                let FileEntity::Collection(collection) = entity else {
                    return None;
                };
                let mut collection = collection.write().unwrap();
                match list_files(collection.dir_path()) {
                    Ok(files) => {
                        collection.replace_files(files);
                        None
                    }
                    Err(error) => Some(error),
                }
            },
            true,
        );

        match failure {
            Some(error) => Err(error.context("input file reload aborted")),
            None => {
                tracing::debug!("Reloaded input files under {}", self.base_path);
                Ok(())
            }
        }
    }

    /// First file in the input tree (pre-order) matching the query,
    /// returned as a full path.
    ///
    /// # Errors
    /// Fails when the query sets no criterion at all.
    pub fn find_file(&self, query: &FileQuery) -> Result<Option<Utf8PathBuf>> {
        if query.is_empty() {
            bail!("at least one of starts_with, ends_with, contains must be specified");
        }

        let found = self.input_tree.for_each_recursive(
            |entity| {
                let collection = match entity {
                    FileEntity::Collection(collection) => collection.clone(),
                    FileEntity::Preset(preset) => preset.source().clone(),
                    FileEntity::Category(_) => return None,
                };
                let collection = collection.read().unwrap();
                collection
                    .files()
                    .iter()
                    .find(|file| query.matches(file))
                    .map(|file| collection.dir_path().join(file))
            },
            true,
        );
        Ok(found)
    }

    pub fn input_tree(&self) -> &FileCategory {
        &self.input_tree
    }

    pub fn base_path(&self) -> &Utf8Path {
        &self.base_path
    }
}

fn list_files(dir: &Utf8Path) -> std::result::Result<Vec<String>, anyhow::Error> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to list {dir}"))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read an entry of {dir}"))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat an entry of {dir}"))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| anyhow!("non-UTF-8 file name in {dir}: {name:?}"))?;
        files.push(name);
    }
    // Directory iteration order is platform-dependent; keep listings stable.
    files.sort();
    Ok(files)
}
