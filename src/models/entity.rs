//! The file entity model: a recursive tree of categories and collections
//! describing the discovered input files, plus the per-preset annotation
//! nodes layered on top of it.
//!
//! The tree is built once from the directory-layout configuration and then
//! repopulated from disk on demand (see [`crate::services::FileLibrary`]).
//! Preset trees generated by [`crate::services::PresetResolver`] mirror the
//! input tree structurally, replacing every [`FileCollection`] leaf with one
//! or more [`PresetCollection`] nodes that share the underlying collection.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors raised while constructing file entities.
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("{0} is not an existing directory")]
    NotADirectory(Utf8PathBuf),
}

/// Split a file name into `(base, extension)` where the extension keeps its
/// leading dot and is empty when the name has none.
///
/// Dotfiles such as `.gitignore` are treated as having no extension, and only
/// the last dot counts: `a.b.c` splits into `("a.b", ".c")`.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && !file_name[..idx].bytes().all(|b| b == b'.') => {
            (&file_name[..idx], &file_name[idx..])
        }
        _ => (file_name, ""),
    }
}

fn base_name(name: &str) -> String {
    Utf8Path::new(name)
        .file_name()
        .unwrap_or(name)
        .to_string()
}

/// A shared, mutably lockable collection handle.
///
/// Collections are owned by the input tree but also referenced by every
/// preset tree generated from it, so they live behind `Arc<RwLock<_>>`. The
/// input tree is the only writer; preset nodes only take read locks.
pub type SharedCollection = Arc<RwLock<FileCollection>>;

/// Leaf node holding one input directory and its current file listing.
///
/// `file_exts` is derived data: after every mutation it equals the exact set
/// of extensions found among `files`.
#[derive(Debug, Clone)]
pub struct FileCollection {
    pub name: String,
    dir_path: Utf8PathBuf,
    files: Vec<String>,
    file_exts: HashSet<String>,
}

impl FileCollection {
    /// Create a collection rooted at an existing directory.
    ///
    /// Directory components are stripped from the initial file names.
    ///
    /// # Errors
    /// [`EntityError::NotADirectory`] when `dir_path` does not name an
    /// existing directory.
    pub fn new(
        name: impl Into<String>,
        dir_path: impl Into<Utf8PathBuf>,
        files: Vec<String>,
    ) -> Result<Self, EntityError> {
        let dir_path = dir_path.into();
        if !dir_path.is_dir() {
            return Err(EntityError::NotADirectory(dir_path));
        }

        let mut collection = Self {
            name: name.into(),
            dir_path,
            files: Vec::new(),
            file_exts: HashSet::new(),
        };
        collection.replace_files(files);
        Ok(collection)
    }

    /// Convenience constructor returning the shared handle used by the trees.
    pub fn shared(
        name: impl Into<String>,
        dir_path: impl Into<Utf8PathBuf>,
        files: Vec<String>,
    ) -> Result<SharedCollection, EntityError> {
        Ok(Arc::new(RwLock::new(Self::new(name, dir_path, files)?)))
    }

    fn recalculate_extensions(&mut self) {
        self.file_exts = self
            .files
            .iter()
            .map(|file| split_extension(file).1.to_string())
            .collect();
    }

    /// Append one file name (path components stripped).
    pub fn add_file(&mut self, file_name: &str) {
        self.files.push(base_name(file_name));
        self.recalculate_extensions();
    }

    /// Append several file names (path components stripped).
    pub fn add_files<I, S>(&mut self, file_names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.files
            .extend(file_names.into_iter().map(|name| base_name(name.as_ref())));
        self.recalculate_extensions();
    }

    /// Remove the first file matching `file_name`. No-op when absent.
    pub fn remove_file(&mut self, file_name: &str) {
        let target = base_name(file_name);
        if let Some(pos) = self.files.iter().position(|f| *f == target) {
            self.files.remove(pos);
            self.recalculate_extensions();
        }
    }

    /// Replace the entire file list atomically, stripping path components
    /// and recomputing the derived extension set.
    pub fn replace_files<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.files = files
            .into_iter()
            .map(|name| base_name(name.as_ref()))
            .collect();
        self.recalculate_extensions();
    }

    pub fn dir_path(&self) -> &Utf8Path {
        &self.dir_path
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// The derived set of extensions present in [`files`](Self::files).
    pub fn file_exts(&self) -> &HashSet<String> {
        &self.file_exts
    }
}

/// Per-preset leaf pairing a source collection with its export requirements.
///
/// When the preset requires suffixes, the resolver emits one node per suffix;
/// each node carries the full suffix sequence plus the one suffix it stands
/// for, which becomes the default filter when no override is passed.
#[derive(Debug, Clone)]
pub struct PresetCollection {
    pub name: String,
    source: SharedCollection,
    export_dir: Utf8PathBuf,
    required_exts: Option<HashSet<String>>,
    required_suffixes: Option<Vec<String>>,
    suffix: Option<String>,
}

impl PresetCollection {
    pub fn new(
        name: impl Into<String>,
        source: SharedCollection,
        export_dir: impl Into<Utf8PathBuf>,
        required_exts: Option<HashSet<String>>,
        required_suffixes: Option<Vec<String>>,
        suffix: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            export_dir: export_dir.into(),
            required_exts,
            required_suffixes,
            suffix,
        }
    }

    /// Whether one file satisfies this node's requirements.
    ///
    /// Suffixes are checked against the base name with the extension
    /// stripped; a specific suffix wins over the any-of check. A file can
    /// only pass through an explicit extension match, so a node with no
    /// extension requirement rejects every file. That asymmetry is load
    /// bearing for the review screens and is covered by tests.
    fn file_passes(&self, file_name: &str, suffix_override: Option<&str>) -> bool {
        let (base, ext) = split_extension(file_name);

        if let Some(suffixes) = &self.required_suffixes {
            match suffix_override.or(self.suffix.as_deref()) {
                Some(suffix) => {
                    if !base.ends_with(suffix) {
                        return false;
                    }
                }
                None => {
                    if !suffixes.iter().any(|suffix| base.ends_with(suffix.as_str())) {
                        return false;
                    }
                }
            }
        }

        if let Some(exts) = &self.required_exts {
            if exts.contains(ext) {
                return true;
            }
        }

        false
    }

    /// The source files that satisfy the requirements, in collection order.
    ///
    /// `suffix_override` narrows the suffix check to one specific suffix;
    /// without it the node's own designated suffix applies, falling back to
    /// matching any required suffix.
    pub fn filtered_files(&self, suffix_override: Option<&str>) -> Vec<String> {
        let source = self.source.read().unwrap();
        source
            .files()
            .iter()
            .filter(|file| self.file_passes(file, suffix_override))
            .cloned()
            .collect()
    }

    /// Required extensions that are actually present in the source
    /// collection, or all present extensions when nothing is required.
    pub fn passing_exts(&self) -> HashSet<String> {
        let source = self.source.read().unwrap();
        match &self.required_exts {
            Some(required) => required.intersection(source.file_exts()).cloned().collect(),
            None => source.file_exts().clone(),
        }
    }

    /// Required extensions missing from the source collection, empty when
    /// nothing is required.
    pub fn failing_exts(&self) -> HashSet<String> {
        let source = self.source.read().unwrap();
        match &self.required_exts {
            Some(required) => required.difference(source.file_exts()).cloned().collect(),
            None => HashSet::new(),
        }
    }

    pub fn source(&self) -> &SharedCollection {
        &self.source
    }

    pub fn export_dir(&self) -> &Utf8Path {
        &self.export_dir
    }

    pub fn required_exts(&self) -> Option<&HashSet<String>> {
        self.required_exts.as_ref()
    }

    pub fn required_suffixes(&self) -> Option<&[String]> {
        self.required_suffixes.as_deref()
    }

    /// The one suffix this node was emitted for, when the preset uses them.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }
}

/// Tagged variant over the three entity kinds that can appear in a tree.
#[derive(Debug, Clone)]
pub enum FileEntity {
    Collection(SharedCollection),
    Preset(PresetCollection),
    Category(FileCategory),
}

impl FileEntity {
    /// The entity's display name (cloned, since collections sit behind a
    /// lock).
    pub fn name(&self) -> String {
        match self {
            FileEntity::Collection(collection) => collection.read().unwrap().name.clone(),
            FileEntity::Preset(preset) => preset.name.clone(),
            FileEntity::Category(category) => category.name.clone(),
        }
    }
}

/// Internal tree node grouping child entities.
///
/// Children keep insertion order; lookups return the first name match.
#[derive(Debug, Clone, Default)]
pub struct FileCategory {
    pub name: String,
    children: Vec<FileEntity>,
}

impl FileCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn add(&mut self, entity: FileEntity) {
        self.children.push(entity);
    }

    /// First direct child with a matching name. Absence is not an error.
    pub fn get(&self, name: &str) -> Option<&FileEntity> {
        self.children.iter().find(|child| child.name() == name)
    }

    /// Remove the first direct child with a matching name. No-op when
    /// absent.
    pub fn remove(&mut self, name: &str) {
        if let Some(pos) = self.children.iter().position(|child| child.name() == name) {
            self.children.remove(pos);
        }
    }

    pub fn children(&self) -> &[FileEntity] {
        &self.children
    }

    /// Apply `visitor` to each direct child in order.
    ///
    /// With `stop_on_result`, the first `Some` value ends the walk and is
    /// returned; otherwise visitor results are discarded.
    pub fn for_each<T, F>(&self, mut visitor: F, stop_on_result: bool) -> Option<T>
    where
        F: FnMut(&FileEntity) -> Option<T>,
    {
        for child in &self.children {
            let result = visitor(child);
            if stop_on_result && result.is_some() {
                return result;
            }
        }
        None
    }

    /// Depth-first pre-order traversal.
    ///
    /// The visitor runs on Category nodes themselves before their children
    /// are walked; recursion into a category is skipped only when it already
    /// produced a stopping result. Leaves get the visitor directly. File
    /// search relies on this shape for early termination at matching leaves.
    pub fn for_each_recursive<T, F>(&self, mut visitor: F, stop_on_result: bool) -> Option<T>
    where
        F: FnMut(&FileEntity) -> Option<T>,
    {
        self.walk(&mut visitor, stop_on_result)
    }

    fn walk<T, F>(&self, visitor: &mut F, stop_on_result: bool) -> Option<T>
    where
        F: FnMut(&FileEntity) -> Option<T>,
    {
        for child in &self.children {
            let result = match child {
                FileEntity::Category(category) => {
                    let mut result = visitor(child);
                    if !stop_on_result || result.is_none() {
                        result = category.walk(visitor, stop_on_result);
                    }
                    result
                }
                _ => visitor(child),
            };

            if stop_on_result && result.is_some() {
                return result;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn collection(dir: &TempDir, files: &[&str]) -> FileCollection {
        FileCollection::new(
            "test",
            Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap(),
            files.iter().map(|f| f.to_string()).collect(),
        )
        .unwrap()
    }

    fn shared(dir: &TempDir, files: &[&str]) -> SharedCollection {
        Arc::new(RwLock::new(collection(dir, files)))
    }

    fn exts(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.png"), ("a", ".png"));
        assert_eq!(split_extension("a.b.c"), ("a.b", ".c"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".gitignore"), (".gitignore", ""));
        assert_eq!(split_extension(""), ("", ""));
    }

    #[test]
    fn test_collection_rejects_missing_directory() {
        let result = FileCollection::new("bad", "/definitely/not/a/dir", vec![]);
        assert!(matches!(result, Err(EntityError::NotADirectory(_))));
    }

    #[test]
    fn test_collection_strips_paths_and_derives_extensions() {
        let dir = TempDir::new().unwrap();
        let c = collection(&dir, &["some/dir/a.png", "b.txt"]);

        assert_eq!(c.files(), ["a.png", "b.txt"]);
        assert_eq!(*c.file_exts(), exts(&[".png", ".txt"]));
    }

    #[test]
    fn test_extension_set_tracks_every_mutation() {
        let dir = TempDir::new().unwrap();
        let mut c = collection(&dir, &["a.png"]);

        c.add_file("b.txt");
        assert_eq!(*c.file_exts(), exts(&[".png", ".txt"]));

        c.remove_file("b.txt");
        assert_eq!(*c.file_exts(), exts(&[".png"]));

        c.replace_files(["x.fbx".to_string(), "y.fbx".to_string()]);
        assert_eq!(*c.file_exts(), exts(&[".fbx"]));
    }

    #[test]
    fn test_remove_absent_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut c = collection(&dir, &["a.png"]);
        c.remove_file("missing.png");
        assert_eq!(c.files(), ["a.png"]);
    }

    #[test]
    fn test_category_get_and_remove() {
        let dir = TempDir::new().unwrap();
        let mut category = FileCategory::new("root");
        category.add(FileEntity::Collection(shared(&dir, &["a.png"])));

        assert!(category.get("test").is_some());
        assert!(category.get("nope").is_none());

        category.remove("nope"); // no-op
        assert_eq!(category.children().len(), 1);
        category.remove("test");
        assert!(category.children().is_empty());
    }

    #[test]
    fn test_recursive_traversal_is_preorder_and_visits_categories() {
        let dir = TempDir::new().unwrap();

        let b = shared(&dir, &[]);
        b.write().unwrap().name = "B".to_string();
        let c = shared(&dir, &[]);
        c.write().unwrap().name = "C".to_string();

        let mut a = FileCategory::new("A");
        a.add(FileEntity::Collection(b));
        a.add(FileEntity::Collection(c));

        let mut root = FileCategory::new("root");
        root.add(FileEntity::Category(a));

        let mut visited = Vec::new();
        let result = root.for_each_recursive(
            |entity| {
                let name = entity.name();
                visited.push(name.clone());
                (name == "C").then_some(name)
            },
            true,
        );

        assert_eq!(result.as_deref(), Some("C"));
        assert_eq!(visited, ["A", "B", "C"]);
    }

    #[test]
    fn test_traversal_without_stop_ignores_results() {
        let dir = TempDir::new().unwrap();
        let mut root = FileCategory::new("root");
        root.add(FileEntity::Collection(shared(&dir, &[])));

        let result: Option<String> = root.for_each_recursive(|e| Some(e.name()), false);
        assert!(result.is_none());
    }

    #[test]
    fn test_for_each_stops_on_first_result() {
        let dir = TempDir::new().unwrap();
        let mut root = FileCategory::new("root");
        for name in ["one", "two", "three"] {
            let c = shared(&dir, &[]);
            c.write().unwrap().name = name.to_string();
            root.add(FileEntity::Collection(c));
        }

        let mut calls = 0;
        let result = root.for_each(
            |entity| {
                calls += 1;
                (entity.name() == "two").then_some(entity.name())
            },
            true,
        );

        assert_eq!(result.as_deref(), Some("two"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_filtered_files_by_suffix_and_extension() {
        let dir = TempDir::new().unwrap();
        let source = shared(&dir, &["a_Color.png", "a_Normal.png", "b.txt"]);
        let preset = PresetCollection::new(
            "textures",
            source,
            "./out/",
            Some(exts(&[".png"])),
            Some(vec!["_Color".to_string()]),
            None,
        );

        assert_eq!(preset.filtered_files(None), ["a_Color.png"]);
        assert_eq!(preset.passing_exts(), exts(&[".png"]));
        assert!(preset.failing_exts().is_empty());
    }

    #[test]
    fn test_suffix_override_narrows_the_match() {
        let dir = TempDir::new().unwrap();
        let source = shared(&dir, &["a_Color.png", "a_Normal.png"]);
        let preset = PresetCollection::new(
            "textures",
            source,
            "./out/",
            Some(exts(&[".png"])),
            Some(vec!["_Color".to_string(), "_Normal".to_string()]),
            None,
        );

        // Any-of without an override, one specific suffix with one.
        assert_eq!(
            preset.filtered_files(None),
            ["a_Color.png", "a_Normal.png"]
        );
        assert_eq!(preset.filtered_files(Some("_Normal")), ["a_Normal.png"]);
    }

    #[test]
    fn test_designated_suffix_is_the_default_filter() {
        let dir = TempDir::new().unwrap();
        let source = shared(&dir, &["a_Color.png", "a_Normal.png"]);
        let preset = PresetCollection::new(
            "textures",
            source,
            "./out/",
            Some(exts(&[".png"])),
            Some(vec!["_Color".to_string(), "_Normal".to_string()]),
            Some("_Color".to_string()),
        );

        assert_eq!(preset.filtered_files(None), ["a_Color.png"]);
    }

    #[test]
    fn test_failing_extensions_lists_missing_requirements() {
        let dir = TempDir::new().unwrap();
        let source = shared(&dir, &["a.png"]);
        let preset = PresetCollection::new(
            "textures",
            source,
            "./out/",
            Some(exts(&[".png", ".fbx"])),
            None,
            None,
        );

        assert_eq!(preset.failing_exts(), exts(&[".fbx"]));
        assert_eq!(preset.passing_exts(), exts(&[".png"]));
    }

    #[test]
    fn test_no_extension_requirement_never_passes() {
        let dir = TempDir::new().unwrap();
        let source = shared(&dir, &["a.png", "b.txt"]);
        let preset = PresetCollection::new("anything", source, "./out/", None, None, None);

        assert!(preset.filtered_files(None).is_empty());
        // Pass/fail sets still report the actual contents.
        assert_eq!(preset.passing_exts(), exts(&[".png", ".txt"]));
        assert!(preset.failing_exts().is_empty());
    }

    proptest! {
        #[test]
        fn prop_extension_set_matches_files(names in proptest::collection::vec("[a-z]{1,8}(\\.[a-z]{1,4})?", 0..20)) {
            let dir = TempDir::new().unwrap();
            let mut c = collection(&dir, &[]);
            c.replace_files(names.iter().map(String::as_str));

            let expected: HashSet<String> = c
                .files()
                .iter()
                .map(|f| split_extension(f).1.to_string())
                .collect();
            prop_assert_eq!(c.file_exts().clone(), expected);
        }
    }
}
