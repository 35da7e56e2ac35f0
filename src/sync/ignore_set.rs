use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::gitignore::Gitignore;
use ignore::Match;
use tracing::{debug, warn};

const GITIGNORE: &str = ".gitignore";

/// Paths excluded from synchronization.
///
/// Built once when a folder is armed: every `.gitignore` in the folder and in
/// its ancestors is compiled, and the files they match at that moment are
/// recorded. The rules stay available so files created later (build output)
/// are excluded as well.
#[derive(Default)]
pub struct IgnoreSet {
    paths: HashSet<PathBuf>,
    rules: Vec<Gitignore>,
}

impl IgnoreSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        Self {
            paths: paths.into_iter().collect(),
            rules: Vec::new(),
        }
    }

    pub fn from_folder(root: &Path) -> Self {
        let mut gitignores: Vec<PathBuf> = root
            .ancestors()
            .skip(1)
            .map(|dir| dir.join(GITIGNORE))
            .filter(|path| path.is_file())
            .collect();
        // Shallow rules first so deeper files can override them.
        gitignores.reverse();

        let mut nested = Vec::new();
        for entry in WalkBuilder::new(root).standard_filters(false).build() {
            match entry {
                Ok(entry) if entry.file_name() == GITIGNORE => nested.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable entry while collecting ignore files: {}", e),
            }
        }
        nested.sort_by_key(|path| path.components().count());
        gitignores.extend(nested);

        let mut rules = Vec::with_capacity(gitignores.len());
        for path in gitignores {
            let (rule, error) = Gitignore::new(&path);
            if let Some(error) = error {
                warn!("Partially invalid ignore file {}: {}", path.display(), error);
            }
            rules.push(rule);
        }

        let mut set = Self { paths: HashSet::new(), rules };
        let matched: Vec<PathBuf> = WalkBuilder::new(root)
            .standard_filters(false)
            .build()
            .filter_map(Result::ok)
            .map(|entry| entry.into_path())
            .filter(|path| set.matches_rules(path, path.is_dir()))
            .collect();
        set.paths.extend(matched);

        debug!(
            "Ignore set for {}: {} rule files, {} paths",
            root.display(),
            set.rules.len(),
            set.paths.len()
        );
        set
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path) || self.matches_rules(path, path.is_dir())
    }

    /// Like [`IgnoreSet::contains`] for a path that no longer exists. Its kind is
    /// unknown, so directory-only rules such as `target/` are tried as well.
    pub fn contains_removed(&self, path: &Path) -> bool {
        self.paths.contains(path) || self.matches_rules(path, false) || self.matches_rules(path, true)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.rules.is_empty()
    }

    fn matches_rules(&self, path: &Path, is_dir: bool) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if !path.starts_with(rule.path()) || path == rule.path() {
                continue;
            }
            match rule.matched_path_or_any_parents(path, is_dir) {
                Match::None => {}
                Match::Ignore(_) => ignored = true,
                Match::Whitelist(_) => ignored = false,
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn gitignore_rules_cover_existing_and_future_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("exercise");
        fs::create_dir_all(root.join("target")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join(".gitignore"), "target/\n*.log\n").unwrap();
        fs::write(root.join("target").join("out.bin"), b"x").unwrap();
        fs::write(root.join("src").join("main.rs"), b"fn main() {}").unwrap();

        let set = IgnoreSet::from_folder(&root);
        assert!(set.contains(&root.join("target").join("out.bin")));
        assert!(set.contains(&root.join("debug.log")));
        assert!(!set.contains(&root.join("src").join("main.rs")));
    }

    #[test]
    fn ancestor_gitignore_applies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.class\n").unwrap();
        let root = dir.path().join("course").join("exercise");
        fs::create_dir_all(&root).unwrap();

        let set = IgnoreSet::from_folder(&root);
        assert!(set.contains(&root.join("Main.class")));
        assert!(!set.contains(&root.join("Main.java")));
    }

    #[test]
    fn nested_whitelist_overrides_parent_rule() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join(".gitignore"), "*.md\n").unwrap();
        fs::write(root.join("docs").join(".gitignore"), "!*.md\n").unwrap();

        let set = IgnoreSet::from_folder(&root);
        assert!(set.contains(&root.join("NOTES.md")));
        assert!(!set.contains(&root.join("docs").join("guide.md")));
    }

    #[test]
    fn removed_directory_matches_directory_rule() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join(".gitignore"), "target/\n").unwrap();

        let set = IgnoreSet::from_folder(&root);
        assert!(!set.contains(&root.join("target")));
        assert!(set.contains_removed(&root.join("target")));
        assert!(!set.contains_removed(&root.join("src")));
    }
}
