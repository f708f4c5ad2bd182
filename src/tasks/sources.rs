// src/tasks/sources.rs

//! Source file discovery for a category's glob.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::{FileSystem, normalize, walk_files};

/// A file matched by a category glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as handed to the filesystem.
    pub path: PathBuf,
    /// Path below the glob base; mirrored into the output directory.
    pub rel: PathBuf,
}

impl SourceFile {
    pub fn file_name(&self) -> &str {
        self.rel
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Compile a source glob; `*` never crosses `/`.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Leading directories of a glob that contain no pattern syntax.
///
/// `src/vendor/**/*.*` has base `src/vendor`; `src/*.html` has base `src`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let is_meta = |s: &str| s.contains(['*', '?', '[', '{']);
    let mut base = PathBuf::new();
    let mut parts = pattern.split('/').peekable();

    while let Some(part) = parts.next() {
        // The last segment names files, never the base.
        if parts.peek().is_none() || is_meta(part) {
            break;
        }
        base.push(part);
    }
    base
}

/// Forward-slash form of `path` relative to `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = normalize(path);
    let rel = rel.strip_prefix(normalize(root)).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Every file under `root` matching `pattern`, sorted by path.
pub fn collect(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<Vec<SourceFile>> {
    let matcher = compile_glob(pattern)?;
    let base = normalize(&root.join(glob_base(pattern)));

    let mut out = Vec::new();
    for path in walk_files(fs, &base)? {
        let Some(rel_root) = relative_str(root, &path) else {
            continue;
        };
        if !matcher.is_match(&rel_root) {
            continue;
        }
        let rel = normalize(&path)
            .strip_prefix(&base)
            .map(Path::to_path_buf)
            .with_context(|| format!("{:?} is outside {:?}", path, base))?;
        out.push(SourceFile { path, rel });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn base_stops_at_first_pattern_segment() {
        assert_eq!(glob_base("src/vendor/**/*.*"), PathBuf::from("src/vendor"));
        assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
        assert_eq!(glob_base("src/images/**/*.{png,jpg}"), PathBuf::from("src/images"));
        assert_eq!(glob_base("index.html"), PathBuf::new());
    }

    #[test]
    fn star_does_not_cross_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/index.html", "");
        fs.add_file("/site/src/partials/head.htm", "");
        fs.add_file("/site/src/nested/page.html", "");

        let found = collect(&fs, Path::new("/site"), "src/*.html").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rel, PathBuf::from("index.html"));
    }

    #[test]
    fn recursive_sources_keep_their_subdirectories() {
        let fs = MockFileSystem::new();
        fs.add_file("/site/src/vendor/lib/a.js", "");
        fs.add_file("/site/src/vendor/b.css", "");

        let found = collect(&fs, Path::new("/site"), "src/vendor/**/*.*").unwrap();
        let rels: Vec<_> = found.iter().map(|s| s.rel.clone()).collect();
        assert_eq!(rels, vec![PathBuf::from("b.css"), PathBuf::from("lib/a.js")]);
    }

    #[test]
    fn missing_base_directory_is_empty() {
        let fs = MockFileSystem::new();
        assert!(collect(&fs, Path::new("/site"), "src/fonts/**/*.*").unwrap().is_empty());
    }
}
