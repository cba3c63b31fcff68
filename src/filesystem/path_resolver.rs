use snafu::{OptionExt, Snafu, ensure};
use tracing::trace;

use super::location::SEPARATOR;
use super::{Directory, Node, SimpleFile};

const CURRENT_DIRECTORY: &str = ".";
const PARENT_DIRECTORY: &str = "..";

/// Turns path strings into logical nodes.
///
/// Paths use `/` on every platform. A leading `/` makes the path relative to
/// the filesystem root no matter where resolution starts. Resolution never
/// touches storage: the result may or may not exist physically.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver;

impl PathResolver {
    pub fn resolve(start: &Directory, path: &str) -> Result<Directory, NavigationError> {
        let mut current = if path.starts_with(SEPARATOR) {
            start.root()
        } else {
            start.clone()
        };

        for segment in path.split(SEPARATOR).filter(|segment| !segment.is_empty()) {
            current = match segment {
                CURRENT_DIRECTORY => current,
                PARENT_DIRECTORY => current.parent().cloned().context(AboveRootSnafu { path })?,
                name => current.child(name),
            };
        }

        trace!("Resolved '{}' from {} to {}", path, start.path(), current.path());
        Ok(current)
    }

    /// Resolves every segment but the last as a directory and names a file
    /// after the last one.
    pub fn resolve_file(start: &Directory, path: &str) -> Result<SimpleFile, NavigationError> {
        let (directory_part, file_name) = match path.rfind(SEPARATOR) {
            Some(index) => (&path[..=index], &path[index + 1..]),
            None => ("", path),
        };

        ensure!(
            !file_name.is_empty() && file_name != CURRENT_DIRECTORY && file_name != PARENT_DIRECTORY,
            NotAFileSnafu { path }
        );

        let directory = Self::resolve(start, directory_part)?;
        Ok(directory.file(file_name))
    }
}

#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[snafu(display("No parent directory above the root while resolving '{}'", path))]
    AboveRoot { path: String },
    #[snafu(display("'{}' does not name a file", path))]
    NotAFile { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::FileSystem;
    use rstest::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn file_system() -> (TempDir, FileSystem) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fs = FileSystem::new(temp_dir.path()).expect("Failed to create filesystem");
        (temp_dir, fs)
    }

    #[rstest]
    #[case("", "/")]
    #[case(".", "/")]
    #[case("a", "/a/")]
    #[case("a/b/c", "/a/b/c/")]
    #[case("/a/./b/../c", "/a/c/")]
    #[case("a//b///", "/a/b/")]
    #[case("a/..", "/")]
    #[case("./a/./", "/a/")]
    fn resolve_renders_expected_path(#[case] path: &str, #[case] expected: &str) {
        let (_temp_dir, fs) = file_system();

        let resolved = PathResolver::resolve(&fs.root(), path).expect("Failed to resolve");

        assert_eq!(resolved.path(), expected);
    }

    #[test]
    fn resolve_empty_and_dot_return_start() {
        let (_temp_dir, fs) = file_system();
        let start = fs.directory("a/b").expect("Failed to resolve start");

        assert_eq!(PathResolver::resolve(&start, "").unwrap(), start);
        assert_eq!(PathResolver::resolve(&start, ".").unwrap(), start);
    }

    #[test]
    fn resolve_child_then_parent_is_start() {
        let (_temp_dir, fs) = file_system();
        let start = fs.directory("x").expect("Failed to resolve start");

        let child = PathResolver::resolve(&start, "a").unwrap();
        let back = PathResolver::resolve(&child, "..").unwrap();

        assert_eq!(back, start);
    }

    #[test]
    fn resolve_absolute_path_ignores_start() {
        let (_temp_dir, fs) = file_system();
        let deep = fs.directory("a/b/c").unwrap();

        let resolved = PathResolver::resolve(&deep, "/d").unwrap();

        assert_eq!(resolved, fs.directory("d").unwrap());
        assert_eq!(resolved.path(), "/d/");
    }

    #[test]
    fn resolve_is_independent_of_construction_order() {
        let (_temp_dir, fs) = file_system();

        let via_detour = PathResolver::resolve(&fs.root(), "/a/./b/../c").unwrap();
        let direct = PathResolver::resolve(&fs.root(), "/a/c").unwrap();

        assert_eq!(via_detour, direct);
        let set: HashSet<_> = [via_detour, direct].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    #[case("a")]
    #[case("a/b/c")]
    #[case("one/two/three/four/five")]
    fn ascending_fully_returns_root(#[case] path: &str) {
        let (_temp_dir, fs) = file_system();
        let depth = path.split('/').count();
        let ascend = vec![".."; depth].join("/");

        let descended = PathResolver::resolve(&fs.root(), path).unwrap();
        let ascended = PathResolver::resolve(&descended, &ascend).unwrap();

        assert_eq!(ascended, fs.root());
    }

    #[rstest]
    #[case("..")]
    #[case("/..")]
    #[case("a/../..")]
    fn resolve_above_root_fails(#[case] path: &str) {
        let (_temp_dir, fs) = file_system();

        let result = PathResolver::resolve(&fs.root(), path);

        assert_eq!(
            result.unwrap_err(),
            NavigationError::AboveRoot {
                path: path.to_string()
            }
        );
    }

    #[test]
    fn resolve_does_not_touch_storage() {
        let (temp_dir, fs) = file_system();

        let resolved = PathResolver::resolve(&fs.root(), "not/there").unwrap();

        assert!(!resolved.exists());
        assert!(!temp_dir.path().join("not").exists());
    }

    #[rstest]
    #[case("x.txt", "/x.txt")]
    #[case("/a/x.txt", "/a/x.txt")]
    #[case("a/../b/x.txt", "/b/x.txt")]
    fn resolve_file_renders_expected_path(#[case] path: &str, #[case] expected: &str) {
        let (_temp_dir, fs) = file_system();

        let file = PathResolver::resolve_file(&fs.root(), path).expect("Failed to resolve file");

        assert_eq!(file.path(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("a/")]
    #[case("a/.")]
    #[case("a/..")]
    fn resolve_file_rejects_directory_like_paths(#[case] path: &str) {
        let (_temp_dir, fs) = file_system();

        let result = PathResolver::resolve_file(&fs.root(), path);

        assert!(matches!(result, Err(NavigationError::NotAFile { .. })));
    }
}
