use std::path::{Component, Path, PathBuf};

use crate::error::ParseError;

/// Joins `path` onto `working_dir` unless it is absolute, in which case it is
/// returned as is. The filesystem is never consulted.
pub fn resolve(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        clean(&working_dir.join(path))
    }
}

/// Lexically removes `.` components and folds `..` into its parent.
pub fn clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => (),
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => (),
                _ => cleaned.push(".."),
            },
            component => cleaned.push(component.as_os_str()),
        }
    }

    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }

    cleaned
}

pub fn path_str(path: &Path) -> Result<&str, ParseError> {
    path.to_str().ok_or_else(|| ParseError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_joined_and_cleaned() {
        let work = Path::new("/work");
        assert_eq!(resolve(work, Path::new("./app")), PathBuf::from("/work/app"));
        assert_eq!(resolve(work, Path::new("creds")), PathBuf::from("/work/creds"));
        assert_eq!(
            resolve(work, Path::new("../shared/ctx")),
            PathBuf::from("/shared/ctx")
        );
        assert_eq!(resolve(work, Path::new(".")), PathBuf::from("/work"));
    }

    #[test]
    fn absolute_paths_are_untouched() {
        let work = Path::new("/work");
        assert_eq!(
            resolve(work, Path::new("/tmp/absolute_secret")),
            PathBuf::from("/tmp/absolute_secret")
        );
    }

    #[test]
    fn clean_never_climbs_above_root() {
        assert_eq!(clean(Path::new("/work/../../..")), PathBuf::from("/"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(clean(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(clean(Path::new("/a/./b/./c/..")), PathBuf::from("/a/b"));
    }
}
