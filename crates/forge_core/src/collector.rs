//! Artifact collection.

use std::fs;
use std::path::{Component, Path};

use forge_spec::GeneratedFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};

/// Directory names never collected.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "coverage", ".forge"];

/// Collect the project under `root` as text files, sorted by path.
///
/// Build output, dependencies and orchestrator bookkeeping are skipped, as
/// are files that are not valid UTF-8.
pub fn collect(root: &Path) -> CoreResult<Vec<GeneratedFile>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        match String::from_utf8(fs::read(entry.path())?) {
            Ok(content) => files.push(GeneratedFile::new(path, content)),
            Err(_) => debug!("Skipping binary file {}", path),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Collected {} file(s) from {}", files.len(), root.display());
    Ok(files)
}

/// Write a file set under `dir`, creating directories as needed.
///
/// Every path is checked before anything is written.
pub fn materialize(files: &[GeneratedFile], dir: &Path) -> CoreResult<usize> {
    for file in files {
        let path = Path::new(&file.path);
        let safe = !file.path.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(CoreError::UnsafePath(file.path.clone()));
        }
    }

    for file in files {
        let target = dir.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.content)?;
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collect_skips_noise() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/index.ts", b"export {};");
        write(dir.path(), "package.json", b"{}");
        write(dir.path(), "node_modules/x/index.js", b"module.exports = 1;");
        write(dir.path(), "dist/index.js", b"");
        write(dir.path(), ".forge/task.json", b"{}");
        write(dir.path(), "assets/logo.png", &[0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe]);

        let files = collect(dir.path()).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["package.json", "src/index.ts"]);
    }

    #[test]
    fn test_skip_applies_to_directories_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "src/build", b"not a directory");

        let files = collect(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "src/build");
    }

    #[test]
    fn test_materialize_then_collect() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            GeneratedFile::new("README.md", "# demo\n"),
            GeneratedFile::new("src/lib/util.ts", "export const one = 1;\n"),
        ];

        assert_eq!(materialize(&files, dir.path()).unwrap(), 2);
        assert_eq!(collect(dir.path()).unwrap(), files);
    }

    #[test]
    fn test_materialize_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            GeneratedFile::new("ok.txt", "fine"),
            GeneratedFile::new("../outside.txt", "nope"),
        ];

        assert!(matches!(materialize(&files, dir.path()), Err(CoreError::UnsafePath(_))));
        assert!(!dir.path().join("ok.txt").exists());
    }
}
