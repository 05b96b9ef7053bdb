use std::path::{Path, PathBuf};

use crate::error::{Result, SubgenError};

/// Extension that marks a CLI argument as a batch manifest rather than media.
const MANIFEST_EXTENSION: &str = "txt";

/// A resolved reference to a single media file.
///
/// Immutable once resolved. Existence is deliberately not checked here; the
/// pipeline checks per file so a missing entry only skips that entry.
#[derive(Debug, Clone)]
pub struct MediaReference {
    path: PathBuf,
    stem: String,
    parent: PathBuf,
}

impl MediaReference {
    /// Resolve a raw path into an absolute reference.
    pub fn resolve(input: &str) -> Result<Self> {
        let absolute = std::path::absolute(Path::new(input))
            .map_err(|e| SubgenError::Config(format!("cannot resolve path '{}': {}", input, e)))?;
        let stem = absolute
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| SubgenError::Config(format!("invalid media filename: {}", input)))?;
        let parent = absolute
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                SubgenError::Config(format!("cannot determine parent directory of: {}", input))
            })?;

        Ok(Self {
            path: absolute,
            stem,
            parent,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn parent(&self) -> &Path {
        &self.parent
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Expand media arguments into an ordered file list.
///
/// A plain path argument becomes one reference; an argument ending in `.txt`
/// is read as a batch manifest, each non-empty line (trailing whitespace
/// trimmed) becoming one reference. Order follows the arguments and, within a
/// manifest, line order.
pub fn resolve_inputs(args: &[String]) -> Result<Vec<MediaReference>> {
    let mut files = Vec::new();
    for arg in args {
        if is_manifest(arg) {
            let content = std::fs::read_to_string(arg).map_err(|e| {
                SubgenError::Config(format!("cannot read batch manifest '{}': {}", arg, e))
            })?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                files.push(MediaReference::resolve(line)?);
            }
        } else {
            files.push(MediaReference::resolve(arg)?);
        }
    }
    Ok(files)
}

fn is_manifest(arg: &str) -> bool {
    Path::new(arg)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn direct_path_derives_stem_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("episode.mkv");
        let media = MediaReference::resolve(&input.to_string_lossy()).unwrap();
        assert_eq!(media.stem(), "episode");
        assert_eq!(media.parent(), dir.path());
        assert!(!media.exists());
    }

    #[test]
    fn manifest_lines_resolve_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.mp4");
        let second = dir.path().join("two.mp4");

        let manifest = dir.path().join("batch.txt");
        let mut file = std::fs::File::create(&manifest).unwrap();
        writeln!(file, "{}  ", first.display()).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", second.display()).unwrap();

        let files = resolve_inputs(&[manifest.to_string_lossy().into_owned()]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), first);
        assert_eq!(files[1].path(), second);
    }

    #[test]
    fn mixed_arguments_keep_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        let direct = dir.path().join("direct.mp4");
        let listed = dir.path().join("listed.mp4");

        let manifest = dir.path().join("more.txt");
        std::fs::write(&manifest, format!("{}\n", listed.display())).unwrap();

        let files = resolve_inputs(&[
            direct.to_string_lossy().into_owned(),
            manifest.to_string_lossy().into_owned(),
        ])
        .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].stem(), "direct");
        assert_eq!(files[1].stem(), "listed");
    }

    #[test]
    fn missing_manifest_is_a_config_error() {
        let err = resolve_inputs(&["no-such-list.txt".to_string()]).unwrap_err();
        assert!(matches!(err, SubgenError::Config(_)));
    }
}
