use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{EvaluatorError, Result};
use crate::loaded::LoadedEvaluator;
use crate::registry::Registry;

/// Preferred manifest file name when a directory holds several.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Parse the manifest at `path` and create it against the file's directory.
pub fn load_manifest_file(registry: &Registry, path: &Path) -> Result<LoadedEvaluator> {
    let text = fs::read_to_string(path).map_err(|source| EvaluatorError::ManifestIo {
        path: path.to_path_buf(),
        source,
    })?;
    let manifest = registry.parse_str(&text)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    manifest.create(dir)
}

/// Find the manifest in `dir` and create its evaluator.
///
/// Candidates are the directory's `*.json` files, `manifest.json` first and
/// the rest by name. The first candidate that parses is created against
/// `dir`; files that do not parse are skipped. If none parse, the last parse
/// error is returned.
pub fn load_from_dir(registry: &Registry, dir: &Path) -> Result<LoadedEvaluator> {
    if !dir.is_dir() {
        return Err(EvaluatorError::ArtifactDirectory {
            path: dir.to_path_buf(),
        });
    }

    let mut last_error = None;
    for path in manifest_candidates(dir)? {
        let parsed = fs::read_to_string(&path)
            .map_err(|source| EvaluatorError::ManifestIo {
                path: path.clone(),
                source,
            })
            .and_then(|text| registry.parse_str(&text));
        match parsed {
            Ok(manifest) => return manifest.create(dir),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping manifest");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| EvaluatorError::NoManifest {
        path: dir.to_path_buf(),
    }))
}

fn manifest_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |source: std::io::Error| EvaluatorError::ManifestIo {
        path: dir.to_path_buf(),
        source,
    };
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            candidates.push(path);
        }
    }
    candidates.sort_by_key(|p| (p.file_name() != Some(OsStr::new(MANIFEST_FILE)), p.clone()));
    Ok(candidates)
}
