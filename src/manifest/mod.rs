pub mod fingerprint;
pub mod types;

pub use fingerprint::{canonical_json, combine_hashes, compute_fingerprint, fingerprint_digest, hash_declared_inputs, hash_file, hash_value, params_hash};
pub use types::{Fingerprint, ManifestV2, StageEntry, StageError, StageName, StageStatus};

use crate::error::PipelineError;
use std::path::Path;

pub fn load_manifest(path: &Path) -> Result<ManifestV2, PipelineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputMissing { path: path.to_path_buf() }
        } else {
            PipelineError::IOError(e)
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| PipelineError::InputInvalid { source_file: path.display().to_string(), location: String::new(), message: e.to_string() })
}

/// Persists the manifest atomically: write to a `.tmp` sibling, then rename
/// over the real path. The manifest is the authoritative skip record, so a
/// torn write here would be worse than a torn write to any other artifact.
pub fn save_manifest(path: &Path, manifest: &ManifestV2) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(PipelineError::IOError)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(manifest)
        .map_err(|e| PipelineError::InputInvalid { source_file: path.display().to_string(), location: String::new(), message: e.to_string() })?;
    std::fs::write(&tmp_path, body).map_err(PipelineError::IOError)?;
    std::fs::rename(&tmp_path, path).map_err(PipelineError::IOError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let manifest = ManifestV2::new("ch01", "ch01/raw.wav", "ch01/transcript.json", chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        save_manifest(&path, &manifest).unwrap();
        let loaded = load_manifest(&path).unwrap();
        assert_eq!(loaded.chapter_id, "ch01");
        assert_eq!(loaded.stages.len(), 7);
    }
}
