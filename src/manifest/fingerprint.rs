//! Fingerprint computation (§4.9): `H(input_hash || params_hash || tool_versions_canonical)`.

use super::types::Fingerprint;
use crate::error::PipelineError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

pub(crate) fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hashes an in-memory value the same way [`params_hash`] hashes stage
/// parameters: canonical JSON, then SHA-256. Used for stages whose declared
/// inputs are artifacts already held in memory (e.g. a `BookIndex` that is
/// never persisted per-chapter) rather than standalone files.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    Ok(hex_digest(canonical_json(value)?.as_bytes()))
}

/// Combines several already-computed hash strings into one, in the order
/// given — e.g. a transcript stage's input hash folding together its
/// `BookIndex` hash and its `AsrResponse` hash (§4.9).
pub fn combine_hashes(parts: &[&str]) -> String {
    hex_digest(parts.concat().as_bytes())
}

pub fn hash_file(path: &Path) -> Result<String, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PipelineError::InputMissing { path: path.to_path_buf() }
        } else {
            PipelineError::IOError(e)
        }
    })?;
    Ok(hex_digest(&bytes))
}

/// `H(concat(H(file_i) for file_i in declared_inputs, in declared order))`.
pub fn hash_declared_inputs(declared_inputs: &[&Path]) -> Result<String, PipelineError> {
    let mut concat = String::new();
    for path in declared_inputs {
        concat.push_str(&hash_file(path)?);
    }
    Ok(hex_digest(concat.as_bytes()))
}

/// Canonical JSON: a `serde_json::Value` re-serialized with sorted object
/// keys and no insignificant whitespace. `serde_json`'s default map type is
/// already a `BTreeMap`-backed `Map` when the `preserve_order` feature is
/// off, so `to_string` on a re-parsed value is already canonical; we still
/// route through `serde_json::Value` explicitly so this holds regardless of
/// the caller's input field order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, PipelineError> {
    let as_value = serde_json::to_value(value).map_err(canonicalization_error)?;
    serde_json::to_string(&as_value).map_err(canonicalization_error)
}

fn canonicalization_error(e: serde_json::Error) -> PipelineError {
    PipelineError::InputInvalid { source_file: "fingerprint params".to_string(), location: String::new(), message: e.to_string() }
}

pub fn params_hash<T: Serialize>(params: &T) -> Result<String, PipelineError> {
    Ok(hex_digest(canonical_json(params)?.as_bytes()))
}

pub fn tool_versions_canonical(tool_versions: &BTreeMap<String, String>) -> Result<String, PipelineError> {
    canonical_json(tool_versions)
}

/// Computes the fingerprint for one stage invocation.
pub fn compute_fingerprint<P: Serialize>(input_hash: &str, params: &P, tool_versions: &BTreeMap<String, String>) -> Result<Fingerprint, PipelineError> {
    Ok(Fingerprint { input_hash: input_hash.to_string(), params_hash: params_hash(params)?, tool_versions: tool_versions.clone() })
}

/// The final stage fingerprint value stored in the manifest and compared
/// against on the next run: `H(input_hash || params_hash || tool_versions_canonical)`.
pub fn fingerprint_digest(fp: &Fingerprint) -> Result<String, PipelineError> {
    let tv_canonical = tool_versions_canonical(&fp.tool_versions)?;
    let joined = format!("{}{}{}", fp.input_hash, fp.params_hash, tv_canonical);
    Ok(hex_digest(joined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Serialize)]
    struct Params {
        b: u32,
        a: u32,
    }

    #[test]
    fn params_hash_is_stable_regardless_of_field_order() {
        #[derive(Serialize)]
        struct ParamsAltOrder {
            a: u32,
            b: u32,
        }
        let h1 = params_hash(&Params { b: 2, a: 1 }).unwrap();
        let h2 = params_hash(&ParamsAltOrder { a: 1, b: 2 }).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_file_changes_when_contents_change() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let h1 = hash_file(f.path()).unwrap();
        f.write_all(b" world").unwrap();
        let h2 = hash_file(f.path()).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn fingerprint_digest_changes_with_any_component() {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert("asr_model_version".to_string(), "v1".to_string());
        let fp_a = Fingerprint { input_hash: "aaa".into(), params_hash: "bbb".into(), tool_versions: tool_versions.clone() };
        let fp_b = Fingerprint { input_hash: "aaa".into(), params_hash: "ccc".into(), tool_versions };
        assert_ne!(fingerprint_digest(&fp_a).unwrap(), fingerprint_digest(&fp_b).unwrap());
    }

    #[test]
    fn hash_value_changes_with_content() {
        let h1 = hash_value(&Params { b: 2, a: 1 }).unwrap();
        let h2 = hash_value(&Params { b: 3, a: 1 }).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn combine_hashes_is_order_sensitive() {
        let forward = combine_hashes(&["aaa", "bbb"]);
        let backward = combine_hashes(&["bbb", "aaa"]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn declared_inputs_order_matters() {
        let mut f1 = NamedTempFile::new().unwrap();
        f1.write_all(b"one").unwrap();
        let mut f2 = NamedTempFile::new().unwrap();
        f2.write_all(b"two").unwrap();
        let forward = hash_declared_inputs(&[f1.path(), f2.path()]).unwrap();
        let backward = hash_declared_inputs(&[f2.path(), f1.path()]).unwrap();
        assert_ne!(forward, backward);
    }
}
