//! Cache-or-compute for expensive, persisted results.

use crate::error::Result;
use crate::format::{self, ArtifactKind};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Loads the artifact at `path` if it exists, otherwise runs `compute` and
/// saves its result there.
///
/// Returns the value and whether it came from an existing artifact. A
/// corrupt or mismatched artifact is an error, never silently recomputed.
///
/// ```
/// use nmfrec::format::ArtifactKind;
/// use nmfrec::pipeline::load_or_compute;
///
/// let dir = tempfile::tempdir().expect("tempdir");
/// let path = dir.path().join("answer.pkl");
///
/// let (first, reused) = load_or_compute(&path, ArtifactKind::SearchCheckpoint, || Ok(42_u32))
///     .expect("compute");
/// assert_eq!((first, reused), (42, false));
///
/// let (second, reused) = load_or_compute(&path, ArtifactKind::SearchCheckpoint, || Ok(0_u32))
///     .expect("load");
/// assert_eq!((second, reused), (42, true));
/// ```
///
/// # Errors
///
/// Propagates errors from `compute`, from saving, and from loading an
/// existing artifact.
pub fn load_or_compute<T, F>(path: impl AsRef<Path>, kind: ArtifactKind, compute: F) -> Result<(T, bool)>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T>,
{
    let path = path.as_ref();

    if path.exists() {
        tracing::info!(path = %path.display(), "Checkpoint found. Resuming from saved result");
        let value = format::load(path, kind)?;
        return Ok((value, true));
    }

    tracing::info!(path = %path.display(), "No checkpoint found. Starting new computation");
    let value = compute()?;
    format::save(&value, kind, path)?;
    tracing::info!(path = %path.display(), "Checkpoint saved");
    Ok((value, false))
}
