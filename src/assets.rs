//! Scene asset manifest and up-front verification.
//!
//! The view loads a GLTF train model and a six-face cubemap skybox. A missing
//! file used to leave a half-built scene with no diagnostic, so the manifest
//! is checked before the game starts and a failure is handed to the scene to
//! display.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

/// Train model, relative to the asset root.
pub const MODEL_FILE: &str = "models/train.glb";

/// Skybox faces in cubemap order: +x, -x, +y, -y, +z, -z.
pub const SKYBOX_FACES: [&str; 6] = [
    "skybox/px.jpg",
    "skybox/nx.jpg",
    "skybox/py.jpg",
    "skybox/ny.jpg",
    "skybox/pz.jpg",
    "skybox/nz.jpg",
];

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {}", path.display())]
    Missing { path: PathBuf },
    #[error("asset is not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },
    #[error("failed to inspect asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Files the scene needs before it can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    pub model: PathBuf,
    pub skybox: [PathBuf; 6],
}

impl AssetManifest {
    /// Standard layout under `root`.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        Self { model: root.join(MODEL_FILE), skybox: SKYBOX_FACES.map(|face| root.join(face)) }
    }

    /// Every file in load order: model first, then skybox faces.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.model.as_path()).chain(self.skybox.iter().map(PathBuf::as_path))
    }

    /// Check that every asset exists and is a regular file.
    ///
    /// # Errors
    ///
    /// Returns the [`AssetError`] for the first asset that fails.
    pub async fn verify(&self) -> Result<(), AssetError> {
        for path in self.paths() {
            check_file(path).await?;
        }
        info!(count = self.skybox.len() + 1, "scene assets verified");
        Ok(())
    }
}

async fn check_file(path: &Path) -> Result<(), AssetError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(AssetError::NotAFile { path: path.to_path_buf() }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(AssetError::Missing { path: path.to_path_buf() }),
        Err(source) => Err(AssetError::Io { path: path.to_path_buf(), source }),
    }
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
