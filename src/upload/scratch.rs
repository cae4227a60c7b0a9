//! Scratch files for in-flight downloads
//!
//! Each attachment is relayed through a local scratch file that must be gone
//! by the time its terminal state is recorded, whatever that state is. The
//! guard deletes on drop, so every exit path is covered.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// A scratch file path that removes itself when dropped
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Allocate a scratch path under `scratch_dir`, namespaced by session
    /// and attachment so concurrent sessions uploading same-named files
    /// cannot collide.
    pub fn allocate(
        scratch_dir: &Path,
        session_id: &str,
        attachment_id: &str,
        file_name: &str,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(scratch_dir)?;

        let name = format!(
            "{}_{}",
            scratch_digest(session_id, attachment_id),
            base_name(file_name)
        );
        Ok(Self {
            path: scratch_dir.join(name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.path.exists()
            && let Err(err) = std::fs::remove_file(&self.path)
        {
            log::warn!(
                "Failed to remove scratch file {}: {}",
                self.path.display(),
                err
            );
        }
    }
}

/// Short digest over session + attachment identity
fn scratch_digest(session_id: &str, attachment_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update(b"|");
    hasher.update(attachment_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Final path component of the attachment name; platform file names can
/// carry separators we must not honor
fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string())
}
