use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

const MANIFEST_FILE: &str = "manifest.json";

/// Writes `content` to `dst` through a sibling temp file and a rename, so a
/// reader never sees a half-written file and a second write replaces the
/// first.
fn write_atomic(dst: &Path, content: &[u8]) -> Result<(), StorageError> {
    let file_name = dst
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::InvalidName(dst.display().to_string()))?;
    let tmp = dst.with_file_name(format!(".{}.tmp", file_name));

    let mut file = std::fs::File::create(&tmp).map_err(|e| StorageError::WriteFile {
        path: tmp.clone(),
        source: e,
    })?;
    file.write_all(content)
        .and_then(|_| file.sync_all())
        .map_err(|e| StorageError::WriteFile {
            path: tmp.clone(),
            source: e,
        })?;
    drop(file);

    if let Err(e) = std::fs::rename(&tmp, dst) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StorageError::ReplaceFile {
            path: dst.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

/// On-disk layout: `<output>/<job_id>/<report_type>.html` plus
/// `<output>/<job_id>/manifest.json`.
pub struct ArtifactStore {
    output_directory: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn job_directory(&self, job_id: &str) -> PathBuf {
        self.output_directory.join(job_id)
    }

    pub fn artifact_path(&self, job_id: &str, report_type: &str) -> PathBuf {
        self.job_directory(job_id).join(format!("{}.html", report_type))
    }

    pub fn manifest_path(&self, job_id: &str) -> PathBuf {
        self.job_directory(job_id).join(MANIFEST_FILE)
    }

    /// Stores one artifact body, replacing any earlier copy.
    pub fn store_artifact(
        &self,
        job_id: &str,
        report_type: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        check_name(job_id)?;
        check_name(report_type)?;

        let dir = self.job_directory(job_id);
        self.ensure_directory(&dir)?;

        let path = self.artifact_path(job_id, report_type);
        write_atomic(&path, content)?;
        Ok(path)
    }

    /// Stores the job manifest, replacing any earlier copy.
    pub fn store_manifest(&self, job_id: &str, content: &[u8]) -> Result<PathBuf, StorageError> {
        check_name(job_id)?;

        let dir = self.job_directory(job_id);
        self.ensure_directory(&dir)?;

        let path = self.manifest_path(job_id);
        write_atomic(&path, content)?;
        Ok(path)
    }

    /// Creates the job directory up front. Fails for job ids that cannot be
    /// used as a directory name.
    pub fn prepare_job_directory(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        check_name(job_id)?;
        let dir = self.job_directory(job_id);
        self.ensure_directory(&dir)?;
        Ok(dir)
    }

    /// Deletes a stored artifact. A missing file is not an error.
    pub fn remove_artifact(&self, job_id: &str, report_type: &str) -> Result<(), StorageError> {
        check_name(job_id)?;
        check_name(report_type)?;

        let path = self.artifact_path(job_id, report_type);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::WriteFile { path, source: e }),
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), StorageError> {
    // Job ids are UUIDs and report types are catalog keys; both must stay a
    // single path component.
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}
