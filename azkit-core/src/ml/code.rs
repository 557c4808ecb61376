//! Local code directories turned into registered code assets

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};

use crate::error::ServiceError;

/// Ignore file honoured in addition to `.gitignore`
pub const AML_IGNORE_FILE: &str = ".amlignore";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Forward-slash path relative to the snapshot root
    pub relative: String,
    pub absolute: PathBuf,
}

/// Files that make up a code asset, plus a content hash used as its name so
/// unchanged directories are not uploaded twice.
#[derive(Debug, Clone)]
pub struct CodeSnapshot {
    pub root: PathBuf,
    pub files: Vec<SnapshotFile>,
    pub hash: String,
}

impl CodeSnapshot {
    pub fn collect(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("code path {root:?} is not a directory");
        }

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .add_custom_ignore_filename(AML_IGNORE_FILE)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to walk {root:?}"))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .with_context(|| format!("{:?} is outside {root:?}", entry.path()))?
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            files.push(SnapshotFile {
                relative,
                absolute: entry.path().to_path_buf(),
            });
        }

        if files.is_empty() {
            bail!("code directory {root:?} contains no files to upload");
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        let hash = hash_files(&files)?;

        tracing::debug!(?root, files = files.len(), %hash, "collected code snapshot");

        Ok(Self {
            root: root.to_path_buf(),
            files,
            hash,
        })
    }

    /// Upload every file beneath the container addressed by `sas_uri`
    pub async fn upload(&self, client: &Client, sas_uri: &str) -> Result<()> {
        let base = Url::parse(sas_uri).context("Service returned an invalid SAS URI")?;

        for file in &self.files {
            let url = blob_url(&base, &file.relative)?;
            let contents = tokio::fs::read(&file.absolute)
                .await
                .with_context(|| format!("Failed to read {:?}", file.absolute))?;

            tracing::debug!(file = %file.relative, bytes = contents.len(), "uploading");

            let response = client
                .put(url)
                .header("x-ms-blob-type", "BlockBlob")
                .body(contents)
                .send()
                .await
                .with_context(|| format!("Failed to upload {}", file.relative))?;
            ServiceError::check("blob upload", response).await?;
        }

        tracing::info!(files = self.files.len(), "code snapshot uploaded");
        Ok(())
    }
}

fn hash_files(files: &[SnapshotFile]) -> Result<String> {
    let mut hasher = Sha256::new();
    for file in files {
        let contents =
            fs::read(&file.absolute).with_context(|| format!("Failed to read {:?}", file.absolute))?;
        hasher.update(file.relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Append a relative blob path to a container URL, keeping its SAS query
fn blob_url(base: &Url, relative: &str) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow::anyhow!("SAS URI cannot carry a path: {base}"))?;
        segments.pop_if_empty();
        for part in relative.split('/') {
            segments.push(part);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn relatives(snapshot: &CodeSnapshot) -> Vec<&str> {
        snapshot.files.iter().map(|f| f.relative.as_str()).collect()
    }

    #[test]
    fn test_collect_honours_ignore_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "train.py", "print('hi')");
        write(dir.path(), "utils/data.py", "X = 1");
        write(dir.path(), "outputs/model.pkl", "binary");
        write(dir.path(), "secret.env", "KEY=1");
        write(dir.path(), ".amlignore", "outputs/\n");
        write(dir.path(), ".gitignore", "*.env\n");
        write(dir.path(), ".git/HEAD", "ref: refs/heads/main");

        let snapshot = CodeSnapshot::collect(dir.path()).unwrap();

        assert_eq!(
            relatives(&snapshot),
            vec![".amlignore", ".gitignore", "train.py", "utils/data.py"]
        );
    }

    #[test]
    fn test_hash_tracks_content_and_paths() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "train.py", "a");
        let first = CodeSnapshot::collect(dir.path()).unwrap().hash;
        let again = CodeSnapshot::collect(dir.path()).unwrap().hash;
        assert_eq!(first, again);
        assert_eq!(first.len(), 64);

        write(dir.path(), "train.py", "b");
        let changed = CodeSnapshot::collect(dir.path()).unwrap().hash;
        assert_ne!(first, changed);

        let other = TempDir::new().unwrap();
        write(other.path(), "main.py", "b");
        let renamed = CodeSnapshot::collect(other.path()).unwrap().hash;
        assert_ne!(changed, renamed);
    }

    #[test]
    fn test_collect_rejects_empty_or_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(CodeSnapshot::collect(dir.path()).is_err());
        assert!(CodeSnapshot::collect(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_blob_url_keeps_sas_query() {
        let base =
            Url::parse("https://acct.blob.core.windows.net/container-1/LocalUpload?sv=2021&sig=abc")
                .unwrap();
        let url = blob_url(&base, "utils/my data.py").unwrap();
        assert_eq!(
            url.as_str(),
            "https://acct.blob.core.windows.net/container-1/LocalUpload/utils/my%20data.py?sv=2021&sig=abc"
        );
    }
}
