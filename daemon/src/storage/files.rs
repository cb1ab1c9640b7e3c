use crate::error::{Error, Result};
use crafthost_protocol::files::{sort_entries, ServerFileEntry};
use log::warn;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// File operations confined to one server's directory tree. Every public
/// operation takes the server root plus a client-supplied relative path;
/// the resolved path must stay inside the root.
#[derive(Debug, Clone)]
pub struct Files {
    sandbox: bool,
}

impl Files {
    pub fn new(sandbox: bool) -> Self {
        Self { sandbox }
    }

    // 算法层面，判断path是否在root下：逐个组件归一化，`..` 不得越过根
    fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
        let mut resolved = PathBuf::new();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !resolved.pop() {
                        return Err(Error::PathDenied(relative.to_owned()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(Error::PathDenied(relative.to_owned()));
                }
            }
        }
        Ok(root.join(resolved))
    }

    fn soft_fail(&self, err: std::io::Error, op: &str, path: &Path) -> Result<()> {
        if self.sandbox && err.kind() == ErrorKind::NotFound {
            warn!("{} on missing path {} ignored (sandbox mode)", op, path.display());
            Ok(())
        } else {
            Err(err.into())
        }
    }

    /// Directory listing, folders before files, then alphabetical.
    pub async fn list_dir(&self, root: &Path, sub: &str) -> Result<Vec<ServerFileEntry>> {
        let dir = Self::resolve(root, sub)?;
        let parent = PathBuf::from(sub);

        let listed = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<ServerFileEntry>> {
            let mut entries = vec![];
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                match ServerFileEntry::from_dir_entry(&entry, &parent) {
                    Ok(row) => entries.push(row),
                    Err(err) => warn!("skipping unreadable entry: {}", err),
                }
            }
            Ok(entries)
        })
        .await
        .unwrap(); // unwrap is safe: won't cancel and panic

        let mut entries = match listed {
            Ok(entries) => entries,
            Err(err) if self.sandbox && err.kind() == ErrorKind::NotFound => vec![],
            Err(err) => return Err(err.into()),
        };
        sort_entries(&mut entries);
        Ok(entries)
    }

    pub async fn read_file(&self, root: &Path, relative: &str) -> Result<String> {
        let path = Self::resolve(root, relative)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(err) if self.sandbox && err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes text content, creating parent directories as needed.
    pub async fn write_file(&self, root: &Path, relative: &str, content: &str) -> Result<()> {
        let path = Self::resolve(root, relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::write(&path, content).await {
            Ok(()) => Ok(()),
            Err(err) => self.soft_fail(err, "write", &path),
        }
    }

    /// Deletes a file, or a folder with everything under it.
    pub async fn delete_path(&self, root: &Path, relative: &str) -> Result<()> {
        let path = Self::resolve(root, relative)?;
        let result = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => tokio::fs::remove_dir_all(&path).await,
            Ok(_) => tokio::fs::remove_file(&path).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.soft_fail(err, "delete", &path),
        }
    }

    pub async fn create_folder(&self, root: &Path, relative: &str) -> Result<()> {
        let path = Self::resolve(root, relative)?;
        match tokio::fs::create_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(err) => self.soft_fail(err, "create folder", &path),
        }
    }

    /// Writes raw bytes, creating parent directories as needed.
    pub async fn upload_file(&self, root: &Path, relative: &str, data: &[u8]) -> Result<()> {
        let path = Self::resolve(root, relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::write(&path, data).await {
            Ok(()) => Ok(()),
            Err(err) => self.soft_fail(err, "upload", &path),
        }
    }
}
