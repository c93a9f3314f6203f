//! Wallet archive unpacking.
//!
//! The database wallet arrives as a gzip-compressed tar archive. Every entry
//! path is checked before anything is written, files are extracted into a
//! scratch directory that is removed on drop, then read back keyed by their
//! path relative to the archive root.

use super::SecretData;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use thiserror::Error;
use tracing::{debug, info_span};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet archive entry escapes the unpack directory: {0}")]
    UnsafePath(String),
    #[error("wallet archive entry {0} is a link")]
    LinkEntry(String),
    #[error("invalid wallet archive: {0}")]
    InvalidArchive(String),
    #[error("wallet archive is empty")]
    Empty,
    #[error("wallet i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns a wallet archive into secret data
pub trait WalletUnpacker: Send + Sync {
    fn unpack(&self, archive: &[u8]) -> Result<SecretData, WalletError>;
}

/// Unpacks `.tar.gz` wallets through a scratch directory
#[derive(Debug, Clone, Default)]
pub struct TarGzUnpacker {
    scratch_dir: Option<PathBuf>,
}

impl TarGzUnpacker {
    pub fn new(scratch_dir: Option<PathBuf>) -> Self {
        Self { scratch_dir }
    }

    fn scratch(&self) -> Result<tempfile::TempDir, WalletError> {
        let dir = match &self.scratch_dir {
            Some(base) => tempfile::Builder::new().prefix("wallet-").tempdir_in(base)?,
            None => tempfile::Builder::new().prefix("wallet-").tempdir()?,
        };
        Ok(dir)
    }
}

/// Lexically normalise `path` under `root`; `None` if it would leave `root`
fn contained_path(root: &Path, path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    let target = root.join(&clean);
    target.starts_with(root).then_some(target)
}

fn gzip_archive(bytes: &[u8]) -> Result<Archive<GzDecoder<&[u8]>>, WalletError> {
    if bytes.len() < 2 || bytes[..2] != [0x1f, 0x8b] {
        return Err(WalletError::InvalidArchive(
            "expected gzip magic bytes".to_string(),
        ));
    }
    Ok(Archive::new(GzDecoder::new(bytes)))
}

/// First pass: reject unsafe entries before touching the filesystem
fn validate_entries(bytes: &[u8], root: &Path) -> Result<usize, WalletError> {
    let mut archive = gzip_archive(bytes)?;
    let mut files = 0;
    for entry in archive
        .entries()
        .map_err(|e| WalletError::InvalidArchive(e.to_string()))?
    {
        let entry = entry.map_err(|e| WalletError::InvalidArchive(e.to_string()))?;
        let raw = entry
            .path_bytes()
            .into_owned();
        let display = String::from_utf8_lossy(&raw).to_string();
        let path = entry
            .path()
            .map_err(|_| WalletError::UnsafePath(display.clone()))?;
        if contained_path(root, &path).is_none() {
            return Err(WalletError::UnsafePath(display));
        }
        match entry.header().entry_type() {
            EntryType::Symlink | EntryType::Link => return Err(WalletError::LinkEntry(display)),
            EntryType::Regular | EntryType::Continuous => files += 1,
            _ => {}
        }
    }
    Ok(files)
}

impl WalletUnpacker for TarGzUnpacker {
    fn unpack(&self, archive: &[u8]) -> Result<SecretData, WalletError> {
        let span = info_span!("wallet.unpack", archive.size_bytes = archive.len());
        let _guard = span.enter();

        let scratch = self.scratch()?;
        let root = scratch.path().to_path_buf();

        if validate_entries(archive, &root)? == 0 {
            return Err(WalletError::Empty);
        }

        // Second pass: extract entry by entry into the scratch directory
        let mut tar = gzip_archive(archive)?;
        for entry in tar
            .entries()
            .map_err(|e| WalletError::InvalidArchive(e.to_string()))?
        {
            let mut entry = entry.map_err(|e| WalletError::InvalidArchive(e.to_string()))?;
            let path = entry.path()?.into_owned();
            let target = contained_path(&root, &path)
                .ok_or_else(|| WalletError::UnsafePath(path.display().to_string()))?;
            match entry.header().entry_type() {
                EntryType::Directory => std::fs::create_dir_all(&target)?,
                EntryType::Regular | EntryType::Continuous => {
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let mut contents = Vec::new();
                    entry.read_to_end(&mut contents)?;
                    std::fs::write(&target, contents)?;
                }
                _ => {}
            }
        }

        let mut data = SecretData::new();
        for file in WalkDir::new(&root).into_iter() {
            let file = file.map_err(|e| WalletError::Io(std::io::Error::other(e.to_string())))?;
            if !file.file_type().is_file() {
                continue;
            }
            let relative = file
                .path()
                .strip_prefix(&root)
                .map_err(|_| WalletError::UnsafePath(file.path().display().to_string()))?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            data.insert(key, std::fs::read(file.path())?);
        }
        debug!(files = data.len(), "Wallet unpacked");
        // scratch is removed here, on success and on every early return above
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *contents).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn archive_with_raw_name(name: &str, contents: &[u8]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        builder.append(&header, contents).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_unpack_keys_by_relative_path() {
        let scratch = tempfile::tempdir().unwrap();
        let unpacker = TarGzUnpacker::new(Some(scratch.path().to_path_buf()));
        let data = unpacker
            .unpack(&archive(&[
                ("tnsnames.ora", b"adb1_high = ..."),
                ("nested/ojdbc.properties", b"oracle.net.wallet_location=..."),
            ]))
            .unwrap();
        assert_eq!(data["tnsnames.ora"], b"adb1_high = ...");
        assert!(data.contains_key("nested/ojdbc.properties"));
        // scratch space is cleaned up
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unpack_rejects_parent_escape_without_writing() {
        let scratch = tempfile::tempdir().unwrap();
        let unpacker = TarGzUnpacker::new(Some(scratch.path().to_path_buf()));
        let bytes = archive_with_raw_name("../evil", b"owned");
        let err = unpacker.unpack(&bytes).unwrap_err();
        assert!(matches!(err, WalletError::UnsafePath(_)), "{err}");
        assert!(!scratch.path().join("evil").exists());
        assert!(!scratch.path().parent().unwrap().join("evil").exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unpack_rejects_non_gzip() {
        let unpacker = TarGzUnpacker::default();
        assert!(matches!(
            unpacker.unpack(b"PK\x03\x04"),
            Err(WalletError::InvalidArchive(_))
        ));
    }

    #[test]
    fn test_contained_path() {
        let root = Path::new("/scratch/w");
        assert_eq!(
            contained_path(root, Path::new("./a/b")),
            Some(PathBuf::from("/scratch/w/a/b"))
        );
        assert!(contained_path(root, Path::new("a/../../b")).is_none());
        assert!(contained_path(root, Path::new("/etc/passwd")).is_none());
        assert!(contained_path(root, Path::new(".")).is_none());
    }
}
