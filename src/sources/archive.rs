//! Gzip tarball extraction.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extract a `.tar.gz` stream into `dest`.
///
/// Entries that would land outside `dest` are rejected. Device nodes and
/// fifos are skipped.
pub fn extract_tarball(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive.set_preserve_permissions(true);

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_type = entry.header().entry_type();
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .to_string_lossy()
            .into_owned();

        match entry_type {
            tar::EntryType::Directory
            | tar::EntryType::Regular
            | tar::EntryType::Continuous
            | tar::EntryType::Symlink
            | tar::EntryType::Link => {
                let unpacked = entry
                    .unpack_in(dest)
                    .with_context(|| format!("failed to extract `{}`", entry_path))?;
                if !unpacked {
                    bail!("tarball entry escapes destination directory: {}", entry_path);
                }
            }
            // pax headers are consumed by the tar reader itself
            tar::EntryType::XGlobalHeader | tar::EntryType::XHeader => {}
            _ => {
                tracing::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::tarball;
    use tempfile::TempDir;

    #[test]
    fn test_extract_tarball_keeps_top_level_dir() {
        let data = tarball(&[
            ("ioLibrary_Driver-3.2.0/Ethernet/socket.h", "#pragma once"),
            ("ioLibrary_Driver-3.2.0/Ethernet/socket.c", "int x;"),
        ]);

        let tmp = TempDir::new().unwrap();
        extract_tarball(data.as_slice(), tmp.path()).unwrap();

        let header = tmp.path().join("ioLibrary_Driver-3.2.0/Ethernet/socket.h");
        assert_eq!(std::fs::read_to_string(header).unwrap(), "#pragma once");
    }

    #[test]
    fn test_extract_rejects_garbage() {
        let tmp = TempDir::new().unwrap();
        assert!(extract_tarball(&b"not a tarball"[..], tmp.path()).is_err());
    }
}
