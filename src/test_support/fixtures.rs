//! Test fixtures: archives, dependency specs and project trees.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use url::Url;

use crate::core::dependency::DependencySpec;
use crate::core::project::PROJECT_FILE;
use crate::util::hash::sha256_bytes;

/// URL used by [`spec_for`].
pub const FIXTURE_URL: &str = "https://example.com/ioLibrary_Driver-3.2.0.tar.gz";

/// Build a gzipped tarball holding `files` (path, content).
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// A driver spec whose digest matches `data`.
pub fn spec_for(destination: PathBuf, data: &[u8]) -> DependencySpec {
    DependencySpec {
        identifier: "ioLibrary_Driver".to_string(),
        version: "3.2.0".to_string(),
        source_url: Url::parse(FIXTURE_URL).unwrap(),
        expected_digest: Some(sha256_bytes(data)),
        destination,
    }
}

/// An archive laid out like the upstream driver release.
pub fn driver_tarball() -> Vec<u8> {
    tarball(&[
        ("ioLibrary_Driver-3.2.0/Ethernet/socket.h", "#pragma once\n"),
        ("ioLibrary_Driver-3.2.0/Ethernet/wizchip_conf.h", "#pragma once\n"),
        ("ioLibrary_Driver-3.2.0/Ethernet/W5500/w5500.h", "#pragma once\n"),
    ])
}

/// Public headers as the firmware tree ships them.
pub fn write_public_headers(root: &Path) {
    for (path, guard) in [
        ("public/Serial/UART.h", "UART_H"),
        ("public/SPI/SPI.h", "SPI_H"),
        ("public/Utils/CircularBuffer.h", "CIRCULAR_BUFFER_H"),
    ] {
        let file = root.join(path);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, format!("#ifndef {guard}\n#define {guard}\n#endif\n")).unwrap();
    }
}

/// Minimal project file.
pub fn project_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{name}"
version = "1.2.0"
"#
    )
}

/// Write a project file and public headers into `root`.
pub fn write_project(root: &Path, name: &str, extra: &str) -> PathBuf {
    write_public_headers(root);
    let path = root.join(PROJECT_FILE);
    std::fs::write(&path, format!("{}{}", project_manifest(name), extra)).unwrap();
    path
}
