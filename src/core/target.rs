//! Target definitions - the named units the toolchain builds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::options::Platform;

/// The kind of target being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Static or shared library
    Library,

    /// Linked executable
    Executable,

    /// Post-processed output of an executable (a flashable image)
    DerivedArtifact,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Library => "library",
            TargetKind::Executable => "executable",
            TargetKind::DerivedArtifact => "derived-artifact",
        })
    }
}

/// A named, ordered build unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Toolchain target name
    pub name: String,

    /// What kind of artifact this produces
    pub kind: TargetKind,

    /// Targets that must be built first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TargetSpec {
    /// A library target.
    pub fn library(name: impl Into<String>, depends_on: &[&str]) -> Self {
        TargetSpec {
            name: name.into(),
            kind: TargetKind::Library,
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// An executable target.
    pub fn executable(name: impl Into<String>, depends_on: &[&str]) -> Self {
        TargetSpec {
            name: name.into(),
            kind: TargetKind::Executable,
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// A derived artifact produced from the executable `source`.
    pub fn derived(name: impl Into<String>, source: &str) -> Self {
        TargetSpec {
            name: name.into(),
            kind: TargetKind::DerivedArtifact,
            depends_on: vec![source.to_string()],
        }
    }

    pub fn is_library(&self) -> bool {
        self.kind == TargetKind::Library
    }

    /// The executable a derived artifact is produced from.
    pub fn derived_from(&self) -> Option<&str> {
        match self.kind {
            TargetKind::DerivedArtifact => self.depends_on.first().map(String::as_str),
            _ => None,
        }
    }

    /// File name the toolchain writes for this target.
    pub fn output_filename(&self, platform: Platform, shared: bool) -> String {
        match self.kind {
            TargetKind::Library if shared => format!("lib{}.so", self.name),
            TargetKind::Library => format!("lib{}.a", self.name),
            TargetKind::Executable => match platform {
                Platform::Avr => format!("{}.elf", self.name),
                Platform::Linux => self.name.clone(),
            },
            TargetKind::DerivedArtifact => {
                format!("{}.hex", self.derived_from().unwrap_or(&self.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_filenames() {
        let lib = TargetSpec::library("UART", &[]);
        assert_eq!(lib.output_filename(Platform::Avr, false), "libUART.a");
        assert_eq!(lib.output_filename(Platform::Linux, true), "libUART.so");

        let exe = TargetSpec::executable("ATmega328__T_", &["UART"]);
        assert_eq!(exe.output_filename(Platform::Avr, false), "ATmega328__T_.elf");
        assert_eq!(exe.output_filename(Platform::Linux, false), "ATmega328__T_");

        let image = TargetSpec::derived("ATmega328__T__hex", "ATmega328__T_");
        assert_eq!(image.derived_from(), Some("ATmega328__T_"));
        assert_eq!(image.output_filename(Platform::Avr, false), "ATmega328__T_.hex");
    }

    #[test]
    fn test_kind_serialization() {
        let image = TargetSpec::derived("fw_hex", "fw");
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["kind"], "derived-artifact");
        assert_eq!(json["depends_on"][0], "fw");

        let lib = TargetSpec::library("SPI", &[]);
        let json = serde_json::to_value(&lib).unwrap();
        assert!(json.get("depends_on").is_none());
    }
}
