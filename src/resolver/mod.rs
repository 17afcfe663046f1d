//! Target graph resolution.
//!
//! Maps a validated [`Configuration`] to the ordered list of targets the
//! toolchain builds. Resolution is pure and deterministic; the same
//! configuration always yields the same list. Both the build driver and the
//! packager consume this list, so the packaged library set cannot drift from
//! what was built.

pub mod graph;

pub use graph::{check_build_order, is_build_order, TargetGraph};

use crate::core::dependency::{PinnedDependency, IOLIBRARY_DRIVER};
use crate::core::options::{ConfigError, Configuration, Feature, Platform};
use crate::core::target::TargetSpec;

/// Host unit-test executable.
pub const UNIT_TEST_TARGET: &str = "ATmega328__T_TESTS";

/// Low-level driver libraries, in build order.
pub const DRIVER_LIBRARIES: [&str; 6] = [
    "SetupWDT",
    "SetupEXT_IN_Interrupt",
    "SetupTimer",
    "UART",
    "SPI",
    "Utils",
];

/// Example firmware and its flashable image.
pub const FIRMWARE_EXECUTABLE: &str = "ATmega328__T_";
pub const FIRMWARE_IMAGE: &str = "ATmega328__T__hex";

/// Targets appended by the `ethernet` feature.
pub const VENDOR_DRIVER_LIBRARY: &str = "ioLibrary_Driver";
pub const NETWORK_LIBRARY: &str = "Ethernet";
pub const NETWORK_EXECUTABLE: &str = "tcp_server_example";
pub const NETWORK_IMAGE: &str = "tcp_server_example_hex";

/// Resolve the ordered target list for `config`.
///
/// Fails closed: if the produced list is not a valid build order, an error is
/// returned instead of a partial list.
pub fn resolve(config: &Configuration) -> Result<Vec<TargetSpec>, ConfigError> {
    let targets = match config.platform() {
        Platform::Linux => vec![TargetSpec::executable(UNIT_TEST_TARGET, &[])],
        Platform::Avr => {
            let mut targets: Vec<TargetSpec> = DRIVER_LIBRARIES
                .iter()
                .map(|name| TargetSpec::library(*name, &[]))
                .collect();
            targets.push(TargetSpec::executable(
                FIRMWARE_EXECUTABLE,
                &DRIVER_LIBRARIES,
            ));
            targets.push(TargetSpec::derived(FIRMWARE_IMAGE, FIRMWARE_EXECUTABLE));

            if config.has_feature(Feature::Ethernet) {
                targets.extend(network_targets());
            }
            targets
        }
    };

    check_build_order(&targets).map_err(|reason| ConfigError::InvalidTargetGraph { reason })?;

    tracing::debug!(
        "resolved {} target(s) for {}: {}",
        targets.len(),
        config.platform(),
        targets
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(targets)
}

fn network_targets() -> [TargetSpec; 4] {
    [
        TargetSpec::library(VENDOR_DRIVER_LIBRARY, &[]),
        TargetSpec::library(NETWORK_LIBRARY, &[VENDOR_DRIVER_LIBRARY, "SPI", "Utils"]),
        TargetSpec::executable(
            NETWORK_EXECUTABLE,
            &[NETWORK_LIBRARY, VENDOR_DRIVER_LIBRARY, "SPI", "UART", "Utils"],
        ),
        TargetSpec::derived(NETWORK_IMAGE, NETWORK_EXECUTABLE),
    ]
}

/// External sources the configuration needs on disk before compiling.
pub fn required_dependencies(config: &Configuration) -> Vec<PinnedDependency> {
    let mut deps = Vec::new();
    if config.platform() == Platform::Avr && config.has_feature(Feature::Ethernet) {
        deps.push(IOLIBRARY_DRIVER);
    }
    deps
}

/// Names the package manifest lists as link inputs, in resolved order.
///
/// Every library target, plus the network stack's non-image targets. Flashable
/// images are never link inputs.
pub fn library_names(targets: &[TargetSpec]) -> Vec<String> {
    targets
        .iter()
        .filter(|t| t.is_library() || (is_network_target(&t.name) && t.derived_from().is_none()))
        .map(|t| t.name.clone())
        .collect()
}

fn is_network_target(name: &str) -> bool {
    [
        VENDOR_DRIVER_LIBRARY,
        NETWORK_LIBRARY,
        NETWORK_EXECUTABLE,
        NETWORK_IMAGE,
    ]
    .contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::{validate, RawOptions};
    use crate::core::target::TargetKind;

    fn config(raw: RawOptions) -> Configuration {
        validate(&raw).unwrap()
    }

    fn names(targets: &[TargetSpec]) -> Vec<&str> {
        targets.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_linux_resolves_single_test_target() {
        let raw_variants = [
            RawOptions::for_platform("linux"),
            RawOptions::for_platform("linux").with_tests(true),
            RawOptions {
                shared: Some(true),
                fpic: Some(true),
                ..RawOptions::for_platform("linux")
            },
        ];

        for raw in raw_variants {
            let targets = resolve(&config(raw)).unwrap();
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].name, UNIT_TEST_TARGET);
            assert_eq!(targets[0].kind, TargetKind::Executable);
        }
    }

    #[test]
    fn test_avr_base_targets() {
        let targets = resolve(&config(RawOptions::for_platform("avr"))).unwrap();

        let mut expected: Vec<&str> = DRIVER_LIBRARIES.to_vec();
        expected.push(FIRMWARE_EXECUTABLE);
        expected.push(FIRMWARE_IMAGE);
        assert_eq!(names(&targets), expected);

        assert!(targets[..6].iter().all(|t| t.kind == TargetKind::Library));
        assert_eq!(targets[6].kind, TargetKind::Executable);
        assert_eq!(targets[7].kind, TargetKind::DerivedArtifact);
    }

    #[test]
    fn test_avr_ethernet_appends_four_targets_at_tail() {
        let base = resolve(&config(RawOptions::for_platform("avr"))).unwrap();
        let net = resolve(&config(
            RawOptions::for_platform("avr").with_feature("ethernet"),
        ))
        .unwrap();

        assert_eq!(net.len(), base.len() + 4);
        assert_eq!(&net[..base.len()], &base[..]);
        assert_eq!(
            names(&net[base.len()..]),
            vec![
                VENDOR_DRIVER_LIBRARY,
                NETWORK_LIBRARY,
                NETWORK_EXECUTABLE,
                NETWORK_IMAGE
            ]
        );
    }

    #[test]
    fn test_tests_flag_does_not_change_avr_targets() {
        let without = resolve(&config(RawOptions::for_platform("avr"))).unwrap();
        let with = resolve(&config(RawOptions::for_platform("avr").with_tests(true))).unwrap();
        assert_eq!(without, with);
    }

    #[test]
    fn test_every_resolution_is_a_build_order() {
        let variants = [
            RawOptions::for_platform("linux"),
            RawOptions::for_platform("avr"),
            RawOptions::for_platform("avr").with_feature("ethernet"),
            RawOptions::for_platform("avr")
                .with_feature("ethernet")
                .with_tests(true),
        ];

        for raw in variants {
            let targets = resolve(&config(raw)).unwrap();
            assert!(is_build_order(&targets));
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let cfg = config(RawOptions::for_platform("avr").with_feature("ethernet"));
        assert_eq!(resolve(&cfg).unwrap(), resolve(&cfg).unwrap());
    }

    #[test]
    fn test_required_dependencies_follow_feature() {
        assert!(required_dependencies(&config(RawOptions::for_platform("avr"))).is_empty());
        assert!(required_dependencies(&config(RawOptions::for_platform("linux"))).is_empty());

        let deps = required_dependencies(&config(
            RawOptions::for_platform("avr").with_feature("ethernet"),
        ));
        assert_eq!(deps, vec![IOLIBRARY_DRIVER]);
    }

    #[test]
    fn test_library_names_base_avr() {
        let targets = resolve(&config(RawOptions::for_platform("avr"))).unwrap();
        assert_eq!(library_names(&targets), DRIVER_LIBRARIES.to_vec());
    }

    #[test]
    fn test_library_names_add_network_stack_without_image() {
        let targets = resolve(&config(
            RawOptions::for_platform("avr").with_feature("ethernet"),
        ))
        .unwrap();

        let names = library_names(&targets);
        assert_eq!(names.len(), DRIVER_LIBRARIES.len() + 3);
        assert_eq!(&names[..6], &DRIVER_LIBRARIES[..]);
        assert_eq!(
            &names[6..],
            &[VENDOR_DRIVER_LIBRARY, NETWORK_LIBRARY, NETWORK_EXECUTABLE]
        );
        assert!(!names.iter().any(|n| n == NETWORK_IMAGE || n == FIRMWARE_IMAGE));
        assert!(!names.iter().any(|n| n == FIRMWARE_EXECUTABLE));
    }

    #[test]
    fn test_library_names_linux_is_empty() {
        let targets = resolve(&config(RawOptions::for_platform("linux"))).unwrap();
        assert!(library_names(&targets).is_empty());
    }
}
