//! Option model - the recognised configuration axes and their legal values.
//!
//! Raw options arrive as strings and optional booleans (from `Firmforge.toml`
//! and the command line). [`validate`] turns them into an immutable
//! [`Configuration`], which is the only form the rest of the pipeline accepts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Cross-compiled ATmega328P firmware
    Avr,

    /// Host-native unit test build
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Avr, Platform::Linux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Avr => "avr",
            Platform::Linux => "linux",
        }
    }

    /// Presets namespace handed to the toolchain.
    pub fn presets_prefix(&self) -> String {
        format!("firmforge-generated-{}", self.as_str())
    }

    /// Whether this platform can make use of `feature`.
    pub fn supports(&self, feature: Feature) -> bool {
        match (self, feature) {
            (Platform::Avr, Feature::Ethernet) => true,
            (Platform::Linux, Feature::Ethernet) => false,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Avr
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avr" => Ok(Platform::Avr),
            "linux" => Ok(Platform::Linux),
            _ => Err(ConfigError::UnknownPlatform {
                value: s.to_string(),
            }),
        }
    }
}

/// Optional feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    /// W5500 Ethernet support (pulls in the WIZnet vendor driver)
    Ethernet,
}

impl Feature {
    pub const ALL: [Feature; 1] = [Feature::Ethernet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Ethernet => "ethernet",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethernet" | "ethernet-support" | "ethernet_support" => Ok(Feature::Ethernet),
            _ => Err(ConfigError::UnknownFeature {
                value: s.to_string(),
            }),
        }
    }
}

/// Invalid or unsupported configuration. Raised before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown platform `{value}`")]
    #[diagnostic(
        code(firmforge::config::unknown_platform),
        help("supported platforms: avr, linux")
    )]
    UnknownPlatform { value: String },

    #[error("unknown feature `{value}`")]
    #[diagnostic(
        code(firmforge::config::unknown_feature),
        help("supported features: ethernet")
    )]
    UnknownFeature { value: String },

    #[error("feature `{feature}` is not supported on platform `{platform}`")]
    #[diagnostic(
        code(firmforge::config::unsupported_feature),
        help("the host build only runs unit tests; drop the feature or build for avr")
    )]
    UnsupportedFeature { feature: Feature, platform: Platform },

    #[error("the linux build requires tests to be enabled")]
    #[diagnostic(
        code(firmforge::config::host_without_tests),
        help("the host build exists to run the unit tests; pass --tests or build for avr")
    )]
    HostBuildWithoutTests,

    #[error("shared libraries are not supported on platform `avr`")]
    #[diagnostic(
        code(firmforge::config::shared_on_avr),
        help("the avr toolchain only produces static archives")
    )]
    SharedOnAvr,

    #[error("invalid target graph: {reason}")]
    #[diagnostic(code(firmforge::config::invalid_target_graph))]
    InvalidTargetGraph { reason: String },
}

/// Unvalidated option set, as declared in `[options]` or on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    /// Target platform ("avr" | "linux"), "avr" when unset
    pub platform: Option<String>,

    /// Compile and run unit tests; defaults to true on linux
    pub tests: Option<bool>,

    /// Feature flags
    pub features: Vec<String>,

    /// Build shared libraries
    pub shared: Option<bool>,

    /// Build position independent code
    pub fpic: Option<bool>,
}

impl RawOptions {
    /// Options selecting only a platform.
    pub fn for_platform(platform: impl Into<String>) -> Self {
        RawOptions {
            platform: Some(platform.into()),
            ..Default::default()
        }
    }

    /// Add a feature flag.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Set the tests flag.
    pub fn with_tests(mut self, tests: bool) -> Self {
        self.tests = Some(tests);
        self
    }

    /// Overlay `other` on top of these options (other takes precedence).
    ///
    /// Switching platform without naming features drops the inherited
    /// features the new platform cannot use.
    pub fn merge(&mut self, other: RawOptions) {
        if other.platform.is_some() {
            self.platform = other.platform;
            if other.features.is_empty() {
                self.drop_unsupported_features();
            }
        }
        if other.tests.is_some() {
            self.tests = other.tests;
        }
        if !other.features.is_empty() {
            self.features = other.features;
        }
        if other.shared.is_some() {
            self.shared = other.shared;
        }
        if other.fpic.is_some() {
            self.fpic = other.fpic;
        }
    }

    fn drop_unsupported_features(&mut self) {
        // Unknown values are left for `validate` to report.
        let Some(Ok(platform)) = self.platform.as_deref().map(Platform::from_str) else {
            return;
        };
        self.features.retain(|name| match name.parse::<Feature>() {
            Ok(feature) if !platform.supports(feature) => {
                tracing::warn!(
                    "ignoring feature `{}` from project options; platform `{}` cannot use it",
                    feature,
                    platform
                );
                false
            }
            _ => true,
        });
    }
}

/// Validated, immutable build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Configuration {
    platform: Platform,
    tests_enabled: bool,
    features: BTreeSet<Feature>,
    shared: bool,
    position_independent_code: bool,
}

impl Configuration {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Whether unit tests are compiled in. Inert on avr.
    pub fn tests_enabled(&self) -> bool {
        self.tests_enabled
    }

    pub fn features(&self) -> &BTreeSet<Feature> {
        &self.features
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn network_enabled(&self) -> bool {
        self.has_feature(Feature::Ethernet)
    }

    pub fn shared(&self) -> bool {
        self.shared
    }

    pub fn position_independent_code(&self) -> bool {
        self.position_independent_code
    }

    /// Whether the verification runner gates this build.
    pub fn verification_enabled(&self) -> bool {
        self.platform == Platform::Linux && self.tests_enabled
    }
}

/// Validate raw options against the declared domain.
pub fn validate(raw: &RawOptions) -> Result<Configuration, ConfigError> {
    let platform = match raw.platform.as_deref() {
        Some(p) => p.parse::<Platform>()?,
        None => Platform::default(),
    };

    let mut features = BTreeSet::new();
    for name in &raw.features {
        let feature = name.parse::<Feature>()?;
        if !platform.supports(feature) {
            return Err(ConfigError::UnsupportedFeature { feature, platform });
        }
        features.insert(feature);
    }

    let tests_enabled = raw.tests.unwrap_or(platform == Platform::Linux);
    if platform == Platform::Linux && !tests_enabled {
        return Err(ConfigError::HostBuildWithoutTests);
    }
    if platform == Platform::Avr && tests_enabled {
        tracing::debug!("tests are enabled but have no effect on platform `avr`");
    }

    let shared = raw.shared.unwrap_or(false);
    if platform == Platform::Avr && shared {
        return Err(ConfigError::SharedOnAvr);
    }

    Ok(Configuration {
        platform,
        tests_enabled,
        features,
        shared,
        position_independent_code: raw.fpic.unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_avr_without_tests() {
        let config = validate(&RawOptions::default()).unwrap();
        assert_eq!(config.platform(), Platform::Avr);
        assert!(!config.tests_enabled());
        assert!(!config.shared());
        assert!(!config.position_independent_code());
        assert!(config.features().is_empty());
    }

    #[test]
    fn test_linux_enables_tests_by_default() {
        let config = validate(&RawOptions::for_platform("linux")).unwrap();
        assert!(config.tests_enabled());
        assert!(config.verification_enabled());
    }

    #[test]
    fn test_tests_flag_is_inert_on_avr() {
        let config = validate(&RawOptions::for_platform("avr").with_tests(true)).unwrap();
        assert!(config.tests_enabled());
        assert!(!config.verification_enabled());
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let err = validate(&RawOptions::for_platform("esp32")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownPlatform {
                value: "esp32".to_string()
            }
        );
    }

    #[test]
    fn test_platform_is_case_insensitive() {
        assert_eq!("AVR".parse::<Platform>().unwrap(), Platform::Avr);
        assert_eq!(" Linux ".parse::<Platform>().unwrap(), Platform::Linux);
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let err = validate(&RawOptions::for_platform("avr").with_feature("wifi")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFeature { .. }));
    }

    #[test]
    fn test_ethernet_rejected_on_linux() {
        let err =
            validate(&RawOptions::for_platform("linux").with_feature("ethernet")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedFeature {
                feature: Feature::Ethernet,
                platform: Platform::Linux
            }
        );
    }

    #[test]
    fn test_ethernet_accepted_on_avr_with_aliases() {
        for alias in ["ethernet", "ethernet-support", "ETHERNET_SUPPORT"] {
            let config = validate(&RawOptions::for_platform("avr").with_feature(alias)).unwrap();
            assert!(config.network_enabled(), "alias {alias}");
        }
    }

    #[test]
    fn test_linux_without_tests_rejected() {
        let err = validate(&RawOptions::for_platform("linux").with_tests(false)).unwrap_err();
        assert_eq!(err, ConfigError::HostBuildWithoutTests);
    }

    #[test]
    fn test_shared_rejected_on_avr() {
        let raw = RawOptions {
            shared: Some(true),
            ..RawOptions::for_platform("avr")
        };
        assert_eq!(validate(&raw).unwrap_err(), ConfigError::SharedOnAvr);

        let raw = RawOptions {
            shared: Some(true),
            fpic: Some(true),
            ..RawOptions::for_platform("linux")
        };
        let config = validate(&raw).unwrap();
        assert!(config.shared());
        assert!(config.position_independent_code());
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let mut base = RawOptions::for_platform("linux").with_tests(true);
        base.merge(RawOptions {
            platform: Some("avr".to_string()),
            features: vec!["ethernet".to_string()],
            fpic: Some(true),
            ..Default::default()
        });

        assert_eq!(base.platform.as_deref(), Some("avr"));
        assert_eq!(base.features, vec!["ethernet".to_string()]);
        assert_eq!(base.tests, Some(true));
        assert_eq!(base.fpic, Some(true));
    }

    #[test]
    fn test_platform_override_drops_inherited_unusable_features() {
        let mut base = RawOptions::for_platform("avr").with_feature("ethernet");
        base.merge(RawOptions {
            platform: Some("linux".to_string()),
            ..Default::default()
        });

        assert!(base.features.is_empty());
        let config = validate(&base).unwrap();
        assert_eq!(config.platform(), Platform::Linux);
        assert!(config.verification_enabled());
    }

    #[test]
    fn test_platform_override_keeps_usable_features() {
        let mut base = RawOptions::for_platform("avr").with_feature("ethernet");
        base.merge(RawOptions {
            platform: Some("AVR".to_string()),
            ..Default::default()
        });

        assert_eq!(base.features, vec!["ethernet".to_string()]);
        assert!(validate(&base).unwrap().network_enabled());
    }

    #[test]
    fn test_explicit_features_with_platform_are_not_dropped() {
        let mut base = RawOptions::default();
        base.merge(RawOptions {
            platform: Some("linux".to_string()),
            features: vec!["ethernet".to_string()],
            ..Default::default()
        });

        assert_eq!(
            validate(&base).unwrap_err(),
            ConfigError::UnsupportedFeature {
                feature: Feature::Ethernet,
                platform: Platform::Linux,
            }
        );
    }
}
