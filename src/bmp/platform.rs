//! Platform variants and their device descriptors.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Selection criteria sent as query parameters on the init call.
pub trait InitQuery: Default + Send + Sync {
    /// Query parameters, skipping unset criteria.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// No init criteria.
impl InitQuery for () {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// A device platform served by the BMP service.
pub trait Platform: Send + Sync + 'static {
    /// Path segment used in `/bmp/{platform}/...`
    const NAME: &'static str;

    /// Session key holding the device identifier
    const IDENTIFIER_KEY: &'static str;

    /// Device descriptor returned by init and sessionless sensor calls
    type Device: DeserializeOwned + Serialize + fmt::Debug + Clone + Send;

    /// Init selection criteria
    type InitQuery: InitQuery;
}

/// Android devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Android;

impl Platform for Android {
    const NAME: &'static str = "android";
    const IDENTIFIER_KEY: &'static str = "androidId";
    type Device = AndroidDevice;
    type InitQuery = ();
}

/// iOS devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ios;

impl Platform for Ios {
    const NAME: &'static str = "ios";
    const IDENTIFIER_KEY: &'static str = "udid";
    type Device = IosDevice;
    type InitQuery = IosInitQuery;
}

/// Android device descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AndroidDevice {
    /// Manufacturer (e.g. "Google")
    pub manufacturer: String,
    /// Hardware name
    pub hardware: String,
    /// Model name
    pub model: String,
    /// OS release
    pub release: String,
    /// Brand
    pub brand: String,
    /// Build id
    pub id: String,
    /// Screen height in pixels
    pub height_pixels: i64,
    /// Screen width in pixels
    pub width_pixels: i64,
}

/// iOS device descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IosDevice {
    /// Device name
    pub name: String,
    /// Model identifier
    pub model: String,
    /// iOS version
    #[serde(rename = "iosVersion")]
    pub ios_version: String,
}

/// iOS init criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IosInitQuery {
    /// Exact iOS version
    pub ios_version: String,
    /// Minimum iOS version (>=)
    pub min_ios_version: String,
    /// Maximum iOS version (<=)
    pub max_ios_version: String,
    /// Device model
    pub model: String,
}

impl IosInitQuery {
    /// Require an exact iOS version.
    pub fn with_ios_version(mut self, version: impl Into<String>) -> Self {
        self.ios_version = version.into();
        self
    }

    /// Require at least this iOS version.
    pub fn with_min_ios_version(mut self, version: impl Into<String>) -> Self {
        self.min_ios_version = version.into();
        self
    }

    /// Require at most this iOS version.
    pub fn with_max_ios_version(mut self, version: impl Into<String>) -> Self {
        self.max_ios_version = version.into();
        self
    }

    /// Require a device model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl InitQuery for IosInitQuery {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("iosVersion", &self.ios_version),
            ("maxIosVersion", &self.max_ios_version),
            ("minIosVersion", &self.min_ios_version),
            ("model", &self.model),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key, value.clone()))
        .collect()
    }
}

/// Runtime platform selection (used by the CLI).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformKind {
    /// Android
    Android,
    /// iOS
    Ios,
}

impl PlatformKind {
    /// Path segment name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Android => Android::NAME,
            Self::Ios => Ios::NAME,
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PlatformKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            _ => Err(format!("Unknown platform: {s}")),
        }
    }
}
