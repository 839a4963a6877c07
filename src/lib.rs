//! # BMP Client
//!
//! Client library for the BMP device-fingerprinting and behavior-mitigation
//! service. It sends JSON requests over HTTP, threads the opaque session the
//! service issues through a short init → sensor → feedback exchange, and
//! returns typed results.
//!
//! ## Protocol Overview
//!
//! ```text
//!   init ──────────> sensor ──────────> sensor ... ──────────> feedback
//!   {device,         {sensor,           (each call sends        {valid,
//!    session #0}      session #1,        the previous session)   reportData}
//!                     reportData}
//! ```
//!
//! ### Error Categories
//!
//! | Variant              | Meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `Transport`          | request could not be built, sent, or read        |
//! | `MalformedResponse`  | body did not match the expected schema           |
//! | `Remote`             | the service rejected the request                 |
//!
//! None of them are retried. A failed call never changes a session.
//!
//! ## Quick Start
//!
//! ### Stateful handle
//!
//! ```rust,ignore
//! use bmp::{with_language, Client};
//!
//! let client = Client::new_remote("api-key")?;
//! let (device, mut session) = client.android_bmp_init().await?;
//!
//! let (sensor, report) = session
//!     .sensor("3.3.1", "com.example.app", vec![with_language("en")])
//!     .await?;
//!
//! client.bmp_feedback(true, &report).await?;
//! ```
//!
//! ### Manual threading
//!
//! ```rust,ignore
//! use bmp::{Android, Client};
//!
//! let client = Client::new_remote("api-key")?;
//! let (device, session) = client.bmp_init::<Android>(&()).await?;
//! let outcome = client
//!     .bmp_sensor::<Android>("3.3.1", "com.example.app", &session, Vec::new())
//!     .await?;
//! let next_session = outcome.session;
//! ```
//!
//! ## Modules
//!
//! - [`client`]: transport client and pluggable HTTP sender
//! - [`protocol`]: request composition, session value, response classification
//! - [`bmp`]: platforms, device descriptors, value-passing calls and the session handle
//! - [`config`]: configuration management
//! - [`error`]: error types and result aliases

pub mod bmp;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;

// Re-exports for convenience
pub use bmp::{
    Android, AndroidDevice, BmpSession, Ios, IosDevice, IosInitQuery, Platform, PlatformKind,
    ReportData, SensorOutcome, SessionlessOutcome,
};
pub use client::{Client, ClientOption, HttpSender};
pub use config::Config;
pub use error::{BmpError, RemoteError, Result};
pub use protocol::{
    with_app_version, with_app_version_code, with_dci_script, with_language,
    with_mocked_dci_script, with_option, with_params, with_session, BmpOption, RequestPayload,
    SessionState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
