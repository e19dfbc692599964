// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Configuration for flicker tools.
//!
//! [`ConfigService`] serializes values as JSON and hands raw bytes to a
//! [`ConfigStore`]. [`FsConfigStore`] keeps one `<key>.json` file per key,
//! by default under the platform config directory.

pub mod config;
pub mod fs;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use fs::FsConfigStore;
