//! # murmur-settings
//!
//! Layered configuration for the Murmur relay.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`MurmurSettings::default()`]
//! 2. **Settings file**: `~/.murmur/settings.json` or an explicit path
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `MURMUR_*` overrides
//!
//! Settings are passed explicitly to the components that need them; there is
//! no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path};
pub use types::*;
