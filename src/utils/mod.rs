//! Utility functions shared by the index and the service.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data and index directory management
//! - [`config`] - Service configuration (TOML file + environment)
//! - [`encoding`] - Variable-length integer and little-endian encoding
//!
//! ## Key Functions
//!
//! ```
//! use refindex::utils::{decode_varint, encode_varint};
//!
//! let mut buf = Vec::new();
//! encode_varint(300, &mut buf);
//! assert_eq!(decode_varint(&buf), Some((300, 2)));
//! ```

pub mod app_data;
pub mod config;
pub mod encoding;

pub use app_data::*;
pub use config::ServiceConfig;
pub use encoding::*;
