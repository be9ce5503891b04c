//! Persistent key-value storage seam and the keys the client owns.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

/// Set to `"true"` once the user has provisioned an MPIN on this device.
pub(crate) const HAS_MPIN_KEY: &str = "has_mpin";
/// Bearer token of the current session.
pub(crate) const AUTH_TOKEN_KEY: &str = "auth_token";
/// JSON-encoded [`UserProfile`](crate::session::UserProfile).
pub(crate) const USER_KEY: &str = "user";
