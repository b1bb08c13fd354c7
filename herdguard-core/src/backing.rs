//! Backing store abstraction.
//!
//! The authoritative record source. The cache layer only ever asks it for
//! the full collection; query semantics stay with the implementation.

use async_trait::async_trait;

use crate::error::LoadError;
use crate::record::{CacheableRecord, RecordCollection};

/// Trait for the authoritative source of a record collection.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// struct PgUsers { pool: Pool }
///
/// #[async_trait]
/// impl BackingStore<UserProfile> for PgUsers {
///     async fn load_all(&self) -> Result<Vec<UserProfile>, LoadError> {
///         // SELECT id, first_name, last_name, email FROM users
///     }
/// }
/// ```
#[async_trait]
pub trait BackingStore<T: CacheableRecord>: Send + Sync {
    /// Load every record, in the store's natural order.
    ///
    /// An empty collection is a valid result, not an error.
    async fn load_all(&self) -> Result<RecordCollection<T>, LoadError>;
}
