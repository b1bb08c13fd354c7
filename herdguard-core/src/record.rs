//! Cacheable record types.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Marker trait for values that can live inside a cached record collection.
///
/// The cache layer never interprets a record beyond its `record_key`, which
/// must be stable for the lifetime of the record.
pub trait CacheableRecord:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable identity of this record.
    fn record_key(&self) -> String;
}

/// Ordered sequence of records in backing-store order.
pub type RecordCollection<T> = Vec<T>;

/// A user profile.
///
/// Serialized with camelCase field names so cached collections stay
/// readable by other services sharing the same key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(
        id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }
}

impl CacheableRecord for UserProfile {
    fn record_key(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_serializes_camel_case() {
        let user = UserProfile::new(1, "Ada", "Lovelace", "ada@example.com");
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"firstName\":\"Ada\""));
        assert!(json.contains("\"lastName\":\"Lovelace\""));
        assert_eq!(user.record_key(), "1");
    }
}
