use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::KeyAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyStatus {
    /// Signs new tokens. At most one per server context.
    Active,
    /// Kept only to verify tokens signed before the last rotation.
    Retired,
}

/// One signing key as handed to, and read back from, persistence.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKeyRecord {
    pub key_id: String,
    pub algorithm: KeyAlgorithm,
    pub serialized_public_key: String,
    pub serialized_private_key: String,
    pub created_at: DateTime<Utc>,
    pub status: KeyStatus,
}

impl GeneratedKeyRecord {
    pub fn is_active(&self) -> bool {
        self.status == KeyStatus::Active
    }

    /// A copy of this record demoted to [`KeyStatus::Retired`].
    pub fn retired(&self) -> Self {
        Self {
            status: KeyStatus::Retired,
            ..self.clone()
        }
    }
}

impl fmt::Debug for GeneratedKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeyRecord")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("created_at", &self.created_at)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
