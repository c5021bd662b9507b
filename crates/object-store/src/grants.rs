//! Access grant issuance.
//!
//! Grant keys are ULIDs: a 48-bit millisecond timestamp followed by 80 random
//! bits, rendered as 26 Crockford base32 characters. Keys from one issuer sort
//! in issuance order, including keys minted within the same millisecond.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ulid::Generator;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::types::{Blob, Grant};

/// Mints, revokes and resolves access grants against the catalog.
pub struct GrantIssuer {
    catalog: Catalog,
    keys: Mutex<Generator>,
}

impl GrantIssuer {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            keys: Mutex::new(Generator::new()),
        }
    }

    fn next_key(&self, now: DateTime<Utc>) -> Result<String> {
        // Overflow needs 2^80 keys inside one millisecond
        let ulid = self.keys.lock().generate_from_datetime(now.into())?;
        Ok(ulid.to_string())
    }

    /// Mint a grant for an existing blob.
    pub async fn issue(&self, bucket_id: &str, blob_id: &str, now: DateTime<Utc>) -> Result<Grant> {
        let key = self.next_key(now)?;
        let grant = self
            .catalog
            .create_grant(&key, bucket_id, blob_id, now)
            .await?;
        tracing::info!(key = %grant.key, bucket_id, blob_id, "access grant issued");
        Ok(grant)
    }

    pub async fn revoke(&self, key: &str) -> Result<()> {
        self.catalog.delete_grant(key).await?;
        tracing::info!(key, "access grant revoked");
        Ok(())
    }

    /// The blob a grant unlocks.
    pub async fn resolve(&self, key: &str) -> Result<Blob> {
        self.catalog.resolve_grant(key).await
    }
}

impl std::fmt::Debug for GrantIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantIssuer")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
