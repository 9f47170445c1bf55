use std::path::Path;

use sled::Db;

use crate::models::errors::VerifyError;
use crate::models::verification::VerificationRecord;

fn order_key(order_id: u64) -> Vec<u8> {
    format!("order:{}", order_id).into_bytes()
}

fn remote_key(remote_order_id: &str) -> Vec<u8> {
    format!("remote:{}", remote_order_id).into_bytes()
}

/// Persistence for verification records, keyed by local order id with a
/// secondary index on the remote order id. Saves are optimistic: the caller's
/// record version must match the stored version or the save is rejected.
pub struct VerificationStore {
    db: Db,
}

impl VerificationStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VerifyError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// Insert a brand-new record. Both the order id and the remote order id
    /// must be unused; a concurrent insert of either loses.
    pub fn insert_new(&self, record: &VerificationRecord) -> Result<(), VerifyError> {
        let bytes = serde_json::to_vec(record)?;
        let primary = self.db.compare_and_swap(
            order_key(record.order_id),
            None as Option<&[u8]>,
            Some(bytes),
        )?;
        if primary.is_err() {
            return Err(VerifyError::ConcurrentModification {
                order_id: record.order_id,
            });
        }

        let index = self.db.compare_and_swap(
            remote_key(&record.remote_order_id),
            None as Option<&[u8]>,
            Some(record.order_id.to_be_bytes().to_vec()),
        )?;
        if index.is_err() {
            // The remote id is taken; undo the primary write so no record
            // without an index entry is left behind
            self.db.remove(order_key(record.order_id))?;
            return Err(VerifyError::ConcurrentModification {
                order_id: record.order_id,
            });
        }

        self.db.flush()?;
        Ok(())
    }

    pub fn load_by_order_id(&self, order_id: u64) -> Result<Option<VerificationRecord>, VerifyError> {
        match self.db.get(order_key(order_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn load_by_remote_id(
        &self,
        remote_order_id: &str,
    ) -> Result<Option<VerificationRecord>, VerifyError> {
        let Some(index) = self.db.get(remote_key(remote_order_id))? else {
            return Ok(None);
        };
        let order_id = u64::from_be_bytes(
            index
                .as_ref()
                .try_into()
                .map_err(|_| VerifyError::Storage("corrupt remote order index".to_string()))?,
        );
        self.load_by_order_id(order_id)
    }

    /// Optimistic save. Succeeds only when the record's version matches the
    /// stored one; the returned record carries the bumped version.
    pub fn save(&self, record: &VerificationRecord) -> Result<VerificationRecord, VerifyError> {
        let key = order_key(record.order_id);
        let current = self.db.get(&key)?.ok_or_else(|| VerifyError::NotFound {
            id: record.order_id.to_string(),
        })?;

        let stored: VerificationRecord = serde_json::from_slice(&current)?;
        if stored.version != record.version {
            return Err(VerifyError::ConcurrentModification {
                order_id: record.order_id,
            });
        }

        let mut next = record.clone();
        next.version += 1;
        let bytes = serde_json::to_vec(&next)?;

        match self.db.compare_and_swap(key, Some(current), Some(bytes))? {
            Ok(()) => {
                self.db.flush()?;
                Ok(next)
            }
            Err(_) => Err(VerifyError::ConcurrentModification {
                order_id: record.order_id,
            }),
        }
    }

    /// Underlying sled handle, shared with the deferred batch queue.
    pub fn sled_db(&self) -> &Db {
        &self.db
    }
}
