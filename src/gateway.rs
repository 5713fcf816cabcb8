use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use uuid::Uuid;

use crate::category::classify;
use crate::error::{IngestError, PersistenceKind, Result};
use crate::schema::{ExtractedAsset, ExtractedTransaction, PersonalDataPatch};
use crate::store::{
    minor_units, AssetRecord, ProfileRecord, RelationalStore, TransactionKind, TransactionRecord,
};

/// Writes one ingestion's output for a client: profile upsert, deduplicated
/// transaction inserts, and snapshot-replaced assets. Each operation fails
/// independently; nothing is rolled back.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn RelationalStore>,
}

impl PersistenceGateway {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, client_id: &str) -> Result<Option<ProfileRecord>> {
        self.store
            .profile_for(client_id)
            .await
            .map_err(|e| persistence(PersistenceKind::Profile, e))
    }

    /// Updates only the fields present in the patch; fields absent from the
    /// patch are left untouched on update and defaulted only on insert. An
    /// entirely empty patch is a no-op.
    pub async fn upsert_personal_data(
        &self,
        client_id: &str,
        patch: &PersonalDataPatch,
    ) -> Result<()> {
        if patch.is_empty() {
            debug!("no personal data extracted for client {client_id}, skipping upsert");
            return Ok(());
        }

        let existing = self
            .store
            .profile_for(client_id)
            .await
            .map_err(|e| persistence(PersistenceKind::Profile, e))?;

        match existing {
            Some(mut profile) => {
                apply_patch(&mut profile, patch);
                self.store
                    .update_profile(profile)
                    .await
                    .map_err(|e| persistence(PersistenceKind::Profile, e))
            }
            None => {
                let mut profile = ProfileRecord {
                    id: Uuid::new_v4().to_string(),
                    client_id: client_id.to_string(),
                    ..ProfileRecord::default()
                };
                apply_patch(&mut profile, patch);
                self.store
                    .insert_profile(profile)
                    .await
                    .map_err(|e| persistence(PersistenceKind::Profile, e))
            }
        }
    }

    /// Inserts only the transactions whose (date, amount, description) triple
    /// is not already stored for the client. The existing triples are
    /// re-queried from the store, never taken from an in-memory view, so
    /// calling this twice with the same batch is idempotent. Returns the
    /// number of rows actually inserted.
    pub async fn insert_new_transactions(
        &self,
        client_id: &str,
        records: Vec<TransactionRecord>,
    ) -> Result<usize> {
        let existing: HashSet<_> = self
            .store
            .transactions_for(client_id)
            .await
            .map_err(|e| persistence(PersistenceKind::Transaction, e))?
            .iter()
            .map(TransactionRecord::key)
            .collect();

        let mut seen = existing;
        let fresh: Vec<TransactionRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.key()))
            .collect();

        let inserted = fresh.len();
        if inserted > 0 {
            self.store
                .insert_transactions(fresh)
                .await
                .map_err(|e| persistence(PersistenceKind::Transaction, e))?;
        }
        debug!("inserted {inserted} new transaction(s) for client {client_id}");
        Ok(inserted)
    }

    /// Deletes the client's prior asset rows and inserts the new set. Skipped
    /// entirely when the incoming list is empty: an extraction that found no
    /// assets must not wipe previously known holdings. Returns the number of
    /// rows in the new snapshot.
    pub async fn replace_assets(
        &self,
        client_id: &str,
        records: Vec<AssetRecord>,
    ) -> Result<usize> {
        if records.is_empty() {
            debug!("no assets extracted for client {client_id}, keeping prior snapshot");
            return Ok(0);
        }

        self.store
            .delete_assets(client_id)
            .await
            .map_err(|e| persistence(PersistenceKind::Asset, e))?;

        let count = records.len();
        self.store
            .insert_assets(records)
            .await
            .map_err(|e| persistence(PersistenceKind::Asset, e))?;
        Ok(count)
    }
}

fn persistence(kind: PersistenceKind, error: crate::error::StoreError) -> IngestError {
    IngestError::Persistence {
        kind,
        message: error.to_string(),
    }
}

fn apply_patch(profile: &mut ProfileRecord, patch: &PersonalDataPatch) {
    if let Some(v) = &patch.full_name {
        profile.full_name = Some(v.clone());
    }
    if let Some(v) = patch.birth_date {
        profile.birth_date = Some(v);
    }
    if let Some(v) = &patch.profession {
        profile.profession = Some(v.clone());
    }
    if let Some(v) = patch.monthly_income {
        profile.monthly_income = Some(v);
    }
    if let Some(v) = &patch.marital_status {
        profile.marital_status = Some(v.clone());
    }
    if let Some(v) = patch.dependents {
        profile.dependents = Some(v);
    }
}

/// Shapes extracted transactions into persisted records: classifier group
/// attached, amount converted to minor units, kind derived from the
/// normalized sign.
pub fn transaction_records(
    client_id: &str,
    transactions: &[ExtractedTransaction],
) -> Vec<TransactionRecord> {
    transactions
        .iter()
        .map(|tx| {
            let amount = minor_units(tx.amount);
            TransactionRecord {
                id: Uuid::new_v4().to_string(),
                client_id: client_id.to_string(),
                date: tx.date,
                description: tx.description.clone(),
                amount,
                category: tx.category.clone(),
                group: classify(&tx.category),
                kind: if amount < 0 {
                    TransactionKind::Debit
                } else {
                    TransactionKind::Credit
                },
                institution: tx.institution.clone(),
            }
        })
        .collect()
}

pub fn asset_records(client_id: &str, assets: &[ExtractedAsset]) -> Vec<AssetRecord> {
    assets
        .iter()
        .map(|asset| AssetRecord {
            client_id: client_id.to_string(),
            ticker: asset.ticker.clone(),
            kind: asset.kind.clone(),
            quantity: asset.quantity,
            current_price: asset.current_price,
            total_value: asset.total_value,
            institution: asset.institution.clone(),
        })
        .collect()
}
