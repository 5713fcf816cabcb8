use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::CategoryGroup;
use crate::error::StoreError;
use crate::schema::AssetKind;

/// A named financial subject owned by exactly one consultant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub consultant_id: String,
    pub name: String,
}

/// Direction of a persisted transaction, derived from the normalized sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub client_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Amount in currency minor units (cents). Integer so the dedup triple
    /// compares exactly.
    pub amount: i64,
    pub category: String,
    pub group: CategoryGroup,
    pub kind: TransactionKind,
    pub institution: String,
}

impl TransactionRecord {
    /// The identity triple used for idempotent inserts: re-ingesting the
    /// same statement must not duplicate rows.
    pub fn key(&self) -> (NaiveDate, i64, String) {
        (self.date, self.amount, self.description.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub client_id: String,
    pub ticker: String,
    pub kind: AssetKind,
    pub quantity: Option<f64>,
    pub current_price: Option<f64>,
    pub total_value: f64,
    pub institution: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: String,
    pub client_id: String,
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub profession: Option<String>,
    pub monthly_income: Option<f64>,
    pub marital_status: Option<String>,
    pub dependents: Option<u32>,
}

/// Converts a wire amount (JSON number) to currency minor units, rounding
/// half-away-from-zero.
pub fn minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// The narrow CRUD contract over the relational store: four logical tables
/// (clients, profiles, transactions, assets). The orchestrator never assumes
/// an in-memory view is authoritative: dedup keys and client names are
/// always re-queried through this boundary.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn clients_for(&self, consultant_id: &str) -> Result<Vec<Client>, StoreError>;

    async fn insert_client(&self, consultant_id: &str, name: &str) -> Result<Client, StoreError>;

    /// Removes the client and every transaction, asset, and profile row that
    /// references it. Orphaned references are never left behind.
    async fn delete_client(&self, client_id: &str) -> Result<(), StoreError>;

    async fn profile_for(&self, client_id: &str) -> Result<Option<ProfileRecord>, StoreError>;

    async fn insert_profile(&self, profile: ProfileRecord) -> Result<(), StoreError>;

    async fn update_profile(&self, profile: ProfileRecord) -> Result<(), StoreError>;

    async fn transactions_for(
        &self,
        client_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError>;

    async fn insert_transactions(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<(), StoreError>;

    async fn assets_for(&self, client_id: &str) -> Result<Vec<AssetRecord>, StoreError>;

    async fn delete_assets(&self, client_id: &str) -> Result<(), StoreError>;

    async fn insert_assets(&self, records: Vec<AssetRecord>) -> Result<(), StoreError>;
}

#[derive(Default)]
struct StoreInner {
    clients: Vec<Client>,
    profiles: Vec<ProfileRecord>,
    transactions: Vec<TransactionRecord>,
    assets: Vec<AssetRecord>,
}

/// In-process implementation of the store boundary. System of record for
/// tests and the reference semantics for an external SQL backing.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RelationalStore for MemoryStore {
    async fn clients_for(&self, consultant_id: &str) -> Result<Vec<Client>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .clients
            .iter()
            .filter(|c| c.consultant_id == consultant_id)
            .cloned()
            .collect())
    }

    async fn insert_client(&self, consultant_id: &str, name: &str) -> Result<Client, StoreError> {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            consultant_id: consultant_id.to_string(),
            name: name.to_string(),
        };
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.clients.push(client.clone());
        Ok(client)
    }

    async fn delete_client(&self, client_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.clients.retain(|c| c.id != client_id);
        inner.profiles.retain(|p| p.client_id != client_id);
        inner.transactions.retain(|t| t.client_id != client_id);
        inner.assets.retain(|a| a.client_id != client_id);
        Ok(())
    }

    async fn profile_for(&self, client_id: &str) -> Result<Option<ProfileRecord>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .profiles
            .iter()
            .find(|p| p.client_id == client_id)
            .cloned())
    }

    async fn insert_profile(&self, profile: ProfileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.profiles.push(profile);
        Ok(())
    }

    async fn update_profile(&self, profile: ProfileRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        match inner
            .profiles
            .iter_mut()
            .find(|p| p.client_id == profile.client_id)
        {
            Some(existing) => {
                *existing = profile;
                Ok(())
            }
            None => Err(StoreError::new(format!(
                "no profile row for client {}",
                profile.client_id
            ))),
        }
    }

    async fn transactions_for(
        &self,
        client_id: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .transactions
            .iter()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn insert_transactions(
        &self,
        records: Vec<TransactionRecord>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.transactions.extend(records);
        Ok(())
    }

    async fn assets_for(&self, client_id: &str) -> Result<Vec<AssetRecord>, StoreError> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .assets
            .iter()
            .filter(|a| a.client_id == client_id)
            .cloned()
            .collect())
    }

    async fn delete_assets(&self, client_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.assets.retain(|a| a.client_id != client_id);
        Ok(())
    }

    async fn insert_assets(&self, records: Vec<AssetRecord>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.assets.extend(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units_rounding() {
        assert_eq!(minor_units(-89.90), -8990);
        assert_eq!(minor_units(150.0), 15000);
        assert_eq!(minor_units(0.005), 1);
        assert_eq!(minor_units(-0.005), -1);
    }

    #[tokio::test]
    async fn test_delete_client_cascades() {
        let store = MemoryStore::new();
        let client = store.insert_client("consultant-1", "Maria Silva").await.unwrap();

        store
            .insert_transactions(vec![TransactionRecord {
                id: Uuid::new_v4().to_string(),
                client_id: client.id.clone(),
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                description: "UBER*TRIP".to_string(),
                amount: -8990,
                category: "Transport".to_string(),
                group: CategoryGroup::Transport,
                kind: TransactionKind::Debit,
                institution: "Acme Bank".to_string(),
            }])
            .await
            .unwrap();
        store
            .insert_assets(vec![AssetRecord {
                client_id: client.id.clone(),
                ticker: "VTI".to_string(),
                kind: AssetKind::Etf,
                quantity: Some(10.0),
                current_price: None,
                total_value: 2500.0,
                institution: "Broker Co".to_string(),
            }])
            .await
            .unwrap();

        store.delete_client(&client.id).await.unwrap();

        assert!(store.clients_for("consultant-1").await.unwrap().is_empty());
        assert!(store.transactions_for(&client.id).await.unwrap().is_empty());
        assert!(store.assets_for(&client.id).await.unwrap().is_empty());
    }
}
