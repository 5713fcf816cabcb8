use std::sync::Arc;

use log::debug;

use crate::error::{IngestError, Result};
use crate::store::{Client, RelationalStore};

/// Maintains the set of known clients for a consultant. Exact case-insensitive
/// name equality is the only automatic linking rule; anything fuzzier requires
/// manual selection by the user.
#[derive(Clone)]
pub struct ClientRegistry {
    store: Arc<dyn RelationalStore>,
}

impl ClientRegistry {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    /// All clients owned by the consultant, ordered by name.
    pub async fn list(&self, consultant_id: &str) -> Result<Vec<Client>> {
        let mut clients = self
            .store
            .clients_for(consultant_id)
            .await
            .map_err(|e| IngestError::Registry(e.to_string()))?;
        clients.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(clients)
    }

    /// Case-insensitive exact match within the consultant's own clients only.
    /// "maria silva" matches "Maria Silva" but never "Maria Silva Jr", and
    /// never a same-named client under a different consultant.
    pub async fn find_by_name(&self, consultant_id: &str, name: &str) -> Result<Option<Client>> {
        let needle = name.trim().to_lowercase();
        let clients = self
            .store
            .clients_for(consultant_id)
            .await
            .map_err(|e| IngestError::Registry(e.to_string()))?;
        Ok(clients
            .into_iter()
            .find(|c| c.name.trim().to_lowercase() == needle))
    }

    pub async fn create(&self, consultant_id: &str, name: &str) -> Result<Client> {
        let client = self
            .store
            .insert_client(consultant_id, name.trim())
            .await
            .map_err(|e| IngestError::Registry(e.to_string()))?;
        debug!("created client '{}' for consultant {}", client.name, consultant_id);
        Ok(client)
    }

    /// Cascades to the client's transactions, assets, and profile.
    pub async fn delete(&self, client_id: &str) -> Result<()> {
        self.store
            .delete_client(client_id)
            .await
            .map_err(|e| IngestError::Registry(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> ClientRegistry {
        ClientRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_find_by_name_is_case_insensitive_exact() {
        let registry = registry();
        registry.create("consultant-1", "maria silva").await.unwrap();
        registry.create("consultant-1", "Maria Silva Jr").await.unwrap();

        let found = registry
            .find_by_name("consultant-1", "Maria Silva")
            .await
            .unwrap();
        assert_eq!(found.unwrap().name, "maria silva");

        let missing = registry
            .find_by_name("consultant-1", "Maria Sil")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_is_scoped_to_the_consultant() {
        let registry = registry();
        registry.create("consultant-1", "Maria Silva").await.unwrap();

        let other = registry
            .find_by_name("consultant-2", "Maria Silva")
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let registry = registry();
        registry.create("consultant-1", "zoe").await.unwrap();
        registry.create("consultant-1", "Ana").await.unwrap();
        registry.create("consultant-1", "bruno").await.unwrap();

        let names: Vec<String> = registry
            .list("consultant-1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "bruno", "zoe"]);
    }

    #[tokio::test]
    async fn test_name_collisions_across_consultants_are_permitted() {
        let registry = registry();
        registry.create("consultant-1", "Ana").await.unwrap();
        registry.create("consultant-2", "Ana").await.unwrap();

        assert_eq!(registry.list("consultant-1").await.unwrap().len(), 1);
        assert_eq!(registry.list("consultant-2").await.unwrap().len(), 1);
    }
}
