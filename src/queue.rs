use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use log::{info, warn};

use crate::document::TextExtractor;
use crate::error::{IngestError, Result};
use crate::gateway::{asset_records, transaction_records, PersistenceGateway};
use crate::llm::ExtractionOracle;
use crate::registry::ClientRegistry;
use crate::state::{IngestEvent, IngestStatus, QueueItem};
use crate::storage::DocumentStorage;
use crate::store::{Client, RelationalStore};

/// Live-status sink for the presentation layer. The orchestrator depends
/// only on this interface, never on a concrete UI.
pub trait IngestObserver: Send + Sync {
    fn on_item_progress(&self, _item_id: &str, _percent: u8) {}
    fn on_item_status(&self, _item_id: &str, _status: IngestStatus) {}
    fn on_log(&self, _line: &str) {}
}

/// No-op observer for headless use and unit tests.
pub struct NoopObserver;

impl IngestObserver for NoopObserver {}

/// Explicit session state owned by the presentation layer and passed by
/// reference into every run; there is no implicit global.
#[derive(Debug, Clone)]
pub struct IngestionSession {
    pub consultant_id: String,
    pub selected_client: Option<Client>,
    pub category_catalog: Option<Vec<String>>,
}

impl IngestionSession {
    pub fn new(consultant_id: impl Into<String>) -> Self {
        Self {
            consultant_id: consultant_id.into(),
            selected_client: None,
            category_catalog: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item_id: String,
    pub status: IngestStatus,
    pub client: Option<Client>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub outcomes: Vec<ItemOutcome>,
    /// Set when the last pending item completed: the client the presentation
    /// layer should now show.
    pub selected_client: Option<Client>,
}

/// The ingestion queue orchestrator: drives each pending document strictly
/// sequentially through upload, text extraction, oracle analysis, client
/// resolution, and persistence. The only component that sequences the
/// others; its collaborators know nothing about queue state.
pub struct IngestPipeline {
    storage: Arc<dyn DocumentStorage>,
    extractor: Arc<dyn TextExtractor>,
    oracle: Arc<dyn ExtractionOracle>,
    registry: ClientRegistry,
    gateway: PersistenceGateway,
    observer: Arc<dyn IngestObserver>,
    cancel: Option<Arc<AtomicBool>>,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        extractor: Arc<dyn TextExtractor>,
        oracle: Arc<dyn ExtractionOracle>,
        store: Arc<dyn RelationalStore>,
        observer: Arc<dyn IngestObserver>,
    ) -> Self {
        Self {
            storage,
            extractor,
            oracle,
            registry: ClientRegistry::new(store.clone()),
            gateway: PersistenceGateway::new(store),
            observer,
            cancel: None,
        }
    }

    /// Cooperative cancellation, checked between items and between phases
    /// within an item. An in-flight network call is not interrupted.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Runs every pending item (status Queued or Failed) to a terminal state,
    /// one at a time, in queue order. Already-completed items are skipped;
    /// one item's failure never aborts the run. No aggregate rollback occurs.
    pub async fn process_queue(
        &self,
        session: &mut IngestionSession,
        queue: &mut [QueueItem],
    ) -> RunReport {
        let pending: Vec<usize> = queue
            .iter()
            .enumerate()
            .filter(|(_, item)| item.status.is_pending())
            .map(|(idx, _)| idx)
            .collect();

        if pending.is_empty() {
            self.log_line("No documents pending ingestion");
            return RunReport::default();
        }

        self.log_line(format!(
            "Starting ingestion run: {} document(s) pending",
            pending.len()
        ));

        let mut report = RunReport::default();
        let total = pending.len();
        let mut last_client: Option<Client> = None;

        for (position, &idx) in pending.iter().enumerate() {
            if self.is_cancelled() {
                self.log_line(format!(
                    "Run cancelled, {} document(s) left unprocessed",
                    total - position
                ));
                break;
            }

            let item = &mut queue[idx];
            self.log_line(format!(
                "[{}/{}] Processing {}",
                position + 1,
                total,
                item.document.name
            ));

            match self.process_item(session, item).await {
                Ok(client) => {
                    self.transition(
                        item,
                        IngestEvent::Completed {
                            client_name: client.name.clone(),
                        },
                    );
                    self.log_line(format!(
                        "{} saved to client '{}'",
                        item.document.name, client.name
                    ));
                    report.completed += 1;
                    if position == total - 1 {
                        last_client = Some(client.clone());
                    }
                    report.outcomes.push(ItemOutcome {
                        item_id: item.id.clone(),
                        status: item.status,
                        client: Some(client),
                        error: None,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    self.transition(
                        item,
                        IngestEvent::Failed {
                            message: message.clone(),
                        },
                    );
                    self.log_line(format!("{} failed: {}", item.document.name, message));
                    report.failed += 1;
                    report.outcomes.push(ItemOutcome {
                        item_id: item.id.clone(),
                        status: item.status,
                        client: None,
                        error: Some(message),
                    });
                }
            }
            report.processed += 1;
        }

        if let Some(client) = last_client {
            self.log_line(format!("Selecting client '{}'", client.name));
            session.selected_client = Some(client.clone());
            report.selected_client = Some(client);
        }

        self.log_line(format!(
            "Run finished: {} succeeded, {} failed",
            report.completed, report.failed
        ));
        report
    }

    /// Drives one item through its phases. Every error is returned to the
    /// per-item boundary in `process_queue`; nothing escapes the run.
    async fn process_item(
        &self,
        session: &IngestionSession,
        item: &mut QueueItem,
    ) -> Result<Client> {
        self.transition(item, IngestEvent::UploadStarted);
        let observer = self.observer.clone();
        let item_id = item.id.clone();
        let on_progress = move |percent: u8| observer.on_item_progress(&item_id, percent);
        self.storage
            .upload(&item.document, &session.consultant_id, &on_progress)
            .await?;
        item.progress = 100;

        self.check_cancelled()?;
        self.transition(item, IngestEvent::TextExtractionStarted);
        let transcript = self.extractor.extract(&item.document)?;
        if transcript.trim().is_empty() {
            return Err(IngestError::UnreadableDocument(format!(
                "{} yielded no text content",
                item.document.name
            )));
        }

        self.check_cancelled()?;
        self.transition(item, IngestEvent::AnalysisStarted);
        let context = match &session.selected_client {
            Some(client) => self.gateway.profile(&client.id).await?,
            None => None,
        };
        let result = self
            .oracle
            .extract(
                &transcript,
                context.as_ref(),
                session.category_catalog.as_deref(),
            )
            .await?;

        let client = self
            .resolve_client(session, result.detected_client_name.as_deref())
            .await?;

        self.check_cancelled()?;
        self.transition(item, IngestEvent::SavingStarted);
        let transactions = transaction_records(&client.id, &result.transactions);
        let assets = asset_records(&client.id, &result.assets);

        // Each sub-operation is attempted regardless of earlier failures and
        // nothing is rolled back; the first failure is what the item reports.
        let mut first_failure: Option<IngestError> = None;
        if let Err(e) = self
            .gateway
            .upsert_personal_data(&client.id, &result.personal_data)
            .await
        {
            warn!("profile write failed for '{}': {e}", client.name);
            first_failure.get_or_insert(e);
        }
        if let Err(e) = self
            .gateway
            .insert_new_transactions(&client.id, transactions)
            .await
        {
            warn!("transaction write failed for '{}': {e}", client.name);
            first_failure.get_or_insert(e);
        }
        if let Err(e) = self.gateway.replace_assets(&client.id, assets).await {
            warn!("asset write failed for '{}': {e}", client.name);
            first_failure.get_or_insert(e);
        }
        if let Some(e) = first_failure {
            return Err(e);
        }

        Ok(client)
    }

    /// Resolves which client the document belongs to. The client list is
    /// re-fetched from the store on every call so clients auto-created by
    /// earlier items in the same run are visible. The system never guesses:
    /// with no detected name and no selected client the item fails.
    async fn resolve_client(
        &self,
        session: &IngestionSession,
        detected_name: Option<&str>,
    ) -> Result<Client> {
        match detected_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                match self
                    .registry
                    .find_by_name(&session.consultant_id, name)
                    .await?
                {
                    Some(client) => {
                        self.log_line(format!("Matched existing client '{}'", client.name));
                        Ok(client)
                    }
                    None => {
                        let client = self
                            .registry
                            .create(&session.consultant_id, name)
                            .await?;
                        self.log_line(format!("Created new client '{}'", client.name));
                        Ok(client)
                    }
                }
            }
            None => session
                .selected_client
                .clone()
                .ok_or(IngestError::UnresolvedClient),
        }
    }

    fn transition(&self, item: &mut QueueItem, event: IngestEvent) {
        item.advance(event);
        self.observer.on_item_status(&item.id, item.status);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(IngestError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn log_line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!("{message}");
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        self.observer.on_log(&line);
    }
}
