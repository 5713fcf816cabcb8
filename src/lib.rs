//! # Statement Ingest
//!
//! A library for ingesting bank and credit-card statements into structured
//! per-client financial records via LLM extraction.
//!
//! ## Core Concepts
//!
//! - **Queue**: an ordered list of documents, each processed strictly
//!   sequentially to a terminal state (`Completed` or `Failed`)
//! - **Oracle**: the external extraction model that turns a document
//!   transcript into a typed financial payload
//! - **Client resolution**: the detected account-holder name is matched
//!   case-insensitively against the consultant's clients, auto-creating one
//!   when no match exists; with no detected name the session's selected
//!   client is used, and with neither the item fails rather than guess
//! - **Idempotent persistence**: transactions dedup on the
//!   (date, amount, description) triple, assets are a replace-on-write
//!   snapshot, profiles are patched field-by-field
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use statement_ingest::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let oracle = StatementExtractor::new(OracleClient::new(api_key));
//! let pipeline = IngestPipeline::new(
//!     Arc::new(LocalStorage::new("/var/lib/advisor/uploads")),
//!     Arc::new(StatementTextExtractor::new()),
//!     Arc::new(oracle),
//!     store,
//!     Arc::new(NoopObserver),
//! );
//!
//! let mut session = IngestionSession::new("consultant-1");
//! let mut queue = vec![
//!     QueueItem::new(Document::from_path("statements/january.pdf".as_ref())?),
//! ];
//! let report = pipeline.process_queue(&mut session, &mut queue).await;
//! println!("{} saved, {} failed", report.completed, report.failed);
//! ```

pub mod category;
pub mod document;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod queue;
pub mod registry;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;

pub use category::{classify, CategoryGroup, DEFAULT_CATEGORIES};
pub use document::{Document, StatementTextExtractor, TextExtractor};
pub use error::{IngestError, PersistenceKind, Result, StoreError};
pub use gateway::PersistenceGateway;
pub use llm::{ExtractionOracle, OracleClient, StatementExtractor};
pub use queue::{
    IngestObserver, IngestPipeline, IngestionSession, ItemOutcome, NoopObserver, RunReport,
};
pub use registry::ClientRegistry;
pub use schema::*;
pub use state::{IngestEvent, IngestStatus, QueueItem};
pub use storage::{DocumentStorage, LocalStorage, ProgressFn, StoredDocument};
pub use store::*;
