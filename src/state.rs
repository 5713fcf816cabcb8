use log::warn;
use serde::Serialize;
use uuid::Uuid;

use crate::document::Document;

/// Per-item ingestion state. `Completed` and `Failed` are terminal for a run,
/// but a `Failed` item is eligible to be re-submitted in a later run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Queued,
    Uploading,
    Extracting,
    /// The oracle-classification phase: transcript sent to the extraction
    /// model and awaiting the structured payload.
    Analyzing,
    Saving,
    Completed,
    Failed,
}

impl IngestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestStatus::Completed | IngestStatus::Failed)
    }

    /// Whether the item belongs to the pending subset of a run. Completed
    /// items are skipped; reprocessing is never silent.
    pub fn is_pending(&self) -> bool {
        matches!(self, IngestStatus::Queued | IngestStatus::Failed)
    }
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestStatus::Queued => "queued",
            IngestStatus::Uploading => "uploading",
            IngestStatus::Extracting => "extracting",
            IngestStatus::Analyzing => "analyzing",
            IngestStatus::Saving => "saving",
            IngestStatus::Completed => "completed",
            IngestStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Events that drive an item through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// The raw document starts streaming to storage.
    UploadStarted,
    /// Upload finished; text extraction begins.
    TextExtractionStarted,
    /// Transcript ready; the oracle call begins.
    AnalysisStarted,
    /// Oracle payload accepted and a client resolved; persistence begins.
    SavingStarted,
    /// All persistence sub-operations attempted successfully.
    Completed { client_name: String },
    /// Any phase failed; the message is recorded verbatim on the item.
    Failed { message: String },
}

/// One document awaiting or undergoing ingestion. Mutated only by the
/// orchestrator, one state transition at a time, never concurrently.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: String,
    pub document: Document,
    pub status: IngestStatus,
    /// 0–100, meaningful only while Uploading.
    pub progress: u8,
    /// Present only in the Failed state.
    pub error: Option<String>,
    /// Present only in the Completed state; records which client the item
    /// was attributed to.
    pub result_message: Option<String>,
}

impl QueueItem {
    pub fn new(document: Document) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document,
            status: IngestStatus::Queued,
            progress: 0,
            error: None,
            result_message: None,
        }
    }

    /// The single transition function of the state machine. Illegal
    /// transitions are ignored (and logged) rather than corrupting the item.
    pub fn advance(&mut self, event: IngestEvent) {
        let next = match (self.status, &event) {
            (IngestStatus::Queued | IngestStatus::Failed, IngestEvent::UploadStarted) => {
                Some(IngestStatus::Uploading)
            }
            (IngestStatus::Uploading, IngestEvent::TextExtractionStarted) => {
                Some(IngestStatus::Extracting)
            }
            (IngestStatus::Extracting, IngestEvent::AnalysisStarted) => {
                Some(IngestStatus::Analyzing)
            }
            (IngestStatus::Analyzing, IngestEvent::SavingStarted) => Some(IngestStatus::Saving),
            (IngestStatus::Saving, IngestEvent::Completed { .. }) => {
                Some(IngestStatus::Completed)
            }
            (status, IngestEvent::Failed { .. }) if !status.is_terminal() => {
                Some(IngestStatus::Failed)
            }
            _ => None,
        };

        let Some(next) = next else {
            warn!(
                "ignoring illegal transition {:?} from state {} for item {}",
                event, self.status, self.id
            );
            return;
        };

        match event {
            IngestEvent::UploadStarted => {
                // re-submission of a previously failed item starts clean
                self.progress = 0;
                self.error = None;
                self.result_message = None;
            }
            IngestEvent::Completed { client_name } => {
                self.result_message = Some(format!("Saved to client {client_name}"));
            }
            IngestEvent::Failed { message } => {
                self.error = Some(message);
            }
            _ => {}
        }
        self.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> QueueItem {
        QueueItem::new(Document::new("statement.txt", "text/plain", b"x".to_vec()))
    }

    #[test]
    fn test_happy_path_traverses_all_states() {
        let mut item = item();
        assert_eq!(item.status, IngestStatus::Queued);

        item.advance(IngestEvent::UploadStarted);
        assert_eq!(item.status, IngestStatus::Uploading);
        item.advance(IngestEvent::TextExtractionStarted);
        assert_eq!(item.status, IngestStatus::Extracting);
        item.advance(IngestEvent::AnalysisStarted);
        assert_eq!(item.status, IngestStatus::Analyzing);
        item.advance(IngestEvent::SavingStarted);
        assert_eq!(item.status, IngestStatus::Saving);
        item.advance(IngestEvent::Completed {
            client_name: "Maria Silva".to_string(),
        });
        assert_eq!(item.status, IngestStatus::Completed);
        assert!(item.result_message.as_deref().unwrap().contains("Maria Silva"));
        assert!(item.error.is_none());
    }

    #[test]
    fn test_failure_is_reachable_from_every_non_terminal_state() {
        for events in [
            vec![],
            vec![IngestEvent::UploadStarted],
            vec![IngestEvent::UploadStarted, IngestEvent::TextExtractionStarted],
            vec![
                IngestEvent::UploadStarted,
                IngestEvent::TextExtractionStarted,
                IngestEvent::AnalysisStarted,
            ],
            vec![
                IngestEvent::UploadStarted,
                IngestEvent::TextExtractionStarted,
                IngestEvent::AnalysisStarted,
                IngestEvent::SavingStarted,
            ],
        ] {
            let mut item = item();
            for event in events {
                item.advance(event);
            }
            item.advance(IngestEvent::Failed {
                message: "boom".to_string(),
            });
            assert_eq!(item.status, IngestStatus::Failed);
            assert_eq!(item.error.as_deref(), Some("boom"));
        }
    }

    #[test]
    fn test_terminal_states_ignore_further_events() {
        let mut item = item();
        item.advance(IngestEvent::Failed {
            message: "boom".to_string(),
        });
        item.advance(IngestEvent::TextExtractionStarted);
        assert_eq!(item.status, IngestStatus::Failed);

        // but a failed item can be re-submitted
        item.advance(IngestEvent::UploadStarted);
        assert_eq!(item.status, IngestStatus::Uploading);
        assert!(item.error.is_none());
        assert_eq!(item.progress, 0);
    }

    #[test]
    fn test_skipping_a_phase_is_ignored() {
        let mut item = item();
        item.advance(IngestEvent::SavingStarted);
        assert_eq!(item.status, IngestStatus::Queued);
    }

    #[test]
    fn test_pending_predicate() {
        assert!(IngestStatus::Queued.is_pending());
        assert!(IngestStatus::Failed.is_pending());
        assert!(!IngestStatus::Completed.is_pending());
        assert!(!IngestStatus::Uploading.is_pending());
    }
}
