//! Lifecycle notifications emitted by the extraction service.

use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::{info, warn};

/// Something that happened inside the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtractionEvent {
    DataExtracted {
        document_type: String,
        confidence: f32,
        fields_extracted: usize,
        processing_time_ms: u64,
    },
    ExtractionFailed {
        document_type: String,
        error: String,
    },
    TemplateAdded {
        document_type: String,
    },
    TemplateUpdated {
        document_type: String,
    },
    BatchCompleted {
        total_documents: usize,
        average_confidence: f32,
    },
}

/// Receives service events. Implementations must not block.
pub trait ExtractionObserver: Send + Sync {
    fn on_event(&self, event: &ExtractionEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ExtractionObserver for TracingObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::DataExtracted {
                document_type,
                confidence,
                fields_extracted,
                processing_time_ms,
            } => info!(
                document_type = %document_type,
                confidence = *confidence,
                fields = *fields_extracted,
                elapsed_ms = *processing_time_ms,
                "Data extracted"
            ),
            ExtractionEvent::ExtractionFailed { document_type, error } => {
                warn!(document_type = %document_type, error = %error, "Extraction failed")
            }
            ExtractionEvent::TemplateAdded { document_type } => {
                info!(document_type = %document_type, "Template added")
            }
            ExtractionEvent::TemplateUpdated { document_type } => {
                info!(document_type = %document_type, "Template updated")
            }
            ExtractionEvent::BatchCompleted {
                total_documents,
                average_confidence,
            } => info!(
                documents = *total_documents,
                average_confidence = *average_confidence,
                "Batch completed"
            ),
        }
    }
}

/// Forwards events to an unbounded channel. A closed receiver drops events.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<ExtractionEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ExtractionEvent>) -> Self {
        Self { sender }
    }
}

impl ExtractionObserver for ChannelObserver {
    fn on_event(&self, event: &ExtractionEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn test_channel_observer_forwards() {
        let (tx, rx) = mpsc::channel();
        let observer = ChannelObserver::new(tx);

        let event = ExtractionEvent::TemplateAdded {
            document_type: "discharge_summary".to_string(),
        };
        observer.on_event(&event);
        assert_eq!(rx.try_recv().unwrap(), event);

        drop(rx);
        observer.on_event(&event);
    }

    #[test]
    fn test_event_serialization() {
        let event = ExtractionEvent::BatchCompleted {
            total_documents: 2,
            average_confidence: 0.5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "batch_completed");
        assert_eq!(json["total_documents"], 2);
    }
}
