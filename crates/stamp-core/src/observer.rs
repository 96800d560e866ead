//! Signing telemetry
//!
//! The engine reports what it does through a [`SigningObserver`] it owns,
//! rather than a process-wide logger. Production code uses
//! [`TracingObserver`]; tests can install a [`MemoryObserver`] and assert on
//! the recorded events.

use std::sync::Mutex;

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    DecodeImage,
    Geometry,
    InsertImage,
    Serialize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Open => "open",
            Stage::DecodeImage => "decode_image",
            Stage::Geometry => "geometry",
            Stage::InsertImage => "insert_image",
            Stage::Serialize => "serialize",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SigningEvent {
    Started {
        source: String,
        image: String,
    },
    Opened {
        page_count: usize,
    },
    PageSigned {
        page_index: usize,
        page_count: usize,
    },
    Completed {
        output_bytes: usize,
    },
    Failed {
        stage: Stage,
        page_index: Option<usize>,
        cause: String,
    },
    /// A transient artifact could not be removed. Never fatal.
    CleanupWarning {
        detail: String,
    },
}

pub trait SigningObserver: Send + Sync {
    fn on_event(&self, event: &SigningEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SigningObserver for TracingObserver {
    fn on_event(&self, event: &SigningEvent) {
        match event {
            SigningEvent::Started { source, image } => {
                tracing::info!(%source, %image, "Starting PDF signing");
            }
            SigningEvent::Opened { page_count } => {
                tracing::info!(page_count, "Opened PDF");
            }
            SigningEvent::PageSigned {
                page_index,
                page_count,
            } => {
                tracing::debug!(page = page_index + 1, page_count, "Signed page");
            }
            SigningEvent::Completed { output_bytes } => {
                tracing::info!(output_bytes, "PDF signing completed");
            }
            SigningEvent::Failed {
                stage,
                page_index,
                cause,
            } => {
                tracing::error!(
                    stage = stage.as_str(),
                    page_index = ?page_index,
                    %cause,
                    "PDF signing failed"
                );
            }
            SigningEvent::CleanupWarning { detail } => {
                tracing::warn!(%detail, "Failed to clean up transient file");
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<SigningEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SigningEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<SigningEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, SigningEvent::Failed { .. }))
            .collect()
    }
}

impl SigningObserver for MemoryObserver {
    fn on_event(&self, event: &SigningEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_observer_records_in_order() {
        let observer = MemoryObserver::new();
        observer.on_event(&SigningEvent::Opened { page_count: 2 });
        observer.on_event(&SigningEvent::Completed { output_bytes: 10 });
        assert_eq!(
            observer.events(),
            vec![
                SigningEvent::Opened { page_count: 2 },
                SigningEvent::Completed { output_bytes: 10 },
            ]
        );
        assert!(observer.failures().is_empty());
    }

    #[test]
    fn test_tracing_observer_accepts_all_events() {
        let observer = TracingObserver;
        observer.on_event(&SigningEvent::Failed {
            stage: Stage::InsertImage,
            page_index: Some(1),
            cause: "boom".into(),
        });
        observer.on_event(&SigningEvent::CleanupWarning {
            detail: "left behind".into(),
        });
    }
}
