//! Progress events emitted to observers, in phase order per file.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPhase {
    Enumerate,
    Parse,
    GraphUpsert,
    Embed,
    VectorUpsert,
    Finalize,
}

impl Display for SyncPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SyncPhase::Enumerate => "enumerate",
            SyncPhase::Parse => "parse",
            SyncPhase::GraphUpsert => "graph-upsert",
            SyncPhase::Embed => "embed",
            SyncPhase::VectorUpsert => "vector-upsert",
            SyncPhase::Finalize => "finalize",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: SyncPhase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Observer callback; cloned into the embedder task.
pub type ProgressHandler = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cooperative cancellation checked at phase boundaries. In-flight network
/// calls finish; no new ones start.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_serialize_to_spec_strings() {
        let json = |p: SyncPhase| serde_json::to_string(&p).unwrap();
        assert_eq!(json(SyncPhase::Enumerate), "\"enumerate\"");
        assert_eq!(json(SyncPhase::GraphUpsert), "\"graph-upsert\"");
        assert_eq!(json(SyncPhase::VectorUpsert), "\"vector-upsert\"");
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
