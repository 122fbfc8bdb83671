//! Sync engine: full and incremental indexing of a working copy into the
//! graph and vector stores, with persisted sync state, progress events, and
//! cooperative cancellation.

mod embed_text;
mod engine;
mod errors;
mod progress;
mod scan;
mod state;

pub use embed_text::{chunk_embed_text, docstring_embed_text};
pub use engine::{SyncEngine, SyncOptions};
pub use errors::{Result, SyncError};
pub use progress::{CancelToken, ProgressEvent, ProgressHandler, SyncPhase};
pub use scan::{ScannedFile, enumerate_files, repo_relative};
pub use state::{SyncFailure, SyncState, load_sync_state, save_sync_state};
