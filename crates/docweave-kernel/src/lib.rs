//! Index-consistent batch-mutation engine for rich-text documents.
//!
//! The remote document is addressed by absolute UTF-16 offsets that shift
//! with every edit. This crate plans edits so that a whole batch stays valid
//! when applied in order without re-reading, and re-reads at the points where
//! offsets cannot be known in advance (a freshly inserted table).
//!
//! # Pipeline
//!
//! ```text
//! Markdown ──parse_markdown──┐                ┌── execute_chunked ──▶ DocsApi
//!                            ├─▶ blocks/runs ─┤
//! live Document ─extract─────┘    builder     └── insert_images (best effort)
//!                                                     │
//!                         table fill ◀── re-read ◀────┘
//! ```
//!
//! # Modules
//!
//! |--------------|------------------------------------------------------|
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | `offsets`    | Running offset tracker                               |
//! | `markdown`   | Markdown → blocks, list items, pending table fill    |
//! | `copy`       | Live document → content groups                       |
//! | `builder`    | Blocks → ordered requests; descending group ordering |
//! | `table`      | Cell replacement, fill, header bolding, rows         |
//! | `batch`      | Chunked execution, per-image placement               |
//! | `pipeline`   | Multi-pass writes and content replay                 |
//! | `snapshot`   | Undo/redo checkpoints                                |
//! | `render`     | Document → Markdown                                  |
//! | `engine`     | [`DocEngine`] facade                                 |
//! | `memory`     | In-memory [`DocsApi`] backend                        |
//! | `google`     | Docs REST [`DocsApi`] backend                        |
//! |--------------|------------------------------------------------------|

pub mod api;
pub mod batch;
pub mod builder;
pub mod copy;
pub mod engine;
pub mod google;
pub mod markdown;
pub mod memory;
pub mod offsets;
pub mod pipeline;
pub mod render;
pub mod snapshot;
pub mod table;

pub use api::DocsApi;
pub use batch::{BatchConfig, ImageInsertFailure, ImageReport};
pub use engine::{DocEngine, EngineConfig, RestoreReport, TableEditReport, WriteMode};
pub use google::GoogleDocsApi;
pub use memory::MemoryDocs;
pub use pipeline::WriteReport;
pub use render::render_markdown;
pub use snapshot::{HistoryStack, SnapshotSummary};
pub use table::{CellEdit, CellImage};

pub use docweave_types::{DocError, Result};
