//! Shared document and operation types for docweave.
//!
//! This crate is the leaf of the workspace: the typed read model of a remote
//! document, the run/style intermediate representation, planned mutation
//! requests, and the error taxonomy. It does no I/O and has **no internal
//! docweave dependencies**.
//!
//! # Representations
//!
//! ```text
//! remote JSON ──wire──▶ Document (StructuralElement sum types)
//!                            │
//!            copy front end  ▼          Markdown front end
//!                     ParagraphBlock / TableModel (runs + images)
//!                            │
//!                 builder    ▼
//!                     Vec<Request> ──to_wire──▶ batchUpdate JSON
//! ```
//!
//! # Key Types
//!
//! |----------------------|--------------------------------------------|
//! | Type                 | Purpose                                    |
//! |----------------------|--------------------------------------------|
//! | [`Document`]         | Typed read of a remote document            |
//! | [`StructuralElement`]| Paragraph / Table / SectionBreak with range|
//! | [`Run`]              | Text sharing one sparse [`TextStyle`]      |
//! | [`ParagraphBlock`]   | One paragraph of runs plus images          |
//! | [`TableModel`]       | Rectangular grid of [`Cell`]s              |
//! | [`Request`]          | One planned mutation with absolute offsets |
//! | [`SnapshotId`]       | Undo/redo checkpoint identity              |
//! | [`DocError`]         | Error taxonomy                             |
//! |----------------------|--------------------------------------------|

pub mod document;
pub mod error;
pub mod ids;
pub mod ops;
pub mod style;
pub mod wire;

pub use document::{
    Bullet, Document, ElementKind, InlineObject, ListInfo, Paragraph, ParagraphElement,
    ParagraphElementKind, StructuralElement, Table, TableCell, TableRef, TableRow,
};
pub use error::{DocError, Result};
pub use ids::{SnapshotId, now_millis};
pub use ops::{BulletPreset, Request, batch_body};
pub use style::{
    Cell, ImageInfo, MONOSPACE_FAMILY, NamedStyle, ParagraphBlock, PositionedImage, Run,
    TableModel, TextStyle, push_run, utf16_len,
};
