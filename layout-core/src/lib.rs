//! # Layout Core
//!
//! Document state engine for a UI-layout editor: an immutable document
//! model, a validating reducer over a closed set of edits, snapshot
//! undo/redo, and z-order planning for widgets and groups.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              DocumentHandle                 │
//! ├─────────────────────────────────────────────┤
//! │  Ordering Engine │  DocumentStore           │
//! │  - Layer moves   │  - Undo / redo stacks    │
//! │  - Tree drops    │  - Coalesced edits       │
//! ├─────────────────────────────────────────────┤
//! │  Reducer         │  Scene Validator         │
//! │  - Actions       │  - Schema version        │
//! │  - Id allocator  │  - Property schemas      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use layout_core::{DocumentHandle, PropertyBag, Rect, WidgetType};
//!
//! let mut handle = DocumentHandle::default();
//! let id = handle
//!     .add_widget(WidgetType::Knob, Rect::new(0.0, 0.0, 48.0, 48.0), PropertyBag::new())
//!     .unwrap();
//! assert!(handle.document().widget(id).is_some());
//! assert!(handle.undo());
//! assert!(handle.document().widgets.is_empty());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod error;
pub mod handle;
pub mod ids;
pub mod model;
pub mod ordering;
pub mod props;
pub mod reducer;
pub mod schema;
pub mod store;
pub mod tree;
pub mod validate;

pub use action::{Action, BoundsUpdate, FRONT_MOST};
pub use config::{EngineConfig, DEFAULT_HISTORY_LIMIT};
pub use error::{LayoutError, LayoutResult};
pub use handle::DocumentHandle;
pub use ids::IdAllocator;
pub use model::{
    AssetModel, DocumentModel, EditorStateModel, GroupModel, LayerModel, NodeKind, NodeRef,
    PropertyBinding, Rect, RuntimeBinding, RuntimeParam, SchemaVersion, WidgetId, WidgetModel,
    WidgetType,
};
pub use ordering::{DropPlacement, DropTarget, LayerMove, TreeDrop};
pub use props::{BuiltinSchema, PropertyBag, PropertySchema, PropertyValue, ValueKind};
pub use reducer::{Reducer, Reduction};
pub use schema::DocumentFile;
pub use store::{DocumentStore, Snapshot};

/// Layout core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
