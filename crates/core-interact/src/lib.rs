//! Interaction session (spec.md §4.6): transform gestures (Move/VertexDrag/
//! EdgeDrag/Resize) and draft shape creation, both built on top of the
//! lower-level geometry/snap/commit mechanics the other modules in this
//! crate provide. Undo/redo integration, snapping, the spatial index and
//! render buffer refresh all happen inside the session itself — a
//! `begin*`/`commit*` pair is a single user-visible gesture and a single
//! history entry, not something the caller has to stitch together.

pub mod commit;
pub mod draft;
pub mod log;
pub mod session;
pub mod snap;
pub mod snapshot;
pub mod transform;

pub use commit::{CommitOpcode, CommitResult};
pub use draft::{DraftState, DraftStyle, PreviewGeometry};
pub use log::{replay_transform_log, TransformLog, TransformLogEntry, TransformLogEntryType, ViewState, DEFAULT_ENTRY_CAPACITY, DEFAULT_ID_CAPACITY};
pub use session::{InteractionSession, SessionState};
pub use snap::SnapOptions;
pub use snapshot::{TransformGeometry, TransformSnapshot};
pub use transform::{ActiveTransform, EdgeContext, EdgeSide, HandleCorner, ResizeContext, TransformMode, VertexContext, MIN_SIZE};
