//! Undo/redo history (spec.md §4.7): a single linear entry vector with a
//! cursor, entity/layer/draw-order/selection snapshots, and a byte codec
//! for carrying the whole stack inside an ESNP `HIST` section.

pub mod codec;
pub mod entry;
pub mod manager;
pub mod snapshot;

pub use codec::{decode_bytes, encode_bytes, HISTORY_CODEC_VERSION};
pub use entry::{EntityChange, HistoryEntry};
pub use manager::HistoryManager;
pub use snapshot::{EntitySnapshot, PolylineSnapshot, TextSnapshot};
