//! Shared leaf types for the document engine workspace: the byte cursor
//! pair backing every binary codec, CRC32/FNV-1a hashing, entity/layer id
//! types, shared geometry/color POD, and the engine handshake. Every other
//! `core-*` crate depends on this one; it depends on nothing in the
//! workspace.

pub mod bytes;
pub mod error;
pub mod geom;
pub mod hash;
pub mod ids;
pub mod protocol;

pub use bytes::{ByteReader, ByteWriter};
pub use error::{EngineError, EngineResult};
pub use geom::{Aabb, Rgba};
pub use hash::{crc32, fnv1a, Fnv1a};
pub use ids::{EntityId, EntityKind, IdAllocator, LayerId};
pub use protocol::{FeatureFlags, ProtocolInfo};
