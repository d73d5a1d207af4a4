//! Command buffer decoding and dispatch (spec.md §4.2, §6, §7): the closed
//! EWDC opcode set, per-opcode payload layouts, atomic buffer decoding, and
//! the dispatcher that applies a decoded buffer against the rest of the
//! engine's subsystems as one history transaction.

pub mod dispatch;
pub mod opcode;
pub mod payload;
pub mod wire;

pub use dispatch::{apply_command_buffer, DispatchContext, DispatchResult};
pub use opcode::Opcode;
pub use payload::Payload;
pub use wire::{decode_buffer, DecodedCommand};
