use thiserror::Error;

/// The closed error code set the engine surfaces to a host.
///
/// Input-buffer errors (`InvalidMagic`, `UnsupportedVersion`,
/// `BufferTruncated`, `InvalidPayloadSize`) are atomic: the buffer that
/// produced them left no observable mutation behind. `UnknownCommand` and
/// `InvalidOperation` are per-command logical errors; the canonical
/// dispatcher policy is to halt the whole buffer on either (see
/// `core-commands`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic { expected: u32, found: u32 },

    #[error("unsupported version: expected {expected}, found {found}")]
    UnsupportedVersion { expected: u32, found: u32 },

    #[error("buffer truncated: needed at least {needed} bytes, had {available}")]
    BufferTruncated { needed: usize, available: usize },

    #[error("invalid payload size for section/command {tag}: {detail}")]
    InvalidPayloadSize { tag: String, detail: String },

    #[error("unknown opcode {0:#06x}")]
    UnknownCommand(u32),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
