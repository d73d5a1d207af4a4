//! The engine handshake (`ProtocolInfo`) a host calls once at startup to
//! confirm it is linked against a compatible engine build before trusting
//! any command buffer it sends.

use crate::hash::fnv1a;
use bitflags::bitflags;

pub const COMMAND_BUFFER_MAGIC: u32 = 0x4344_5745; // "EWDC"
pub const COMMAND_BUFFER_VERSION: u32 = 2;
pub const SNAPSHOT_MAGIC: u32 = 0x504E_5345; // "ESNP"
pub const SNAPSHOT_VERSION: u32 = 1;
pub const HISTORY_VERSION: u32 = 1;
pub const PROTOCOL_VERSION: u32 = 3;
pub const EVENT_STREAM_VERSION: u32 = 1;

bitflags! {
    /// One bit per optional capability this build actually implements, so a
    /// host can probe support without parsing a version number (SPEC_FULL.md
    /// §11: feature flags carry real capability bits, not a placeholder).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureFlags: u32 {
        const TRANSFORM_LOG_REPLAY = 1 << 0;
        const INCREMENTAL_RENDER_REFRESH = 1 << 1;
        const DOCUMENT_DIGEST = 1 << 2;
    }
}

/// Descriptor strings enumerating every wire struct's field order and every
/// enum's variant tags, in the exact order the codecs walk them. These are
/// the literal input to `abi_hash`; changing field order, width, or enum
/// variant order here (and in the corresponding codec) is a wire break by
/// construction, which is the point — the hash exists to catch exactly that
/// drift between a host build and an engine build.
const ENTITY_KIND_DESCRIPTOR: &str =
    "EntityKind{Rect=0,Line=1,Polyline=2,Circle=3,Polygon=4,Arrow=5,Text=6}";

const RECT_DESCRIPTOR: &str =
    "Rect{x:f32,y:f32,w:f32,h:f32,fill:rgba,stroke:rgba,strokeEnabled:f32,strokeWidthPx:f32}";
const LINE_DESCRIPTOR: &str = "Line{x0:f32,y0:f32,x1:f32,y1:f32,rgba:rgba,enabled:f32,strokeWidthPx:f32}";
const POLYLINE_DESCRIPTOR: &str =
    "Polyline{offset:u32,count:u32,rgba:rgba,enabled:f32,strokeWidthPx:f32}";
const CIRCLE_DESCRIPTOR: &str =
    "Circle{cx:f32,cy:f32,rx:f32,ry:f32,rot:f32,sx:f32,sy:f32,fill:rgba,stroke:rgba,strokeFlags:f32}";
const POLYGON_DESCRIPTOR: &str = "Polygon{cx:f32,cy:f32,rx:f32,ry:f32,rot:f32,sx:f32,sy:f32,fill:rgba,stroke:rgba,strokeFlags:f32,sides:u32}";
const ARROW_DESCRIPTOR: &str = "Arrow{ax:f32,ay:f32,bx:f32,by:f32,head:f32,rgba:rgba,strokeWidthPx:f32}";
const TEXT_DESCRIPTOR: &str = "Text{x:f32,y:f32,rot:f32,boxMode:u8,align:u8,constraintWidth:f32,layoutWidth:f32,layoutHeight:f32,minX:f32,minY:f32,maxX:f32,maxY:f32,content:str,runs:Vec<Run>}";
const RUN_DESCRIPTOR: &str = "Run{startIndex:u32,length:u32,fontId:u32,fontSize:f32,colorRGBA:rgba,flags:u8}";

const COMMAND_HEADER_DESCRIPTOR: &str = "CommandHeader{magic:u32,version:u32,commandCount:u32}";
const COMMAND_RECORD_DESCRIPTOR: &str =
    "CommandRecord{op:u32,id:u32,payloadBytes:u32,reserved:u32}";
const SNAPSHOT_HEADER_DESCRIPTOR: &str =
    "SnapshotHeader{magic:u32,version:u32,sectionCount:u32,reserved:u32}";
const SECTION_ENTRY_DESCRIPTOR: &str = "SectionEntry{tag:u32,offset:u32,size:u32,crc32:u32}";

/// Returns the complete ordered list of descriptor fragments folded into
/// `abi_hash`. Exposed so tests (and a host's own compatibility probe) can
/// confirm the hash really is sensitive to every layout fragment it claims
/// to cover.
pub fn abi_descriptor_fragments() -> &'static [&'static str] {
    &[
        ENTITY_KIND_DESCRIPTOR,
        RECT_DESCRIPTOR,
        LINE_DESCRIPTOR,
        POLYLINE_DESCRIPTOR,
        CIRCLE_DESCRIPTOR,
        POLYGON_DESCRIPTOR,
        ARROW_DESCRIPTOR,
        TEXT_DESCRIPTOR,
        RUN_DESCRIPTOR,
        COMMAND_HEADER_DESCRIPTOR,
        COMMAND_RECORD_DESCRIPTOR,
        SNAPSHOT_HEADER_DESCRIPTOR,
        SECTION_ENTRY_DESCRIPTOR,
    ]
}

/// Computes the compile-time-stable FNV-1a hash over every wire layout
/// descriptor. `const fn` is not reachable here because `fnv1a` walks a
/// slice of `&str` at runtime, but the inputs are all `'static` literals, so
/// the result is identical on every call within one build — "compile-time"
/// in the sense spec.md means it (fixed by the source, not by document
/// state), not literally evaluated by the compiler.
pub fn abi_hash() -> u64 {
    let mut joined = String::new();
    for fragment in abi_descriptor_fragments() {
        joined.push_str(fragment);
        joined.push('\0');
    }
    fnv1a(joined.as_bytes())
}

/// The handshake a host calls once to confirm ABI compatibility before
/// trusting any command buffer (spec.md §6 "Engine handshake").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub protocol_version: u32,
    pub command_version: u32,
    pub snapshot_version: u32,
    pub event_stream_version: u32,
    pub abi_hash: u64,
    pub feature_flags: FeatureFlags,
}

impl ProtocolInfo {
    pub fn current() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            command_version: COMMAND_BUFFER_VERSION,
            snapshot_version: SNAPSHOT_VERSION,
            event_stream_version: EVENT_STREAM_VERSION,
            abi_hash: abi_hash(),
            feature_flags: FeatureFlags::TRANSFORM_LOG_REPLAY
                | FeatureFlags::INCREMENTAL_RENDER_REFRESH
                | FeatureFlags::DOCUMENT_DIGEST,
        }
    }
}
