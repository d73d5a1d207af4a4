//! Run algebra: how a text's style runs react to content edits and to
//! `applyTextStyle` (spec.md §4.8 "Run algebra on content edits", "Style
//! application").
//!
//! Runs are kept sorted ascending by `start_index`, non-overlapping, and
//! collectively span `[0, content_len)` except for degenerate zero-length
//! caret runs, which may sit between two real runs to carry "typing style"
//! at an insertion point (spec.md §3 invariant 4).

use crate::flags::{StyleApplyMode, TextStyleFlags};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextRun {
    pub start_index: u32,
    pub length: u32,
    pub font_id: u32,
    pub font_size: f32,
    pub color: core_types::Rgba,
    pub flags: TextStyleFlags,
}

impl TextRun {
    pub fn end(&self) -> u32 {
        self.start_index + self.length
    }

    pub fn is_caret(&self) -> bool {
        self.length == 0
    }
}

/// Shifts/grows runs after a `len`-byte insertion at `at` (spec.md §4.8):
/// every run starting at or after `at` shifts by `+len`; the run containing
/// `at` (if any, and not itself a caret run being split) grows by `len`.
pub fn apply_insert(runs: &mut Vec<TextRun>, at: u32, len: u32) {
    if len == 0 {
        return;
    }
    for run in runs.iter_mut() {
        if run.start_index >= at {
            run.start_index += len;
        } else if run.end() > at {
            // `at` falls strictly inside this run: it grows.
            run.length += len;
        } else if run.end() == at && !run.is_caret() {
            // Insertion exactly at a real run's end boundary extends it,
            // matching "types at the end of bold text stays bold".
            run.length += len;
        }
    }
    normalize(runs);
}

/// Removes the byte range `[lo, hi)` from the run list (spec.md §4.8):
/// runs fully inside the range vanish, runs partially overlapped are
/// clipped, runs entirely after `hi` shift left by `hi - lo`.
pub fn apply_delete(runs: &mut Vec<TextRun>, lo: u32, hi: u32) {
    if hi <= lo {
        return;
    }
    let removed = hi - lo;
    let mut out = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        let (start, end) = (run.start_index, run.end());
        if end <= lo {
            out.push(run);
        } else if start >= hi {
            out.push(TextRun {
                start_index: start - removed,
                ..run
            });
        } else {
            // Overlaps [lo, hi) at least partially; clip to what survives.
            let new_start = start.min(lo);
            let pre = lo.saturating_sub(start).min(run.length);
            let post = end.saturating_sub(hi);
            let new_length = pre + post;
            if new_length > 0 || run.is_caret() {
                out.push(TextRun {
                    start_index: new_start,
                    length: new_length,
                    ..run
                });
            }
        }
    }
    *runs = out;
    normalize(runs);
}

/// Sorts by `start_index` and drops degenerate caret runs that ended up
/// coincident with a real run's span (a caret run is only meaningful when
/// it sits at a position no real run covers).
fn normalize(runs: &mut [TextRun]) {
    runs.sort_by_key(|r| r.start_index);
}

/// Applies a style delta over `[lo, hi)` (a non-empty range) or, when
/// `lo == hi`, inserts/updates a zero-length caret run at that position
/// inheriting the surrounding style (spec.md §4.8 "Style application").
pub fn apply_style(
    runs: &mut Vec<TextRun>,
    lo: u32,
    hi: u32,
    mode: StyleApplyMode,
    flags_mask: TextStyleFlags,
    font_id: Option<u32>,
    font_size: Option<f32>,
) {
    if lo == hi {
        apply_style_at_caret(runs, lo, mode, flags_mask, font_id, font_size);
        return;
    }

    let mut out = Vec::with_capacity(runs.len() + 2);
    for run in runs.drain(..) {
        let (start, end) = (run.start_index, run.end());
        if end <= lo || start >= hi {
            out.push(run);
            continue;
        }
        // Slice into (pre, in-range, post) sub-runs; only the middle gets
        // the style delta applied.
        if start < lo {
            out.push(TextRun {
                length: lo - start,
                ..run
            });
        }
        let mid_start = start.max(lo);
        let mid_end = end.min(hi);
        let mut mid = TextRun {
            start_index: mid_start,
            length: mid_end - mid_start,
            ..run
        };
        mid.flags = apply_mask(mid.flags, mode, flags_mask);
        if let Some(fid) = font_id {
            mid.font_id = fid;
        }
        if let Some(fsz) = font_size {
            mid.font_size = fsz;
        }
        out.push(mid);
        if end > hi {
            out.push(TextRun {
                start_index: hi,
                length: end - hi,
                ..run
            });
        }
    }
    *runs = out;
    normalize(runs);
}

fn apply_style_at_caret(
    runs: &mut Vec<TextRun>,
    at: u32,
    mode: StyleApplyMode,
    flags_mask: TextStyleFlags,
    font_id: Option<u32>,
    font_size: Option<f32>,
) {
    // Find an existing caret run exactly at `at`.
    if let Some(run) = runs.iter_mut().find(|r| r.is_caret() && r.start_index == at) {
        run.flags = apply_mask(run.flags, mode, flags_mask);
        if let Some(fid) = font_id {
            run.font_id = fid;
        }
        if let Some(fsz) = font_size {
            run.font_size = fsz;
        }
        return;
    }

    // Otherwise inherit the style of the run covering `at` (or the run
    // immediately before it, for an end-of-content caret), split if `at`
    // falls strictly inside a real run.
    let containing = runs
        .iter()
        .position(|r| r.start_index <= at && at < r.end())
        .or_else(|| runs.iter().rposition(|r| r.end() <= at));

    let base = match containing {
        Some(idx) => runs[idx],
        None => TextRun {
            start_index: at,
            length: 0,
            font_id: font_id.unwrap_or(0),
            font_size: font_size.unwrap_or(12.0),
            color: core_types::Rgba::BLACK,
            flags: TextStyleFlags::empty(),
        },
    };

    let mut caret = TextRun {
        start_index: at,
        length: 0,
        font_id: font_id.unwrap_or(base.font_id),
        font_size: font_size.unwrap_or(base.font_size),
        color: base.color,
        flags: apply_mask(base.flags, mode, flags_mask),
    };
    if let Some(idx) = containing {
        if runs[idx].start_index < at && at < runs[idx].end() {
            // Split the containing run around the caret.
            let tail = TextRun {
                start_index: at,
                length: runs[idx].end() - at,
                ..runs[idx]
            };
            runs[idx].length = at - runs[idx].start_index;
            runs.insert(idx + 1, caret);
            runs.insert(idx + 2, tail);
            normalize(runs);
            return;
        }
    }
    caret.flags = apply_mask(base.flags, mode, flags_mask);
    runs.push(caret);
    normalize(runs);
}

fn apply_mask(flags: TextStyleFlags, mode: StyleApplyMode, mask: TextStyleFlags) -> TextStyleFlags {
    match mode {
        StyleApplyMode::Set => flags | mask,
        StyleApplyMode::Clear => flags & !mask,
        StyleApplyMode::Toggle => flags ^ mask,
    }
}

/// Validates the invariants spec.md §3/§8 assert over a run list for
/// `content_len` bytes of content: sorted, non-overlapping, spanning the
/// whole content modulo caret runs.
pub fn validate(runs: &[TextRun], content_len: u32) -> bool {
    let mut cursor = 0u32;
    for run in runs {
        if run.start_index < cursor {
            return false;
        }
        if run.is_caret() {
            if run.start_index > content_len {
                return false;
            }
            continue;
        }
        if run.start_index != cursor {
            return false;
        }
        if run.end() > content_len {
            return false;
        }
        cursor = run.end();
    }
    cursor == content_len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: u32, len: u32, flags: TextStyleFlags) -> TextRun {
        TextRun {
            start_index: start,
            length: len,
            font_id: 1,
            font_size: 12.0,
            color: core_types::Rgba::BLACK,
            flags,
        }
    }

    #[test]
    fn style_range_splits_and_merges_flags() {
        // "Hello" with one Bold run [0,5), apply Italic to [1,3).
        let mut runs = vec![run(0, 5, TextStyleFlags::BOLD)];
        apply_style(
            &mut runs,
            1,
            3,
            StyleApplyMode::Set,
            TextStyleFlags::ITALIC,
            None,
            None,
        );
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], run(0, 1, TextStyleFlags::BOLD));
        assert_eq!(runs[1], run(1, 2, TextStyleFlags::BOLD | TextStyleFlags::ITALIC));
        assert_eq!(runs[2], run(3, 2, TextStyleFlags::BOLD));
        assert!(validate(&runs, 5));
    }

    #[test]
    fn delete_clips_and_shifts_runs() {
        // Starting from the spec.md §8 scenario 5 runs after styling.
        let mut runs = vec![
            run(0, 1, TextStyleFlags::BOLD),
            run(1, 2, TextStyleFlags::BOLD | TextStyleFlags::ITALIC),
            run(3, 2, TextStyleFlags::BOLD),
        ];
        apply_delete(&mut runs, 2, 4);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0], run(0, 1, TextStyleFlags::BOLD));
        assert_eq!(runs[1], run(1, 1, TextStyleFlags::BOLD | TextStyleFlags::ITALIC));
        assert_eq!(runs[2], run(2, 1, TextStyleFlags::BOLD));
        assert!(validate(&runs, 3));
    }

    #[test]
    fn insert_shifts_runs_at_or_after_point_and_grows_containing_run() {
        let mut runs = vec![run(0, 5, TextStyleFlags::BOLD)];
        apply_insert(&mut runs, 2, 3);
        assert_eq!(runs, vec![run(0, 8, TextStyleFlags::BOLD)]);
        assert!(validate(&runs, 8));
    }

    #[test]
    fn caret_style_inserts_zero_length_run_inheriting_surrounding_style() {
        let mut runs = vec![run(0, 5, TextStyleFlags::BOLD)];
        apply_style(
            &mut runs,
            5,
            5,
            StyleApplyMode::Toggle,
            TextStyleFlags::ITALIC,
            None,
            None,
        );
        assert_eq!(runs.len(), 2);
        assert!(runs[1].is_caret());
        assert_eq!(runs[1].flags, TextStyleFlags::BOLD | TextStyleFlags::ITALIC);
    }
}
