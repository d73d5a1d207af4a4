//! `TextStore`: owns every text entity's content, runs, and layout-facing
//! header fields (spec.md §3 "Text", §4.8 "Store").
//!
//! Text entities are not kept in `core-store`'s arenas — their content is
//! variable-length (a `String` plus a `Vec<TextRun>`), which does not fit a
//! fixed-size `ArenaRecord`. `TextStore` keeps its own dense arena instead,
//! swap-remove deleted the same way (spec.md §4.1's algorithm generalizes).

use std::collections::HashSet;

use core_types::{EntityId, LayerId};

use crate::flags::{StyleApplyMode, TextStyleFlags};
use crate::runs::{self, TextRun};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBoxMode {
    AutoWidth,
    FixedWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBounds {
    pub layout_width: f32,
    pub layout_height: f32,
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextCaretState {
    pub caret: u32,
    pub selection_anchor: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRec {
    pub id: EntityId,
    pub layer_id: LayerId,
    pub flags: core_store::EntityFlags,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub box_mode: TextBoxMode,
    pub align: TextAlign,
    pub constraint_width: f32,
    pub bounds: TextBounds,
    pub content: String,
    pub runs: Vec<TextRun>,
    pub caret: TextCaretState,
}

impl TextRec {
    pub fn content_len(&self) -> u32 {
        self.content.len() as u32
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextStore {
    texts: Vec<TextRec>,
    index: std::collections::HashMap<EntityId, usize>,
    dirty: HashSet<EntityId>,
}

impl TextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the header fields of a text entity. Content and
    /// runs are untouched by this call — they're mutated through
    /// `insert_content`/`delete_content`/`set_runs` — but a brand new text
    /// gets an empty content string and a single empty run.
    pub fn upsert_text(
        &mut self,
        id: EntityId,
        layer_id: LayerId,
        flags: core_store::EntityFlags,
        x: f32,
        y: f32,
        rotation: f32,
        box_mode: TextBoxMode,
        align: TextAlign,
        constraint_width: f32,
    ) -> usize {
        if let Some(&slot) = self.index.get(&id) {
            let rec = &mut self.texts[slot];
            rec.layer_id = layer_id;
            rec.flags = flags;
            rec.x = x;
            rec.y = y;
            rec.rotation = rotation;
            rec.box_mode = box_mode;
            rec.align = align;
            rec.constraint_width = constraint_width;
            self.mark_dirty(id);
            slot
        } else {
            let slot = self.texts.len();
            self.texts.push(TextRec {
                id,
                layer_id,
                flags,
                x,
                y,
                rotation,
                box_mode,
                align,
                constraint_width,
                bounds: TextBounds::default(),
                content: String::new(),
                runs: Vec::new(),
                caret: TextCaretState::default(),
            });
            self.index.insert(id, slot);
            self.mark_dirty(id);
            slot
        }
    }

    pub fn find(&self, id: EntityId) -> Option<&TextRec> {
        self.index.get(&id).map(|&slot| &self.texts[slot])
    }

    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut TextRec> {
        let slot = *self.index.get(&id)?;
        Some(&mut self.texts[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextRec> {
        self.texts.iter()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Swap-remove delete, mirroring `core-store`'s arena deletion
    /// (spec.md §4.1).
    pub fn delete(&mut self, id: EntityId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        let last = self.texts.len() - 1;
        if slot != last {
            let moved_id = self.texts[last].id;
            self.index.insert(moved_id, slot);
        }
        self.texts.swap_remove(slot);
        self.dirty.remove(&id);
        true
    }

    pub fn set_caret(&mut self, id: EntityId, caret: u32) {
        if let Some(rec) = self.find_mut(id) {
            rec.caret.caret = caret;
            rec.caret.selection_anchor = None;
        }
    }

    pub fn set_selection(&mut self, id: EntityId, anchor: u32, caret: u32) {
        if let Some(rec) = self.find_mut(id) {
            rec.caret.selection_anchor = Some(anchor);
            rec.caret.caret = caret;
        }
    }

    pub fn insert_content(&mut self, id: EntityId, at: u32, text: &str) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        let at_usize = at as usize;
        if at_usize > rec.content.len() || !rec.content.is_char_boundary(at_usize) {
            return false;
        }
        rec.content.insert_str(at_usize, text);
        runs::apply_insert(&mut rec.runs, at, text.len() as u32);
        self.mark_dirty(id);
        true
    }

    pub fn delete_content(&mut self, id: EntityId, lo: u32, hi: u32) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        let (lo_u, hi_u) = (lo as usize, hi as usize);
        if hi_u > rec.content.len() || lo_u > hi_u {
            return false;
        }
        if !rec.content.is_char_boundary(lo_u) || !rec.content.is_char_boundary(hi_u) {
            return false;
        }
        rec.content.replace_range(lo_u..hi_u, "");
        runs::apply_delete(&mut rec.runs, lo, hi);
        self.mark_dirty(id);
        true
    }

    pub fn replace_content(&mut self, id: EntityId, lo: u32, hi: u32, text: &str) -> bool {
        if !self.delete_content(id, lo, hi) {
            return false;
        }
        self.insert_content(id, lo, text)
    }

    pub fn set_runs(&mut self, id: EntityId, runs: Vec<TextRun>) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        rec.runs = runs;
        self.mark_dirty(id);
        true
    }

    pub fn set_text_align(&mut self, id: EntityId, align: TextAlign) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        rec.align = align;
        self.mark_dirty(id);
        true
    }

    pub fn set_constraint_width(&mut self, id: EntityId, width: f32) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        rec.constraint_width = width;
        self.mark_dirty(id);
        true
    }

    pub fn apply_text_style(
        &mut self,
        id: EntityId,
        lo: u32,
        hi: u32,
        mode: StyleApplyMode,
        flags_mask: TextStyleFlags,
        font_id: Option<u32>,
        font_size: Option<f32>,
    ) -> bool {
        let Some(rec) = self.find_mut(id) else {
            return false;
        };
        runs::apply_style(&mut rec.runs, lo, hi, mode, flags_mask, font_id, font_size);
        self.mark_dirty(id);
        true
    }

    pub fn write_bounds(&mut self, id: EntityId, bounds: TextBounds) {
        if let Some(rec) = self.find_mut(id) {
            rec.bounds = bounds;
        }
    }

    // --- layout dirty-set ------------------------------------------------

    pub fn mark_dirty(&mut self, id: EntityId) {
        self.dirty.insert(id);
    }

    pub fn is_dirty(&self, id: EntityId) -> bool {
        self.dirty.contains(&id)
    }

    pub fn clear_dirty(&mut self, id: EntityId) {
        self.dirty.remove(&id);
    }

    pub fn dirty_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.dirty.iter().copied()
    }

    pub fn clear(&mut self) {
        self.texts.clear();
        self.index.clear();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_store::EntityFlags;

    fn make_store() -> (TextStore, EntityId) {
        let mut store = TextStore::new();
        let id = EntityId(100);
        store.upsert_text(
            id,
            LayerId(1),
            EntityFlags::default(),
            0.0,
            0.0,
            0.0,
            TextBoxMode::AutoWidth,
            TextAlign::Left,
            0.0,
        );
        (store, id)
    }

    #[test]
    fn scenario_from_spec_section_8_case_5() {
        let (mut store, id) = make_store();
        store.insert_content(id, 0, "Hello");
        store.set_runs(
            id,
            vec![TextRun {
                start_index: 0,
                length: 5,
                font_id: 1,
                font_size: 12.0,
                color: core_types::Rgba::BLACK,
                flags: TextStyleFlags::BOLD,
            }],
        );
        store.apply_text_style(id, 1, 3, StyleApplyMode::Set, TextStyleFlags::ITALIC, None, None);
        let rec = store.find(id).unwrap();
        assert_eq!(rec.runs.len(), 3);
        assert_eq!(rec.runs[1].flags, TextStyleFlags::BOLD | TextStyleFlags::ITALIC);

        store.delete_content(id, 2, 4);
        let rec = store.find(id).unwrap();
        assert_eq!(rec.content, "Heo");
        assert_eq!(rec.runs.len(), 3);
        assert_eq!(rec.runs[0].length, 1);
        assert_eq!(rec.runs[1].length, 1);
        assert_eq!(rec.runs[2].length, 1);
    }

    #[test]
    fn delete_is_a_no_op_on_missing_id() {
        let mut store = TextStore::new();
        assert!(!store.delete(EntityId(999)));
    }

    #[test]
    fn swap_remove_delete_keeps_index_consistent() {
        let mut store = TextStore::new();
        for raw in [1, 2, 3] {
            store.upsert_text(
                EntityId(raw),
                LayerId(1),
                EntityFlags::default(),
                0.0,
                0.0,
                0.0,
                TextBoxMode::AutoWidth,
                TextAlign::Left,
                0.0,
            );
        }
        assert!(store.delete(EntityId(1)));
        assert!(store.find(EntityId(3)).is_some());
        assert_eq!(store.len(), 2);
    }
}
