//! Glyph positioning.

use super::matching::{Match, SkippyIter};
use super::{Apply, ApplyContext, LayoutLookup, LayoutTable, TableIndex, MAX_NESTING_LEVEL};
use crate::buffer::{Buffer, BufferScratchFlags, GlyphPosition};
use crate::plan::ShapePlan;
use crate::set_digest::SetDigest;
use crate::tables::gpos::*;
use crate::tables::gsubgpos::{Device, LookupFlags, LookupIndex};
use crate::{Direction, Face};

pub mod attach_type {
    pub const MARK: u8 = 1;
    pub const CURSIVE: u8 = 2;
}

/// Resets the attachment state of every glyph.
pub fn position_start(_: &Face, buffer: &mut Buffer) {
    let len = buffer.len;
    for pos in &mut buffer.pos[..len] {
        pos.set_attach_chain(0);
        pos.set_attach_type(0);
    }
}

pub fn position(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    super::apply_layout_table(plan, face, buffer, face.gpos.as_ref());
}

/// Resolves attachment chains into absolute offsets.
pub fn position_finish_offsets(_: &Face, buffer: &mut Buffer) {
    if !buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT)
    {
        return;
    }

    let len = buffer.len;
    let direction = buffer.direction;
    for i in 0..len {
        propagate_attachment_offsets(&mut buffer.pos, len, i, direction, MAX_NESTING_LEVEL);
    }
}

fn propagate_attachment_offsets(
    pos: &mut [GlyphPosition],
    len: usize,
    i: usize,
    direction: Direction,
    nesting_level: usize,
) {
    // Adjusts offsets of attached glyphs (both cursive and mark) to accumulate
    // offset of glyph they are attached to.
    let chain = pos[i].attach_chain();
    let kind = pos[i].attach_type();
    if chain == 0 {
        return;
    }

    // Cleared before recursing, so a malformed cycle ends here.
    pos[i].set_attach_chain(0);

    let Some(j) = i.checked_add_signed(isize::from(chain)) else {
        return;
    };

    if j >= len {
        return;
    }

    // Right-to-left cursive chains point forward and can span the whole run.
    if nesting_level == 0 {
        return;
    }

    propagate_attachment_offsets(pos, len, j, direction, nesting_level - 1);

    match kind {
        attach_type::MARK => {
            pos[i].x_offset += pos[j].x_offset;
            pos[i].y_offset += pos[j].y_offset;

            if j >= i {
                return;
            }

            if direction.is_forward() {
                for k in j..i {
                    pos[i].x_offset -= pos[k].x_advance;
                    pos[i].y_offset -= pos[k].y_advance;
                }
            } else {
                for k in j + 1..i + 1 {
                    pos[i].x_offset += pos[k].x_advance;
                    pos[i].y_offset += pos[k].y_advance;
                }
            }
        }
        attach_type::CURSIVE => {
            if direction.is_horizontal() {
                pos[i].y_offset += pos[j].y_offset;
            } else {
                pos[i].x_offset += pos[j].x_offset;
            }
        }
        _ => {}
    }
}

impl<'a> LayoutTable for PositioningTable<'a> {
    const INDEX: TableIndex = TableIndex::GPOS;
    const IN_PLACE: bool = true;

    type Lookup = PosLookup<'a>;

    fn get_lookup(&self, index: LookupIndex) -> Option<&Self::Lookup> {
        self.lookups.get(usize::from(index.0))
    }
}

impl LayoutLookup for PosLookup<'_> {
    fn props(&self) -> u32 {
        self.props
    }

    fn is_reverse(&self) -> bool {
        false
    }

    fn digest(&self) -> &SetDigest {
        &self.digest
    }
}

impl Apply for PosLookup<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        if self.digest.may_have_glyph(ctx.buffer.cur(0).as_glyph()) {
            for subtable in &self.subtables {
                if subtable.apply(ctx).is_some() {
                    return Some(());
                }
            }
        }

        None
    }
}

impl Apply for PosLookupSubtable<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        match self {
            Self::Single(t) => t.apply(ctx),
            Self::Pair(t) => t.apply(ctx),
            Self::Cursive(t) => t.apply(ctx),
            Self::MarkToBase(t) => t.apply(ctx),
            Self::MarkToLigature(t) => t.apply(ctx),
            Self::MarkToMark(t) => t.apply(ctx),
            Self::Context(t) => t.apply(ctx),
            Self::ChainContext(t) => t.apply(ctx),
        }
    }
}

trait DeviceExt {
    fn get_x_delta(&self, face: &Face) -> Option<i32>;
    fn get_y_delta(&self, face: &Face) -> Option<i32>;
}

impl DeviceExt for Device<'_> {
    fn get_x_delta(&self, face: &Face) -> Option<i32> {
        match self {
            Device::Hinting(hinting) => {
                let (ppem, _) = face.pixels_per_em()?;
                hinting.get_delta(ppem, face.units_per_em)
            }
            Device::Variation(variation) => {
                face.variation_delta(variation.outer_index, variation.inner_index)
            }
        }
    }

    fn get_y_delta(&self, face: &Face) -> Option<i32> {
        match self {
            Device::Hinting(hinting) => {
                let (_, ppem) = face.pixels_per_em()?;
                hinting.get_delta(ppem, face.units_per_em)
            }
            Device::Variation(variation) => {
                face.variation_delta(variation.outer_index, variation.inner_index)
            }
        }
    }
}

/// Whether device tables are consulted on each axis.
fn use_devices(face: &Face) -> (bool, bool) {
    let (ppem_x, ppem_y) = face.pixels_per_em().unwrap_or((0, 0));
    let variable = !face.variation_coordinates().is_empty();
    (ppem_x != 0 || variable, ppem_y != 0 || variable)
}

trait ValueRecordExt {
    fn apply(&self, ctx: &mut ApplyContext, idx: usize) -> bool;
    fn apply_to_pos(&self, ctx: &ApplyContext, pos: &mut GlyphPosition) -> bool;
}

impl ValueRecordExt for ValueRecord<'_> {
    fn apply(&self, ctx: &mut ApplyContext, idx: usize) -> bool {
        let mut pos = ctx.buffer.pos[idx];
        let worked = self.apply_to_pos(ctx, &mut pos);
        ctx.buffer.pos[idx] = pos;
        worked
    }

    fn apply_to_pos(&self, ctx: &ApplyContext, pos: &mut GlyphPosition) -> bool {
        let horizontal = ctx.buffer.direction.is_horizontal();
        let mut worked = false;

        if self.x_placement != 0 {
            pos.x_offset += i32::from(self.x_placement);
            worked = true;
        }

        if self.y_placement != 0 {
            pos.y_offset += i32::from(self.y_placement);
            worked = true;
        }

        if self.x_advance != 0 && horizontal {
            pos.x_advance += i32::from(self.x_advance);
            worked = true;
        }

        // y_advance grows downward, unlike every other GPOS value.
        if self.y_advance != 0 && !horizontal {
            pos.y_advance -= i32::from(self.y_advance);
            worked = true;
        }

        let (use_x_device, use_y_device) = use_devices(ctx.face);

        if use_x_device {
            if let Some(device) = self.x_placement_device {
                pos.x_offset += device.get_x_delta(ctx.face).unwrap_or(0);
                worked = true;
            }
        }

        if use_y_device {
            if let Some(device) = self.y_placement_device {
                pos.y_offset += device.get_y_delta(ctx.face).unwrap_or(0);
                worked = true;
            }
        }

        if horizontal && use_x_device {
            if let Some(device) = self.x_advance_device {
                pos.x_advance += device.get_x_delta(ctx.face).unwrap_or(0);
                worked = true;
            }
        }

        if !horizontal && use_y_device {
            if let Some(device) = self.y_advance_device {
                pos.y_advance -= device.get_y_delta(ctx.face).unwrap_or(0);
                worked = true;
            }
        }

        worked
    }
}

trait AnchorExt {
    fn get(&self, face: &Face) -> (i32, i32);
}

impl AnchorExt for Anchor<'_> {
    fn get(&self, face: &Face) -> (i32, i32) {
        let mut x = i32::from(self.x);
        let mut y = i32::from(self.y);

        if self.x_device.is_some() || self.y_device.is_some() {
            let (use_x_device, use_y_device) = use_devices(face);

            if let Some(device) = self.x_device.filter(|_| use_x_device) {
                x += device.get_x_delta(face).unwrap_or(0);
            }

            if let Some(device) = self.y_device.filter(|_| use_y_device) {
                y += device.get_y_delta(face).unwrap_or(0);
            }
        }

        (x, y)
    }
}

impl Apply for SingleAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        let index = self.coverage().get(glyph)?;
        let record = self.value(index)?;
        let idx = ctx.buffer.idx;
        record.apply(ctx, idx);
        ctx.buffer.idx += 1;
        Some(())
    }
}

impl Apply for PairAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let first_glyph = ctx.buffer.cur(0).as_glyph();
        let first_glyph_coverage_index = self.coverage().get(first_glyph)?;

        let mut unsafe_to = 0;
        let second_glyph_index = {
            let mut iter = SkippyIter::new(ctx, ctx.buffer.idx, false);
            if !iter.next(Some(&mut unsafe_to)) {
                None
            } else {
                Some(iter.index())
            }
        };

        let Some(second_glyph_index) = second_glyph_index else {
            ctx.buffer
                .unsafe_to_concat(Some(ctx.buffer.idx), Some(unsafe_to));
            return None;
        };

        let second_glyph = ctx.buffer.info[second_glyph_index].as_glyph();

        let (records, has_record2) = match self {
            Self::Format1 { sets, .. } => {
                let set = sets.get(first_glyph_coverage_index)?;
                (set.get(second_glyph), set.has_second_value())
            }
            Self::Format2 {
                classes, matrix, ..
            } => {
                let classes = (classes.0.get(first_glyph), classes.1.get(second_glyph));
                (matrix.get(classes), matrix.has_second_value())
            }
        };

        let Some((record1, record2)) = records else {
            ctx.buffer
                .unsafe_to_concat(Some(ctx.buffer.idx), Some(second_glyph_index + 1));
            return None;
        };

        let flag1 = record1.apply(ctx, ctx.buffer.idx);
        let flag2 = record2.apply(ctx, second_glyph_index);

        if flag1 || flag2 {
            ctx.buffer
                .unsafe_to_break(Some(ctx.buffer.idx), Some(second_glyph_index + 1));
        } else {
            ctx.buffer
                .unsafe_to_concat(Some(ctx.buffer.idx), Some(second_glyph_index + 1));
        }

        // When the second glyph has its own record it is consumed too.
        ctx.buffer.idx = second_glyph_index;
        if has_record2 {
            ctx.buffer.idx += 1;
        }

        Some(())
    }
}

impl Apply for CursiveAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let this = ctx.buffer.cur(0).as_glyph();

        let index_this = self.coverage.get(this)?;
        let entry_this = self.entry(index_this)?;

        let mut unsafe_from = 0;
        let prev_index = {
            let mut iter = SkippyIter::new(ctx, ctx.buffer.idx, false);
            if iter.prev(Some(&mut unsafe_from)) {
                Some(iter.index())
            } else {
                None
            }
        };

        let Some(i) = prev_index else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(unsafe_from), Some(ctx.buffer.idx + 1));
            return None;
        };

        let prev = ctx.buffer.info[i].as_glyph();
        let index_prev = self.coverage.get(prev)?;
        let Some(exit_prev) = self.exit(index_prev) else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(i), Some(ctx.buffer.idx + 1));
            return None;
        };

        let (exit_x, exit_y) = exit_prev.get(ctx.face);
        let (entry_x, entry_y) = entry_this.get(ctx.face);

        let direction = ctx.buffer.direction;
        let j = ctx.buffer.idx;
        ctx.buffer.unsafe_to_break(Some(i), Some(j + 1));

        let pos = &mut ctx.buffer.pos;
        match direction {
            Direction::LeftToRight => {
                pos[i].x_advance = exit_x + pos[i].x_offset;
                let d = entry_x + pos[j].x_offset;
                pos[j].x_advance -= d;
                pos[j].x_offset -= d;
            }
            Direction::RightToLeft => {
                let d = exit_x + pos[i].x_offset;
                pos[i].x_advance -= d;
                pos[i].x_offset -= d;
                pos[j].x_advance = entry_x + pos[j].x_offset;
            }
            Direction::TopToBottom => {
                pos[i].y_advance = exit_y + pos[i].y_offset;
                let d = entry_y + pos[j].y_offset;
                pos[j].y_advance -= d;
                pos[j].y_offset -= d;
            }
            Direction::BottomToTop => {
                let d = exit_y + pos[i].y_offset;
                pos[i].y_advance -= d;
                pos[i].y_offset -= d;
                pos[j].y_advance = entry_y;
            }
            Direction::Invalid => {}
        }

        // Cross-direction adjustment. The child aligns itself against its
        // parent, the root of the tree stays on the baseline.
        let mut child = i;
        let mut parent = j;
        let mut x_offset = entry_x - exit_x;
        let mut y_offset = entry_y - exit_y;

        // Low bits are lookup flags.
        if ctx.lookup_props as u16 & LookupFlags::RIGHT_TO_LEFT.bits() == 0 {
            core::mem::swap(&mut child, &mut parent);
            x_offset = -x_offset;
            y_offset = -y_offset;
        }

        // If the child was already attached, flip its old chain so the whole
        // tree now hangs off the new parent.
        reverse_cursive_minor_offset(pos, child, direction, parent);

        pos[child].set_attach_type(attach_type::CURSIVE);
        pos[child].set_attach_chain((parent as isize - child as isize) as i16);

        if direction.is_horizontal() {
            pos[child].y_offset = y_offset;
        } else {
            pos[child].x_offset = x_offset;
        }

        // A parent attached to its own child is detached.
        if pos[parent].attach_chain() == -pos[child].attach_chain() {
            pos[parent].set_attach_chain(0);
        }

        ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
        ctx.buffer.idx += 1;
        Some(())
    }
}

fn reverse_cursive_minor_offset(
    pos: &mut [GlyphPosition],
    i: usize,
    direction: Direction,
    new_parent: usize,
) {
    let chain = pos[i].attach_chain();
    let attach_type = pos[i].attach_type();
    if chain == 0 || attach_type & attach_type::CURSIVE == 0 {
        return;
    }

    pos[i].set_attach_chain(0);

    let Some(j) = i.checked_add_signed(isize::from(chain)) else {
        return;
    };

    // Stop if we see the new parent in the chain.
    if j == new_parent || j >= pos.len() {
        return;
    }

    reverse_cursive_minor_offset(pos, j, direction, new_parent);

    if direction.is_horizontal() {
        pos[j].y_offset = -pos[i].y_offset;
    } else {
        pos[j].x_offset = -pos[i].x_offset;
    }

    pos[j].set_attach_chain(-chain);
    pos[j].set_attach_type(attach_type);
}

trait MarkArrayExt {
    fn apply(
        &self,
        ctx: &mut ApplyContext,
        anchors: AnchorMatrix,
        mark_index: u16,
        glyph_index: u16,
        glyph_pos: usize,
    ) -> Option<()>;
}

impl MarkArrayExt for MarkArray<'_> {
    fn apply(
        &self,
        ctx: &mut ApplyContext,
        anchors: AnchorMatrix,
        mark_index: u16,
        glyph_index: u16,
        glyph_pos: usize,
    ) -> Option<()> {
        // Without an anchor for this base and class, later subtables
        // get a chance at the mark.
        let (mark_class, mark_anchor) = self.get(mark_index)?;
        let base_anchor = anchors.get(glyph_index, mark_class)?;

        let (mark_x, mark_y) = mark_anchor.get(ctx.face);
        let (base_x, base_y) = base_anchor.get(ctx.face);

        ctx.buffer
            .unsafe_to_break(Some(glyph_pos), Some(ctx.buffer.idx + 1));

        let idx = ctx.buffer.idx;
        let pos = ctx.buffer.cur_pos_mut();
        pos.x_offset = base_x - mark_x;
        pos.y_offset = base_y - mark_y;
        pos.set_attach_type(attach_type::MARK);
        pos.set_attach_chain((glyph_pos as isize - idx as isize) as i16);

        ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
        ctx.buffer.idx += 1;

        Some(())
    }
}

impl Apply for MarkToBaseAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark_glyph = ctx.buffer.cur(0).as_glyph();
        let mark_index = self.mark_coverage.get(mark_glyph)?;
        let idx = ctx.buffer.idx;

        if ctx.last_base_until > idx as u32 {
            ctx.last_base_until = 0;
            ctx.last_base = -1;
        }

        // Search backwards for a non-mark glyph. Only the part of the buffer
        // not scanned by a previous mark is visited.
        let found = {
            let mut iter = SkippyIter::new(ctx, 0, false);
            iter.set_lookup_props(u32::from(LookupFlags::IGNORE_MARKS.bits()));

            let mut found = None;
            let mut j = idx;
            while j > ctx.last_base_until as usize {
                let mut matched = iter.match_(&ctx.buffer.info[j - 1]);
                if matched == Match::Match && !accept(ctx.buffer, j - 1) {
                    matched = Match::Skip;
                }

                if matched == Match::Match {
                    found = Some(j - 1);
                    break;
                }

                j -= 1;
            }

            found
        };

        if let Some(base) = found {
            ctx.last_base = base as i32;
        }
        ctx.last_base_until = idx as u32;

        if ctx.last_base == -1 {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(0), Some(idx + 1));
            return None;
        }

        // Checking that the found glyph is a base by GDEF is too strong.
        let base = ctx.last_base as usize;
        let base_glyph = ctx.buffer.info[base].as_glyph();
        let Some(base_index) = self.base_coverage.get(base_glyph) else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(base), Some(idx + 1));
            return None;
        };

        self.marks
            .apply(ctx, self.anchors, mark_index, base_index, base)
    }
}

/// Only the first glyph of a multiple substitution sequence takes marks,
/// unless a mark sits inside the sequence.
fn accept(buffer: &Buffer, idx: usize) -> bool {
    let info = &buffer.info[idx];
    !info.is_multiplied()
        || info.lig_comp() == 0
        || idx == 0
        || buffer.info[idx - 1].is_mark()
        || !buffer.info[idx - 1].is_multiplied()
        || info.lig_id() != buffer.info[idx - 1].lig_id()
        || info.lig_comp() != buffer.info[idx - 1].lig_comp() + 1
}

impl Apply for MarkToLigatureAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark_glyph = ctx.buffer.cur(0).as_glyph();
        let mark_index = self.mark_coverage.get(mark_glyph)?;

        // Search backwards for a non-mark glyph.
        let mut unsafe_from = 0;
        let found = {
            let mut iter = SkippyIter::new(ctx, ctx.buffer.idx, false);
            iter.set_lookup_props(u32::from(LookupFlags::IGNORE_MARKS.bits()));
            if iter.prev(Some(&mut unsafe_from)) {
                Some(iter.index())
            } else {
                None
            }
        };

        let Some(lig_pos) = found else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(unsafe_from), Some(ctx.buffer.idx + 1));
            return None;
        };

        let lig_glyph = ctx.buffer.info[lig_pos].as_glyph();
        let Some(lig_index) = self.ligature_coverage.get(lig_glyph) else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(lig_pos), Some(ctx.buffer.idx + 1));
            return None;
        };
        let lig_attach = self.ligature_array.get(lig_index)?;

        let comp_count = lig_attach.rows;
        if comp_count == 0 {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(lig_pos), Some(ctx.buffer.idx + 1));
            return None;
        }

        // A mark that shares the ligature id of the ligature attaches to the
        // component it came from. Any other mark goes to the last component.
        let lig_id = ctx.buffer.info[lig_pos].lig_id();
        let mark_id = ctx.buffer.cur(0).lig_id();
        let mark_comp = u16::from(ctx.buffer.cur(0).lig_comp());
        let matches = lig_id != 0 && lig_id == mark_id && mark_comp > 0;
        let comp_index = if matches {
            mark_comp.min(comp_count)
        } else {
            comp_count
        } - 1;

        self.marks
            .apply(ctx, lig_attach, mark_index, comp_index, lig_pos)
    }
}

impl Apply for MarkToMarkAdjustment<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let mark1_glyph = ctx.buffer.cur(0).as_glyph();
        let mark1_index = self.mark1_coverage.get(mark1_glyph)?;

        // Search backwards for a suitable mark, stopping at a non-mark glyph.
        let mut unsafe_from = 0;
        let found = {
            let mut iter = SkippyIter::new(ctx, ctx.buffer.idx, false);
            iter.set_lookup_props(ctx.lookup_props & !u32::from(LookupFlags::IGNORE_FLAGS.bits()));
            if iter.prev(Some(&mut unsafe_from)) {
                Some(iter.index())
            } else {
                None
            }
        };

        let Some(mark2_pos) = found else {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(unsafe_from), Some(ctx.buffer.idx + 1));
            return None;
        };

        if !ctx.buffer.info[mark2_pos].is_mark() {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(mark2_pos), Some(ctx.buffer.idx + 1));
            return None;
        }

        let id1 = ctx.buffer.cur(0).lig_id();
        let id2 = ctx.buffer.info[mark2_pos].lig_id();
        let comp1 = ctx.buffer.cur(0).lig_comp();
        let comp2 = ctx.buffer.info[mark2_pos].lig_comp();

        let matches = if id1 == id2 {
            // Marks of the same base or of the same ligature component.
            id1 == 0 || comp1 == comp2
        } else {
            // One of the marks may itself be a ligature.
            (id1 > 0 && comp1 == 0) || (id2 > 0 && comp2 == 0)
        };

        if !matches {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(mark2_pos), Some(ctx.buffer.idx + 1));
            return None;
        }

        let mark2_glyph = ctx.buffer.info[mark2_pos].as_glyph();
        let mark2_index = self.mark2_coverage.get(mark2_glyph)?;

        self.marks
            .apply(ctx, self.mark2_matrix, mark1_index, mark2_index, mark2_pos)
    }
}
