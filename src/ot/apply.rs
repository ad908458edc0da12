use ttf_parser::GlyphId;

use super::{LayoutLookup, LayoutTable, TableIndex, MAX_NESTING_LEVEL};
use crate::buffer::{Buffer, GlyphInfo, GlyphPropsFlags};
use crate::set_digest::SetDigest;
use crate::tables::gsubgpos::{LookupFlags, LookupIndex};
use crate::{Face, Mask};

/// Apply a lookup.
pub trait Apply {
    /// Apply the lookup at the current buffer position.
    ///
    /// Returns `None` when the lookup did not apply.
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()>;
}

pub struct ApplyContext<'a, 'b> {
    pub table_index: TableIndex,
    pub face: &'a Face<'b>,
    pub buffer: &'a mut Buffer,
    lookup_mask: Mask,
    pub per_syllable: bool,
    pub lookup_index: LookupIndex,
    pub lookup_props: u32,
    pub nesting_level_left: usize,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
    pub random: bool,
    pub random_state: u32,
    pub last_base: i32,
    pub last_base_until: u32,
    pub digest: SetDigest,
}

impl<'a, 'b> ApplyContext<'a, 'b> {
    pub fn new(table_index: TableIndex, face: &'a Face<'b>, buffer: &'a mut Buffer) -> Self {
        let digest = buffer.digest();
        ApplyContext {
            table_index,
            face,
            buffer,
            lookup_mask: 1,
            per_syllable: false,
            lookup_index: LookupIndex(u16::MAX),
            lookup_props: 0,
            nesting_level_left: MAX_NESTING_LEVEL,
            auto_zwnj: true,
            auto_zwj: true,
            random: false,
            random_state: 1,
            last_base: -1,
            last_base_until: 0,
            digest,
        }
    }

    /// A `minstd_rand` step.
    pub fn random_number(&mut self) -> u32 {
        self.random_state = self.random_state.wrapping_mul(48271) % 2147483647;
        self.random_state
    }

    pub fn set_lookup_mask(&mut self, mask: Mask) {
        self.lookup_mask = mask;
        self.last_base = -1;
        self.last_base_until = 0;
    }

    #[inline]
    pub fn lookup_mask(&self) -> Mask {
        self.lookup_mask
    }

    /// Applies another lookup of the same table at the current position.
    ///
    /// Fails once the nesting depth or the buffer's operation budget
    /// is exhausted.
    pub fn recurse(&mut self, sub_lookup_index: LookupIndex) -> bool {
        if self.nesting_level_left == 0 {
            log::trace!("lookup nesting is too deep");
            return false;
        }

        self.buffer.max_ops -= 1;
        if self.buffer.max_ops < 0 {
            return false;
        }

        self.nesting_level_left -= 1;
        let saved_props = self.lookup_props;
        let saved_index = self.lookup_index;
        self.lookup_index = sub_lookup_index;

        let face = self.face;
        let applied = match self.table_index {
            TableIndex::GSUB => face
                .gsub
                .as_ref()
                .and_then(|table| table.get_lookup(sub_lookup_index))
                .and_then(|lookup| self.apply_nested(lookup)),
            TableIndex::GPOS => face
                .gpos
                .as_ref()
                .and_then(|table| table.get_lookup(sub_lookup_index))
                .and_then(|lookup| self.apply_nested(lookup)),
        };

        self.lookup_props = saved_props;
        self.lookup_index = saved_index;
        self.nesting_level_left += 1;
        applied.is_some()
    }

    fn apply_nested(&mut self, lookup: &impl LayoutLookup) -> Option<()> {
        self.lookup_props = lookup.props();
        lookup.apply(self)
    }

    /// Checks that a glyph is not ignored by the given lookup props.
    pub fn check_glyph_property(&self, info: &GlyphInfo, match_props: u32) -> bool {
        let glyph_props = info.glyph_props();

        // Lookup flags are the lower 16 bits of match props.
        let lookup_flags = match_props as u16;

        // Not covered if, for example, the glyph is a ligature and
        // the lookup ignores ligatures.
        if glyph_props & lookup_flags & LookupFlags::IGNORE_FLAGS.bits() != 0 {
            return false;
        }

        if glyph_props & GlyphPropsFlags::MARK.bits() != 0 {
            // With mark filtering sets, the high 16 bits
            // of match props hold the set index.
            if lookup_flags & LookupFlags::USE_MARK_FILTERING_SET.bits() != 0 {
                let set_index = (match_props >> 16) as u16;
                return self.face.is_mark_glyph(info.as_glyph(), set_index);
            }

            // The high byte of the flags is a mark attachment type.
            // Marks of any other type are ignored.
            let attachment_type = LookupFlags::MARK_ATTACHMENT_TYPE.bits();
            if lookup_flags & attachment_type != 0 {
                return (lookup_flags & attachment_type) == (glyph_props & attachment_type);
            }
        }

        true
    }

    fn set_glyph_class(
        &mut self,
        glyph_id: GlyphId,
        class_guess: GlyphPropsFlags,
        ligature: bool,
        component: bool,
    ) {
        self.digest.add(glyph_id);

        let has_glyph_classes = self.face.has_glyph_classes();
        let gdef_props = self.face.glyph_props(glyph_id);

        let cur = self.buffer.cur_mut(0);
        let mut props = cur.glyph_props();

        props |= GlyphPropsFlags::SUBSTITUTED.bits();

        if ligature {
            props |= GlyphPropsFlags::LIGATED.bits();
            // Ligating after a multiple substitution forgives the
            // multiplication, so only the last of the two is kept.
            props &= !GlyphPropsFlags::MULTIPLIED.bits();
        }

        if component {
            props |= GlyphPropsFlags::MULTIPLIED.bits();
        }

        if has_glyph_classes {
            props &= GlyphPropsFlags::PRESERVE.bits();
            cur.set_glyph_props(props | gdef_props);
        } else if !class_guess.is_empty() {
            props &= GlyphPropsFlags::PRESERVE.bits();
            cur.set_glyph_props(props | class_guess.bits());
        } else {
            cur.set_glyph_props(props);
        }
    }

    pub fn replace_glyph(&mut self, glyph_id: GlyphId) {
        self.set_glyph_class(glyph_id, GlyphPropsFlags::empty(), false, false);
        self.buffer.replace_glyph(u32::from(glyph_id.0));
    }

    pub fn replace_glyph_inplace(&mut self, glyph_id: GlyphId) {
        self.set_glyph_class(glyph_id, GlyphPropsFlags::empty(), false, false);
        self.buffer.cur_mut(0).glyph_id = u32::from(glyph_id.0);
    }

    pub fn replace_glyph_with_ligature(&mut self, glyph_id: GlyphId, class_guess: GlyphPropsFlags) {
        self.set_glyph_class(glyph_id, class_guess, true, false);
        self.buffer.replace_glyph(u32::from(glyph_id.0));
    }

    pub fn output_glyph_for_component(&mut self, glyph_id: GlyphId, class_guess: GlyphPropsFlags) {
        self.set_glyph_class(glyph_id, class_guess, false, true);
        self.buffer.output_glyph(u32::from(glyph_id.0));
    }
}
