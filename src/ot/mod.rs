//! OpenType layout.

use core::ops::{Index, IndexMut};

use crate::buffer::Buffer;
use crate::plan::ShapePlan;
use crate::set_digest::SetDigest;
use crate::tables::gsubgpos::{FeatureIndex, LangIndex, LookupIndex, ScriptIndex};
use crate::{Face, Tag};

mod apply;
mod contextual;
pub(crate) mod kern;
pub(crate) mod map;
mod matching;
pub(crate) mod position;
pub(crate) mod substitute;

pub(crate) use apply::{Apply, ApplyContext};
pub(crate) use map::{FeatureFlags, Map, MapBuilder};

/// How deep contextual lookups may recurse into each other.
pub const MAX_NESTING_LEVEL: usize = 6;
/// The longest input sequence a contextual or ligature rule may match.
pub const MAX_CONTEXT_LENGTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableIndex {
    GSUB = 0,
    GPOS = 1,
}

impl TableIndex {
    pub fn iter() -> impl Iterator<Item = TableIndex> {
        [Self::GSUB, Self::GPOS].iter().copied()
    }
}

impl<T> Index<TableIndex> for [T] {
    type Output = T;

    fn index(&self, table_index: TableIndex) -> &Self::Output {
        &self[table_index as usize]
    }
}

impl<T> IndexMut<TableIndex> for [T] {
    fn index_mut(&mut self, table_index: TableIndex) -> &mut Self::Output {
        &mut self[table_index as usize]
    }
}

/// A lookup-based layout table (GSUB or GPOS).
pub trait LayoutTable {
    /// The index of this table.
    const INDEX: TableIndex;

    /// Whether lookups in this table can be applied to the buffer in-place.
    const IN_PLACE: bool;

    /// The kind of lookup stored in this table.
    type Lookup: LayoutLookup;

    /// Get the lookup at the specified index.
    fn get_lookup(&self, index: LookupIndex) -> Option<&Self::Lookup>;
}

/// A lookup in a layout table.
pub trait LayoutLookup: Apply {
    /// The lookup's lookup_props.
    fn props(&self) -> u32;

    /// Whether the lookup has to be applied backwards.
    fn is_reverse(&self) -> bool;

    /// The digest of all glyphs the lookup can start at.
    fn digest(&self) -> &SetDigest;
}

/// Script and language selection on a raw GSUB/GPOS table.
pub trait LayoutTableExt {
    fn select_script(&self, script_tags: &[Tag]) -> Option<(bool, ScriptIndex, Tag)>;
    fn select_script_language(
        &self,
        script_index: ScriptIndex,
        lang_tags: &[Tag],
    ) -> Option<LangIndex>;
    fn get_required_language_feature(
        &self,
        script_index: ScriptIndex,
        lang_index: Option<LangIndex>,
    ) -> Option<(FeatureIndex, Tag)>;
    fn find_language_feature(
        &self,
        script_index: ScriptIndex,
        lang_index: Option<LangIndex>,
        feature_tag: Tag,
    ) -> Option<FeatureIndex>;
}

impl LayoutTableExt for crate::tables::gsubgpos::LayoutTable<'_> {
    /// Returns true + index and tag of the first found script tag
    /// or false + index and tag if falling back to a default script.
    fn select_script(&self, script_tags: &[Tag]) -> Option<(bool, ScriptIndex, Tag)> {
        for &tag in script_tags {
            if let Some(index) = self.find_script_index(tag) {
                return Some((true, index, tag));
            }
        }

        for tag in [
            Tag::from_bytes(b"DFLT"),
            // Many fonts use 'dflt' by mistake.
            Tag::from_bytes(b"dflt"),
            // Some old fonts put their features under 'latn' even
            // when they are meant for other scripts.
            Tag::from_bytes(b"latn"),
        ] {
            if let Some(index) = self.find_script_index(tag) {
                return Some((false, index, tag));
            }
        }

        None
    }

    fn select_script_language(
        &self,
        script_index: ScriptIndex,
        lang_tags: &[Tag],
    ) -> Option<LangIndex> {
        let script = self.get_script(script_index)?;

        for &tag in lang_tags {
            if let Some(index) = script.find_lang_index(tag) {
                return Some(index);
            }
        }

        script.find_lang_index(Tag::from_bytes(b"dflt"))
    }

    fn get_required_language_feature(
        &self,
        script_index: ScriptIndex,
        lang_index: Option<LangIndex>,
    ) -> Option<(FeatureIndex, Tag)> {
        let sys = self.get_lang_sys(script_index, lang_index)?;
        let index = sys.required_feature?;
        let tag = self.get_feature_tag(index)?;
        Some((index, tag))
    }

    fn find_language_feature(
        &self,
        script_index: ScriptIndex,
        lang_index: Option<LangIndex>,
        feature_tag: Tag,
    ) -> Option<FeatureIndex> {
        let sys = self.get_lang_sys(script_index, lang_index)?;
        sys.feature_indices
            .into_iter()
            .find(|&index| self.get_feature_tag(index) == Some(feature_tag))
    }
}

/// Applies the lookups of a GSUB or GPOS table stage by stage.
pub(crate) fn apply_layout_table<T: LayoutTable>(
    plan: &ShapePlan,
    face: &Face,
    buffer: &mut Buffer,
    table: Option<&T>,
) {
    let mut ctx = ApplyContext::new(T::INDEX, face, buffer);

    for (stage_index, stage) in plan.ot_map.stages(T::INDEX).iter().enumerate() {
        if let Some(table) = table {
            for lookup_map in plan.ot_map.stage_lookups(T::INDEX, stage_index) {
                let Some(lookup) = table.get_lookup(lookup_map.index) else {
                    continue;
                };

                if !lookup.digest().may_have(&ctx.digest) {
                    continue;
                }

                log::trace!("applying {:?} lookup {}", T::INDEX, lookup_map.index.0);

                ctx.lookup_index = lookup_map.index;
                ctx.set_lookup_mask(lookup_map.mask);
                ctx.auto_zwj = lookup_map.auto_zwj;
                ctx.auto_zwnj = lookup_map.auto_zwnj;
                ctx.random = lookup_map.random;
                ctx.per_syllable = lookup_map.per_syllable;

                apply_string::<T>(&mut ctx, lookup);
            }
        }

        if let Some(func) = stage.pause_func {
            if func(plan, face, ctx.buffer) {
                ctx.digest = ctx.buffer.digest();
            }
        }
    }
}

fn apply_string<T: LayoutTable>(ctx: &mut ApplyContext, lookup: &T::Lookup) {
    if ctx.buffer.is_empty() || ctx.lookup_mask() == 0 {
        return;
    }

    ctx.lookup_props = lookup.props();

    if !lookup.is_reverse() {
        // in/out forward substitution/positioning
        if !T::IN_PLACE {
            ctx.buffer.clear_output();
        }

        ctx.buffer.idx = 0;
        apply_forward(ctx, lookup);

        if !T::IN_PLACE {
            ctx.buffer.sync();
        }
    } else {
        // in-place backward substitution/positioning
        debug_assert!(!ctx.buffer.have_output);

        ctx.buffer.idx = ctx.buffer.len - 1;
        apply_backward(ctx, lookup);
    }
}

fn apply_forward(ctx: &mut ApplyContext, lookup: &impl Apply) -> bool {
    let mut ret = false;
    while ctx.buffer.idx < ctx.buffer.len && ctx.buffer.successful {
        let cur = ctx.buffer.cur(0);
        if (cur.mask & ctx.lookup_mask()) != 0
            && ctx.check_glyph_property(cur, ctx.lookup_props)
            && lookup.apply(ctx).is_some()
        {
            ret = true;
        } else {
            ctx.buffer.next_glyph();
        }
    }
    ret
}

fn apply_backward(ctx: &mut ApplyContext, lookup: &impl Apply) -> bool {
    let mut ret = false;
    loop {
        let cur = ctx.buffer.cur(0);
        ret |= (cur.mask & ctx.lookup_mask()) != 0
            && ctx.check_glyph_property(cur, ctx.lookup_props)
            && lookup.apply(ctx).is_some();

        if ctx.buffer.idx == 0 {
            break;
        }

        ctx.buffer.idx -= 1;
    }
    ret
}
