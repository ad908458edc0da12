//! Glyph substitution (GSUB) lookups.

use ttf_parser::GlyphId;

use super::apply::{Apply, ApplyContext};
use super::matching::{ligate_input, match_backtrack, match_input, match_lookahead};
use super::{LayoutLookup, LayoutTable, Map, TableIndex, MAX_NESTING_LEVEL};
use crate::buffer::{Buffer, GlyphPropsFlags};
use crate::plan::ShapePlan;
use crate::set_digest::SetDigest;
use crate::tables::gsub::*;
use crate::tables::gsubgpos::LookupIndex;
use crate::Face;

/// Prepares glyph props before the first GSUB stage.
pub(crate) fn substitute_start(face: &Face, buffer: &mut Buffer) {
    for info in &mut buffer.info[..buffer.len] {
        info.set_glyph_props(face.glyph_props(info.as_glyph()));
        info.set_lig_props(0);
        info.set_syllable(0);
    }
}

pub(crate) fn substitute(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    super::apply_layout_table(plan, face, buffer, face.gsub.as_ref());
}

impl<'a> LayoutTable for SubstitutionTable<'a> {
    const INDEX: TableIndex = TableIndex::GSUB;
    const IN_PLACE: bool = false;

    type Lookup = SubstLookup<'a>;

    fn get_lookup(&self, index: LookupIndex) -> Option<&Self::Lookup> {
        self.lookups.get(usize::from(index.0))
    }
}

impl LayoutLookup for SubstLookup<'_> {
    fn props(&self) -> u32 {
        self.props
    }

    fn is_reverse(&self) -> bool {
        self.reverse
    }

    fn digest(&self) -> &SetDigest {
        &self.digest
    }
}

impl Apply for SubstLookup<'_> {
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

impl Apply for SubstLookupSubtable<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        match self {
            Self::Single(t) => t.apply(ctx),
            Self::Multiple(t) => t.apply(ctx),
            Self::Alternate(t) => t.apply(ctx),
            Self::Ligature(t) => t.apply(ctx),
            Self::Context(t) => t.apply(ctx),
            Self::ChainContext(t) => t.apply(ctx),
            Self::ReverseChainSingle(t) => t.apply(ctx),
        }
    }
}

impl Apply for SingleSubstitution<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        let subst = match *self {
            Self::Format1 { coverage, delta } => {
                coverage.get(glyph)?;
                // The result is defined modulo 65536.
                GlyphId((i32::from(glyph.0) + i32::from(delta)) as u16)
            }
            Self::Format2 {
                coverage,
                substitutes,
            } => {
                let index = coverage.get(glyph)?;
                substitutes.get(index)?
            }
        };

        ctx.replace_glyph(subst);
        Some(())
    }
}

impl Apply for MultipleSubstitution<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        let index = self.coverage.get(glyph)?;
        let seq = self.sequences.get(index)?;
        seq.apply(ctx)
    }
}

impl Apply for Sequence<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        match self.substitutes.len() {
            // An empty sequence deletes the glyph.
            0 => ctx.buffer.delete_glyph(),

            // A single substitute is a plain replacement, not a multiplication.
            1 => ctx.replace_glyph(self.substitutes.get(0)?),

            _ => {
                let class = if ctx.buffer.cur(0).is_ligature() {
                    GlyphPropsFlags::BASE_GLYPH
                } else {
                    GlyphPropsFlags::empty()
                };

                // Glyphs that are already part of a ligature keep their ligature props.
                let lig_id = ctx.buffer.cur(0).lig_id();

                for (i, subst) in self.substitutes.into_iter().enumerate() {
                    if lig_id == 0 {
                        // The component index is stored in 4 bits.
                        ctx.buffer.cur_mut(0).set_lig_props_for_component(i as u8);
                    }
                    ctx.output_glyph_for_component(subst, class);
                }

                ctx.buffer.skip_glyph();
            }
        }

        Some(())
    }
}

impl Apply for AlternateSubstitution<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        let index = self.coverage.get(glyph)?;
        let set = self.alternate_sets.get(index)?;
        set.apply(ctx)
    }
}

impl Apply for AlternateSet<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let len = self.alternates.len();
        if len == 0 {
            return None;
        }

        let glyph_mask = ctx.buffer.cur(0).mask;
        let lookup_mask = ctx.lookup_mask();

        // Breaks if two features with different values enable the same lookup.
        let shift = lookup_mask.trailing_zeros();
        let mut alt_index = (lookup_mask & glyph_mask) >> shift;

        // The maximum value picks a random alternate when requested.
        if alt_index == Map::MAX_VALUE && ctx.random {
            // The random state changes for the whole run, so none of it can be reshaped alone.
            ctx.buffer.unsafe_to_break(Some(0), Some(ctx.buffer.len));
            alt_index = ctx.random_number() % u32::from(len) + 1;
        }

        let idx = u16::try_from(alt_index).ok()?.checked_sub(1)?;
        ctx.replace_glyph(self.alternates.get(idx)?);

        Some(())
    }
}

impl Apply for LigatureSubstitution<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        let index = self.coverage.get(glyph)?;
        let set = self.ligature_sets.get(index)?;
        set.apply(ctx)
    }
}

impl Apply for LigatureSet<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        // The first ligature that matches wins.
        for lig in self.ligatures.iter() {
            if lig.apply(ctx).is_some() {
                return Some(());
            }
        }

        None
    }
}

impl Apply for Ligature<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        // A ligature of one glyph is a plain replacement.
        if self.components.is_empty() {
            ctx.replace_glyph(self.glyph);
            return Some(());
        }

        let components = self.components;
        let match_func = |glyph: GlyphId, index: u16| components.get(index) == Some(glyph);

        let matched = match match_input(ctx, components.len(), &match_func) {
            Ok(matched) => matched,
            Err(unsafe_to) => {
                ctx.buffer
                    .unsafe_to_concat(Some(ctx.buffer.idx), Some(unsafe_to));
                return None;
            }
        };

        let count = usize::from(components.len()) + 1;
        ligate_input(
            ctx,
            count,
            &matched.positions,
            matched.end,
            matched.total_component_count,
            self.glyph,
        );

        Some(())
    }
}

impl Apply for ReverseChainSingleSubstitution<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        // Cannot be nested in a contextual lookup.
        if ctx.nesting_level_left != MAX_NESTING_LEVEL {
            return None;
        }

        let glyph = ctx.buffer.cur(0).as_glyph();
        let index = self.coverage.get(glyph)?;
        let subst = self.substitutes.get(index)?;

        let backtrack = self.backtrack_coverages;
        let lookahead = self.lookahead_coverages;
        let back_func = |glyph: GlyphId, index: u16| {
            backtrack
                .get(index)
                .map_or(false, |coverage| coverage.contains(glyph))
        };
        let ahead_func = |glyph: GlyphId, index: u16| {
            lookahead
                .get(index)
                .map_or(false, |coverage| coverage.contains(glyph))
        };

        let start_index = match match_backtrack(ctx, backtrack.len(), &back_func) {
            Ok(start_index) => start_index,
            Err(unsafe_from) => {
                ctx.buffer
                    .unsafe_to_concat_from_outbuffer(Some(unsafe_from), Some(ctx.buffer.idx + 1));
                return None;
            }
        };

        let end_index = match match_lookahead(ctx, lookahead.len(), &ahead_func, ctx.buffer.idx + 1)
        {
            Ok(end_index) => end_index,
            Err(unsafe_to) => {
                ctx.buffer
                    .unsafe_to_concat_from_outbuffer(Some(start_index), Some(unsafe_to));
                return None;
            }
        };

        ctx.buffer
            .unsafe_to_break_from_outbuffer(Some(start_index), Some(end_index));
        // The index is not decremented here, the backward loop does it.
        ctx.replace_glyph_inplace(subst);

        Some(())
    }
}
