//! Matching of glyph patterns.

use smallvec::SmallVec;
use ttf_parser::GlyphId;

use super::{ApplyContext, TableIndex, MAX_CONTEXT_LENGTH};
use crate::buffer::{GlyphInfo, GlyphPropsFlags};
use crate::parser::LazyOffsetArray16;
use crate::tables::gsubgpos::{ClassDef, Coverage};
use crate::unicode::GeneralCategory;
use crate::Mask;

/// Matches a buffer glyph against the rule value at an input index.
pub type MatchFunc<'a> = dyn Fn(GlyphId, u16) -> bool + 'a;

pub type MatchPositions = SmallVec<[usize; 4]>;

/// Value represents a glyph id.
pub fn match_glyph(glyph: GlyphId, value: u16) -> bool {
    glyph == GlyphId(value)
}

/// Value represents a glyph class.
pub fn match_class<'a>(class_def: ClassDef<'a>) -> impl Fn(GlyphId, u16) -> bool + 'a {
    move |glyph, value| class_def.get(glyph) == value
}

/// Value is an index into a coverage list, offset by `skip` entries.
pub fn match_coverage<'a>(
    coverages: LazyOffsetArray16<'a, Coverage<'a>>,
    skip: u16,
) -> impl Fn(GlyphId, u16) -> bool + 'a {
    move |glyph, index| {
        index
            .checked_add(skip)
            .and_then(|index| coverages.get(index))
            .map_or(false, |coverage| coverage.contains(glyph))
    }
}

/// The result of [`match_input`].
pub struct MatchedInput {
    /// The buffer index right after the last matched glyph.
    pub end: usize,
    /// The buffer indices of every matched glyph, including the first.
    pub positions: MatchPositions,
    /// The sum of ligature components over all matched glyphs.
    pub total_component_count: u8,
}

/// Matches `input_len` glyphs after the current one.
///
/// On failure returns the index up to which the buffer must be
/// marked unsafe to concat.
pub fn match_input(
    ctx: &ApplyContext,
    input_len: u16,
    match_func: &MatchFunc,
) -> Result<MatchedInput, usize> {
    // - If all components of a ligature are marks, it is a mark ligature.
    //
    // - Ligatures cannot be formed across glyphs attached to different components
    //   of previous ligatures. E.g. in LAM,SHADDA,LAM,FATHA,HEH where LAM,LAM,HEH
    //   form a ligature, SHADDA,FATHA end up next to each other but must not ligate.
    //   Two exceptions apply:
    //
    //   o A ligature may ligate with marks that belong to itself.
    //
    //   o Two marks may ligate when they belong to different components of
    //     the same ligature glyph and that ligature is ignored by the lookup.

    #[derive(PartialEq)]
    enum Ligbase {
        NotChecked,
        MayNotSkip,
        MaySkip,
    }

    let count = usize::from(input_len) + 1;
    if count > MAX_CONTEXT_LENGTH {
        return Err(ctx.buffer.idx + 1);
    }

    let mut positions = MatchPositions::from_elem(0, count);
    positions[0] = ctx.buffer.idx;

    let mut iter = SkippyIter::new(ctx, ctx.buffer.idx, false);
    iter.enable_matching(match_func);

    let first = ctx.buffer.cur(0);
    let first_lig_id = first.lig_id();
    let first_lig_comp = first.lig_comp();
    let mut total_component_count = first.lig_num_comps();
    let mut ligbase = Ligbase::NotChecked;

    for position in &mut positions[1..count] {
        let mut unsafe_to = 0;
        if !iter.next(Some(&mut unsafe_to)) {
            return Err(unsafe_to);
        }

        *position = iter.index();

        let this = &ctx.buffer.info[iter.index()];
        let this_lig_id = this.lig_id();
        let this_lig_comp = this.lig_comp();

        if first_lig_id != 0 && first_lig_comp != 0 {
            // The first glyph is attached to a component of a previous ligature,
            // so all the following ones must be attached to the same component...
            if first_lig_id != this_lig_id || first_lig_comp != this_lig_comp {
                // ...unless that ligature is ignorable.
                if ligbase == Ligbase::NotChecked {
                    let out = ctx.buffer.out_info();
                    let mut j = ctx.buffer.out_len;
                    let mut found = false;
                    while j > 0 && out[j - 1].lig_id() == first_lig_id {
                        j -= 1;
                        if out[j].lig_comp() == 0 {
                            found = true;
                            break;
                        }
                    }

                    ligbase = if found && iter.may_skip(&out[j]) == MaySkip::Yes {
                        Ligbase::MaySkip
                    } else {
                        Ligbase::MayNotSkip
                    };
                }

                if ligbase == Ligbase::MayNotSkip {
                    return Err(iter.index() + 1);
                }
            }
        } else {
            // The first glyph is not attached to a previous ligature component,
            // so the following ones must not be either, unless they are
            // attached to the first glyph itself.
            if this_lig_id != 0 && this_lig_comp != 0 && this_lig_id != first_lig_id {
                return Err(iter.index() + 1);
            }
        }

        total_component_count = total_component_count.saturating_add(this.lig_num_comps());
    }

    Ok(MatchedInput {
        end: iter.index() + 1,
        positions,
        total_component_count,
    })
}

/// Matches `backtrack_len` glyphs before the current one, in the output buffer.
///
/// Returns the output index of the earliest matched glyph, or on failure
/// the index from which the output must be marked unsafe to concat.
pub fn match_backtrack(
    ctx: &ApplyContext,
    backtrack_len: u16,
    match_func: &MatchFunc,
) -> Result<usize, usize> {
    let mut iter = SkippyIter::new(ctx, ctx.buffer.backtrack_len(), true);
    iter.enable_matching(match_func);

    for _ in 0..backtrack_len {
        let mut unsafe_from = 0;
        if !iter.prev(Some(&mut unsafe_from)) {
            return Err(unsafe_from);
        }
    }

    Ok(iter.index())
}

/// Matches `lookahead_len` glyphs starting at `start_index`.
///
/// Returns the index right after the last matched glyph, or on failure
/// the index up to which the buffer must be marked unsafe to concat.
pub fn match_lookahead(
    ctx: &ApplyContext,
    lookahead_len: u16,
    match_func: &MatchFunc,
    start_index: usize,
) -> Result<usize, usize> {
    let mut iter = SkippyIter::new(ctx, start_index - 1, true);
    iter.enable_matching(match_func);

    for _ in 0..lookahead_len {
        let mut unsafe_to = 0;
        if !iter.next(Some(&mut unsafe_to)) {
            return Err(unsafe_to);
        }
    }

    Ok(iter.index() + 1)
}

/// The outcome of testing one glyph during a skipping scan.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Match {
    Match,
    NotMatch,
    Skip,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MayMatch {
    No,
    Yes,
    Maybe,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MaySkip {
    No,
    Yes,
    Maybe,
}

/// Walks the buffer, skipping glyphs ignored by the current lookup.
///
/// The iterator borrows the apply context immutably, so it is created anew
/// for every scan instead of living inside the context.
pub struct SkippyIter<'a, 'b> {
    ctx: &'a ApplyContext<'a, 'b>,
    lookup_props: u32,
    ignore_zwnj: bool,
    ignore_zwj: bool,
    ignore_hidden: bool,
    mask: Mask,
    syllable: u8,
    matching: Option<&'a MatchFunc<'a>>,
    buf_len: usize,
    glyph_data: u16,
    buf_idx: usize,
}

impl<'a, 'b> SkippyIter<'a, 'b> {
    pub fn new(ctx: &'a ApplyContext<'a, 'b>, start_buf_index: usize, context_match: bool) -> Self {
        SkippyIter {
            ctx,
            lookup_props: ctx.lookup_props,
            // Ignore ZWNJ if we are matching GPOS, or matching GSUB context and asked to.
            ignore_zwnj: ctx.table_index == TableIndex::GPOS || (context_match && ctx.auto_zwnj),
            // Ignore ZWJ if we are matching context, or asked to.
            ignore_zwj: context_match || ctx.auto_zwj,
            // Ignore hidden glyphs (like CGJ) during GPOS.
            ignore_hidden: ctx.table_index == TableIndex::GPOS,
            mask: if context_match {
                u32::MAX
            } else {
                ctx.lookup_mask()
            },
            syllable: if ctx.buffer.idx == start_buf_index && ctx.per_syllable {
                ctx.buffer.cur(0).syllable()
            } else {
                0
            },
            matching: None,
            buf_len: ctx.buffer.len,
            glyph_data: 0,
            buf_idx: start_buf_index,
        }
    }

    pub fn set_lookup_props(&mut self, lookup_props: u32) {
        self.lookup_props = lookup_props;
    }

    pub fn enable_matching(&mut self, func: &'a MatchFunc<'a>) {
        self.matching = Some(func);
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.buf_idx
    }

    /// Advances to the next matching glyph in the input buffer.
    pub fn next(&mut self, unsafe_to: Option<&mut usize>) -> bool {
        while self.buf_idx + 1 < self.buf_len {
            self.buf_idx += 1;
            let info = &self.ctx.buffer.info[self.buf_idx];

            match self.match_(info) {
                Match::Match => {
                    self.glyph_data += 1;
                    return true;
                }
                Match::NotMatch => {
                    if let Some(unsafe_to) = unsafe_to {
                        *unsafe_to = self.buf_idx + 1;
                    }

                    return false;
                }
                Match::Skip => continue,
            }
        }

        if let Some(unsafe_to) = unsafe_to {
            *unsafe_to = self.buf_idx + 1;
        }

        false
    }

    /// Steps back to the previous matching glyph in the output buffer.
    pub fn prev(&mut self, unsafe_from: Option<&mut usize>) -> bool {
        while self.buf_idx > 0 {
            self.buf_idx -= 1;
            let info = &self.ctx.buffer.out_info()[self.buf_idx];

            match self.match_(info) {
                Match::Match => {
                    self.glyph_data += 1;
                    return true;
                }
                Match::NotMatch => {
                    if let Some(unsafe_from) = unsafe_from {
                        *unsafe_from = self.buf_idx.max(1) - 1;
                    }

                    return false;
                }
                Match::Skip => continue,
            }
        }

        if let Some(unsafe_from) = unsafe_from {
            *unsafe_from = 0;
        }

        false
    }

    pub fn match_(&self, info: &GlyphInfo) -> Match {
        let skip = self.may_skip(info);
        if skip == MaySkip::Yes {
            return Match::Skip;
        }

        let matched = self.may_match(info);
        if matched == MayMatch::Yes || (matched == MayMatch::Maybe && skip == MaySkip::No) {
            return Match::Match;
        }

        if skip == MaySkip::No {
            return Match::NotMatch;
        }

        Match::Skip
    }

    fn may_match(&self, info: &GlyphInfo) -> MayMatch {
        if (info.mask & self.mask) == 0 || (self.syllable != 0 && self.syllable != info.syllable()) {
            return MayMatch::No;
        }

        match self.matching {
            Some(func) if func(info.as_glyph(), self.glyph_data) => MayMatch::Yes,
            Some(_) => MayMatch::No,
            None => MayMatch::Maybe,
        }
    }

    pub fn may_skip(&self, info: &GlyphInfo) -> MaySkip {
        if !self.ctx.check_glyph_property(info, self.lookup_props) {
            return MaySkip::Yes;
        }

        if info.is_default_ignorable()
            && (self.ignore_zwnj || !info.is_zwnj())
            && (self.ignore_zwj || !info.is_zwj())
            && (self.ignore_hidden || !info.is_hidden())
        {
            return MaySkip::Maybe;
        }

        MaySkip::No
    }
}

/// Replaces the matched glyphs with a single ligature glyph.
///
/// `count` and `positions` include the first glyph.
pub fn ligate_input(
    ctx: &mut ApplyContext,
    count: usize,
    positions: &MatchPositions,
    match_end: usize,
    total_component_count: u8,
    lig_glyph: GlyphId,
) {
    // - A base followed only by marks is a base, not a ligature,
    //   so that following marks can still attach to it.
    //
    // - A ligature made only of marks is a mark ligature. It keeps its old
    //   ligature id instead of allocating a new one, so it can still attach
    //   to a base ligature in GPOS. E.g. in LAM,LAM,SHADDA,FATHA,HEH where
    //   LAM,LAM,HEH ligate, SHADDA and FATHA keep a ligature id and
    //   component 2. If they then ligate together, they must not lose it.
    //
    // - When some components are ligatures themselves and had marks attached
    //   to their components, those marks are moved to the matching components
    //   of the new ligature. Such marks may follow the last component, so the
    //   buffer is scanned forward for them.

    ctx.buffer.merge_clusters(ctx.buffer.idx, match_end);

    let info = &ctx.buffer.info;
    let mut is_base_ligature = info[positions[0]].is_base_glyph();
    let mut is_mark_ligature = info[positions[0]].is_mark();
    for &position in &positions[1..count] {
        if !info[position].is_mark() {
            is_base_ligature = false;
            is_mark_ligature = false;
        }
    }

    let is_ligature = !is_base_ligature && !is_mark_ligature;
    let class = if is_ligature {
        GlyphPropsFlags::LIGATURE
    } else {
        GlyphPropsFlags::empty()
    };
    let lig_id = if is_ligature {
        ctx.buffer.allocate_lig_id()
    } else {
        0
    };

    let first = ctx.buffer.cur_mut(0);
    let mut last_lig_id = first.lig_id();
    let mut last_num_comps = first.lig_num_comps();
    let mut comps_so_far = last_num_comps;

    if is_ligature {
        first.set_lig_props_for_ligature(lig_id, total_component_count);
        if first.general_category() == GeneralCategory::NonspacingMark {
            first.set_general_category(GeneralCategory::OtherLetter);
        }
    }

    ctx.replace_glyph_with_ligature(lig_glyph, class);

    let buffer = &mut *ctx.buffer;
    for &position in &positions[1..count] {
        while buffer.idx < position && buffer.successful {
            if is_ligature {
                let cur = buffer.cur_mut(0);
                let mut this_comp = cur.lig_comp();
                if this_comp == 0 {
                    this_comp = last_num_comps;
                }
                let new_lig_comp = comps_so_far - last_num_comps + this_comp.min(last_num_comps);
                cur.set_lig_props_for_mark(lig_id, new_lig_comp);
            }
            buffer.next_glyph();
        }

        let cur = buffer.cur(0);
        last_lig_id = cur.lig_id();
        last_num_comps = cur.lig_num_comps();
        comps_so_far = comps_so_far.saturating_add(last_num_comps);

        // Skip the component itself.
        buffer.skip_glyph();
    }

    if !is_mark_ligature && last_lig_id != 0 {
        // Re-adjust components for any marks following.
        for i in buffer.idx..buffer.len {
            let info = &mut buffer.info[i];
            if last_lig_id != info.lig_id() {
                break;
            }

            let this_comp = info.lig_comp();
            if this_comp == 0 {
                break;
            }

            let new_lig_comp = comps_so_far - last_num_comps + this_comp.min(last_num_comps);
            info.set_lig_props_for_mark(lig_id, new_lig_comp);
        }
    }
}
