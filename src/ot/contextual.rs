use crate::parser::LazyArray16;
use crate::tables::gsubgpos::{
    ChainedContextLookup, ChainedSequenceRule, ChainedSequenceRuleSet, ContextLookup,
    SequenceLookupRecord, SequenceRule, SequenceRuleSet,
};

use super::matching::{
    match_backtrack, match_class, match_coverage, match_glyph, match_input, match_lookahead,
    MatchFunc, MatchPositions,
};
use super::{Apply, ApplyContext, MAX_CONTEXT_LENGTH};

impl Apply for ContextLookup<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        match *self {
            Self::Format1 { coverage, sets } => {
                let index = coverage.get(glyph)?;
                let set = sets.get(index)?;
                set.apply(ctx, &match_glyph)
            }
            Self::Format2 {
                coverage,
                classes,
                sets,
            } => {
                coverage.get(glyph)?;
                let class = classes.get(glyph);
                let set = sets.get(class)?;
                set.apply(ctx, &match_class(classes))
            }
            Self::Format3 {
                coverage,
                coverages,
                lookups,
            } => {
                coverage.get(glyph)?;
                // The first coverage is the one of the current glyph.
                let input_len = coverages.len().checked_sub(1)?;
                let match_func = match_coverage(coverages, 1);

                match match_input(ctx, input_len, &match_func) {
                    Ok(matched) => {
                        ctx.buffer
                            .unsafe_to_break(Some(ctx.buffer.idx), Some(matched.end));
                        let mut positions = matched.positions;
                        apply_lookup(ctx, input_len.into(), &mut positions, matched.end, lookups);
                        Some(())
                    }
                    Err(unsafe_to) => {
                        ctx.buffer
                            .unsafe_to_concat(Some(ctx.buffer.idx), Some(unsafe_to));
                        None
                    }
                }
            }
        }
    }
}

trait SequenceRuleSetExt {
    fn apply(&self, ctx: &mut ApplyContext, match_func: &MatchFunc) -> Option<()>;
}

impl SequenceRuleSetExt for SequenceRuleSet<'_> {
    fn apply(&self, ctx: &mut ApplyContext, match_func: &MatchFunc) -> Option<()> {
        // Rules are tried in order, the first one that applies wins.
        if self
            .rules
            .iter()
            .any(|rule| rule.apply(ctx, match_func).is_some())
        {
            Some(())
        } else {
            None
        }
    }
}

trait SequenceRuleExt {
    fn apply(&self, ctx: &mut ApplyContext, match_func: &MatchFunc) -> Option<()>;
}

impl SequenceRuleExt for SequenceRule<'_> {
    fn apply(&self, ctx: &mut ApplyContext, match_func: &MatchFunc) -> Option<()> {
        apply_context(ctx, self.input, match_func, self.lookups)
    }
}

impl Apply for ChainedContextLookup<'_> {
    fn apply(&self, ctx: &mut ApplyContext) -> Option<()> {
        let glyph = ctx.buffer.cur(0).as_glyph();
        match *self {
            Self::Format1 { coverage, sets } => {
                let index = coverage.get(glyph)?;
                let set = sets.get(index)?;
                set.apply(ctx, [&match_glyph, &match_glyph, &match_glyph])
            }
            Self::Format2 {
                coverage,
                backtrack_classes,
                input_classes,
                lookahead_classes,
                sets,
            } => {
                coverage.get(glyph)?;
                let class = input_classes.get(glyph);
                let set = sets.get(class)?;
                set.apply(
                    ctx,
                    [
                        &match_class(backtrack_classes),
                        &match_class(input_classes),
                        &match_class(lookahead_classes),
                    ],
                )
            }
            Self::Format3 {
                coverage,
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                lookups,
            } => {
                coverage.get(glyph)?;
                let input_len = input_coverages.len().checked_sub(1)?;

                apply_chain(
                    ctx,
                    [
                        backtrack_coverages.len(),
                        input_len,
                        lookahead_coverages.len(),
                    ],
                    [
                        &match_coverage(backtrack_coverages, 0),
                        &match_coverage(input_coverages, 1),
                        &match_coverage(lookahead_coverages, 0),
                    ],
                    lookups,
                )
            }
        }
    }
}

trait ChainRuleSetExt {
    fn apply(&self, ctx: &mut ApplyContext, match_funcs: [&MatchFunc; 3]) -> Option<()>;
}

impl ChainRuleSetExt for ChainedSequenceRuleSet<'_> {
    fn apply(&self, ctx: &mut ApplyContext, match_funcs: [&MatchFunc; 3]) -> Option<()> {
        if self
            .rules
            .iter()
            .any(|rule| rule.apply(ctx, match_funcs).is_some())
        {
            Some(())
        } else {
            None
        }
    }
}

trait ChainRuleExt {
    fn apply(&self, ctx: &mut ApplyContext, match_funcs: [&MatchFunc; 3]) -> Option<()>;
}

impl ChainRuleExt for ChainedSequenceRule<'_> {
    fn apply(&self, ctx: &mut ApplyContext, match_funcs: [&MatchFunc; 3]) -> Option<()> {
        apply_chain_context(
            ctx,
            self.backtrack,
            self.input,
            self.lookahead,
            match_funcs,
            self.lookups,
        )
    }
}

fn apply_context(
    ctx: &mut ApplyContext,
    input: LazyArray16<u16>,
    match_func: &MatchFunc,
    lookups: LazyArray16<SequenceLookupRecord>,
) -> Option<()> {
    let match_func = |glyph, index| input.get(index).map_or(false, |value| match_func(glyph, value));

    let matched = match_input(ctx, input.len(), &match_func).ok()?;
    ctx.buffer
        .unsafe_to_break(Some(ctx.buffer.idx), Some(matched.end));
    let mut positions = matched.positions;
    apply_lookup(ctx, input.len().into(), &mut positions, matched.end, lookups);
    Some(())
}

fn apply_chain_context(
    ctx: &mut ApplyContext,
    backtrack: LazyArray16<u16>,
    input: LazyArray16<u16>,
    lookahead: LazyArray16<u16>,
    match_funcs: [&MatchFunc; 3],
    lookups: LazyArray16<SequenceLookupRecord>,
) -> Option<()> {
    let back = |glyph, index| {
        backtrack
            .get(index)
            .map_or(false, |value| match_funcs[0](glyph, value))
    };

    let input_func = |glyph, index| {
        input
            .get(index)
            .map_or(false, |value| match_funcs[1](glyph, value))
    };

    let ahead = |glyph, index| {
        lookahead
            .get(index)
            .map_or(false, |value| match_funcs[2](glyph, value))
    };

    apply_chain(
        ctx,
        [backtrack.len(), input.len(), lookahead.len()],
        [&back, &input_func, &ahead],
        lookups,
    )
}

/// Matches input, then lookahead, then backtrack, and applies the nested
/// lookups when all three match.
///
/// `lens` and `match_funcs` are in backtrack, input, lookahead order.
fn apply_chain(
    ctx: &mut ApplyContext,
    lens: [u16; 3],
    match_funcs: [&MatchFunc; 3],
    lookups: LazyArray16<SequenceLookupRecord>,
) -> Option<()> {
    let [backtrack_len, input_len, lookahead_len] = lens;

    let matched = match match_input(ctx, input_len, match_funcs[1]) {
        Ok(matched) => matched,
        Err(unsafe_to) => {
            ctx.buffer
                .unsafe_to_concat(Some(ctx.buffer.idx), Some(unsafe_to));
            return None;
        }
    };

    let end_index = match match_lookahead(ctx, lookahead_len, match_funcs[2], matched.end) {
        Ok(end_index) => end_index,
        Err(unsafe_to) => {
            ctx.buffer
                .unsafe_to_concat(Some(ctx.buffer.idx), Some(unsafe_to));
            return None;
        }
    };

    let start_index = match match_backtrack(ctx, backtrack_len, match_funcs[0]) {
        Ok(start_index) => start_index,
        Err(unsafe_from) => {
            ctx.buffer
                .unsafe_to_concat_from_outbuffer(Some(unsafe_from), Some(end_index));
            return None;
        }
    };

    ctx.buffer
        .unsafe_to_break_from_outbuffer(Some(start_index), Some(end_index));
    let mut positions = matched.positions;
    apply_lookup(ctx, input_len.into(), &mut positions, matched.end, lookups);
    Some(())
}

/// Applies nested lookups at the matched positions.
///
/// Every nested lookup may grow or shrink the buffer, so the remaining
/// positions are shifted after each one. When the buffer shrinks the
/// deleted glyphs are assumed to be the ones right after the current
/// position, and the window never rewinds past that position.
pub(crate) fn apply_lookup(
    ctx: &mut ApplyContext,
    input_len: usize,
    match_positions: &mut MatchPositions,
    match_end: usize,
    lookups: LazyArray16<SequenceLookupRecord>,
) {
    let mut count = input_len + 1;

    if count > match_positions.len() {
        match_positions.resize(count, 0);
    }

    // All positions are distances from the start of the *output* buffer.
    let mut end = {
        let backtrack_len = ctx.buffer.backtrack_len();
        let delta = backtrack_len as isize - ctx.buffer.idx as isize;

        for position in &mut match_positions[..count] {
            *position = (*position as isize + delta) as usize;
        }

        (backtrack_len + match_end - ctx.buffer.idx) as isize
    };

    for record in lookups {
        if !ctx.buffer.successful {
            break;
        }

        let idx = usize::from(record.sequence_index);
        if idx >= count {
            continue;
        }

        let orig_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();

        // Earlier nested lookups may have deleted many glyphs.
        if match_positions[idx] >= orig_len {
            continue;
        }

        if !ctx.buffer.move_to(match_positions[idx]) {
            break;
        }

        if ctx.buffer.max_ops <= 0 {
            break;
        }

        if !ctx.recurse(record.lookup_index) {
            continue;
        }

        let new_len = ctx.buffer.backtrack_len() + ctx.buffer.lookahead_len();
        let mut delta = new_len as isize - orig_len as isize;
        if delta == 0 {
            continue;
        }

        // The nested lookup changed the buffer length. New glyphs are assumed
        // to be right after the current position, and removed ones to be the
        // match positions following it.
        end += delta;
        if end < match_positions[idx] as isize {
            // The nested lookup removed more glyphs than were left in the
            // window. Never rewind past the current position.
            delta += match_positions[idx] as isize - end;
            end = match_positions[idx] as isize;
        }

        // The position after the nested lookup.
        let mut next = idx + 1;

        if delta > 0 {
            if delta as usize + count > MAX_CONTEXT_LENGTH {
                break;
            }

            if delta as usize + count > match_positions.len() {
                match_positions.resize(delta as usize + count, 0);
            }
        } else {
            // delta is non-positive here.
            delta = delta.max(next as isize - count as isize);
            next = (next as isize - delta) as usize;
        }

        // Shift!
        match_positions.copy_within(next..count, (next as isize + delta) as usize);
        next = (next as isize + delta) as usize;
        count = (count as isize + delta) as usize;

        // Fill in new entries.
        for j in idx + 1..next {
            match_positions[j] = match_positions[j - 1] + 1;
        }

        // And fix up the rest.
        while next < count {
            match_positions[next] = (match_positions[next] as isize + delta) as usize;
            next += 1;
        }
    }

    ctx.buffer.move_to(end.max(0) as usize);
}
