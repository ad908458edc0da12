use crate::buffer::{
    glyph_flag, Buffer, BufferClusterLevel, BufferFlags, BufferScratchFlags, GlyphInfo,
    GlyphPropsFlags,
};
use crate::ot::{self, kern};
use crate::plan::ShapePlan;
use crate::unicode::{CharExt, GeneralCategory};
use crate::{Direction, Face, Feature, GlyphBuffer, UnicodeBuffer};

/// Shapes the buffer content using provided font and features.
///
/// Consumes the buffer. You can then run [`GlyphBuffer::clear`] to get the [`UnicodeBuffer`] back
/// without allocating a new one.
///
/// If you plan to shape multiple strings using the same [`Face`] prefer [`shape_with_plan`].
/// This is because [`ShapePlan`] initialization is pretty slow and should preferably be called
/// once for each [`Face`].
pub fn shape(face: &Face, features: &[Feature], mut buffer: UnicodeBuffer) -> GlyphBuffer {
    buffer.guess_segment_properties();
    let plan = ShapePlan::new(
        face,
        buffer.0.direction,
        buffer.0.script,
        buffer.0.language.as_ref(),
        features,
    );
    shape_with_plan(face, &plan, buffer)
}

/// Shapes the buffer content using the provided font and plan.
///
/// Consumes the buffer. You can then run [`GlyphBuffer::clear`] to get the [`UnicodeBuffer`] back
/// without allocating a new one.
///
/// The buffer is shaped in the direction the plan was compiled for.
pub fn shape_with_plan(face: &Face, plan: &ShapePlan, buffer: UnicodeBuffer) -> GlyphBuffer {
    let mut buffer = buffer.0;
    buffer.guess_segment_properties();

    if buffer.direction != plan.direction {
        log::warn!(
            "buffer direction {:?} does not match the plan, shaping as {:?}",
            buffer.direction,
            plan.direction
        );
        buffer.direction = plan.direction;
    }

    if buffer.len > 0 {
        // Save the original direction, we use it later.
        let target_direction = buffer.direction;

        buffer.enter();
        shape_internal(&mut ShapeContext {
            plan,
            face,
            buffer: &mut buffer,
            target_direction,
        });
        buffer.leave();
    }

    GlyphBuffer(buffer)
}

struct ShapeContext<'a> {
    plan: &'a ShapePlan,
    face: &'a Face<'a>,
    buffer: &'a mut Buffer,
    // Transient stuff
    target_direction: Direction,
}

// Pull it all together!
fn shape_internal(ctx: &mut ShapeContext) {
    ctx.buffer.clear_output();

    initialize_masks(ctx);
    set_unicode_props(ctx.buffer);

    form_clusters(ctx.buffer);

    ensure_native_direction(ctx.buffer);

    substitute_pre(ctx);
    position(ctx);
    substitute_post(ctx);

    propagate_flags(ctx.buffer);

    ctx.buffer.direction = ctx.target_direction;
}

fn substitute_pre(ctx: &mut ShapeContext) {
    substitute_default(ctx);
    substitute_complex(ctx);
}

fn substitute_post(ctx: &mut ShapeContext) {
    hide_default_ignorables(ctx.buffer, ctx.face);
}

fn substitute_default(ctx: &mut ShapeContext) {
    rotate_chars(ctx);
    setup_masks(ctx);
    map_glyphs(ctx.face, ctx.buffer);
}

fn substitute_complex(ctx: &mut ShapeContext) {
    ot::substitute::substitute_start(ctx.face, ctx.buffer);

    if ctx.plan.fallback_glyph_classes {
        synthesize_glyph_classes(ctx.buffer);
    }

    ot::substitute::substitute(ctx.plan, ctx.face, ctx.buffer);
}

fn position(ctx: &mut ShapeContext) {
    ctx.buffer.clear_positions();

    position_default(ctx);

    position_complex(ctx);

    if ctx.buffer.direction.is_backward() {
        ctx.buffer.reverse();
    }
}

fn position_default(ctx: &mut ShapeContext) {
    let len = ctx.buffer.len;

    if ctx.buffer.direction.is_horizontal() {
        for (info, pos) in ctx.buffer.info[..len].iter().zip(&mut ctx.buffer.pos[..len]) {
            pos.x_advance = ctx.face.glyph_h_advance(info.as_glyph());
        }
    } else {
        for (info, pos) in ctx.buffer.info[..len].iter().zip(&mut ctx.buffer.pos[..len]) {
            let glyph = info.as_glyph();
            pos.y_advance = ctx.face.glyph_v_advance(glyph);
            pos.x_offset -= ctx.face.glyph_h_origin(glyph);
            pos.y_offset -= ctx.face.glyph_v_origin(glyph);
        }
    }
}

fn position_complex(ctx: &mut ShapeContext) {
    // If the font has no GPOS and direction is forward, then when
    // zeroing mark widths, we shift the mark with it, such that the
    // mark is positioned hanging over the previous glyph. When
    // direction is backward we don't shift and it will end up
    // hanging over the next glyph after the final reordering.
    let adjust_offsets_when_zeroing =
        ctx.plan.adjust_mark_positioning_when_zeroing && ctx.buffer.direction.is_forward();

    ot::position::position_start(ctx.face, ctx.buffer);

    position_by_plan(ctx.plan, ctx.face, ctx.buffer);

    if ctx.plan.zero_marks {
        zero_mark_widths_by_gdef(ctx.buffer, adjust_offsets_when_zeroing);
    }

    // Finish off. Has to follow a certain order.
    zero_width_default_ignorables(ctx.buffer);
    ot::position::position_finish_offsets(ctx.face, ctx.buffer);
}

fn position_by_plan(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    if plan.apply_gpos {
        ot::position::position(plan, face, buffer);
    } else if plan.apply_kern {
        kern::kern(plan, face, buffer);
    }
}

fn initialize_masks(ctx: &mut ShapeContext) {
    let global_mask = ctx.plan.ot_map.global_mask();
    ctx.buffer.reset_masks(global_mask);
}

fn setup_masks(ctx: &mut ShapeContext) {
    setup_masks_fraction(ctx);

    for feature in &ctx.plan.user_features {
        if !feature.is_global() {
            let (mask, shift) = ctx.plan.ot_map.get_mask(feature.tag);
            ctx.buffer
                .set_masks(feature.value << shift, mask, feature.start, feature.end);
        }
    }
}

fn setup_masks_fraction(ctx: &mut ShapeContext) {
    let buffer = &mut ctx.buffer;
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_NON_ASCII) || !ctx.plan.has_frac {
        return;
    }

    let plan = ctx.plan;
    let (pre_mask, post_mask) = if buffer.direction.is_forward() {
        (
            plan.numr_mask | plan.frac_mask,
            plan.frac_mask | plan.dnom_mask,
        )
    } else {
        (
            plan.frac_mask | plan.dnom_mask,
            plan.numr_mask | plan.frac_mask,
        )
    };

    let is_digit = |info: &GlyphInfo| info.general_category() == GeneralCategory::DecimalNumber;

    let len = buffer.len;
    let mut i = 0;
    while i < len {
        // FRACTION SLASH
        if buffer.info[i].glyph_id != 0x2044 {
            i += 1;
            continue;
        }

        let mut start = i;
        while start > 0 && is_digit(&buffer.info[start - 1]) {
            start -= 1;
        }

        let mut end = i + 1;
        while end < len && is_digit(&buffer.info[end]) {
            end += 1;
        }

        if start == i || end == i + 1 {
            // A lone slash is not a fraction.
            i = end;
            continue;
        }

        buffer.unsafe_to_break(Some(start), Some(end));

        for info in &mut buffer.info[start..i] {
            info.mask |= pre_mask;
        }

        buffer.info[i].mask |= plan.frac_mask;

        for info in &mut buffer.info[i + 1..end] {
            info.mask |= post_mask;
        }

        i = end;
    }
}

fn set_unicode_props(buffer: &mut Buffer) {
    // Implement enough of Unicode Graphemes here that shaping
    // in reverse-direction wouldn't break graphemes. Namely,
    // we mark all marks and ZWJ as continuations.
    //
    // https://www.unicode.org/reports/tr29/#Regex_Definitions

    let len = buffer.len;
    for info in &mut buffer.info[..len] {
        info.init_unicode_props(&mut buffer.scratch_flags);

        // Marks are already set as continuation by the above line.
        // Handle Emoji_Modifier and ZWJ-continuation.
        if info.general_category() == GeneralCategory::ModifierSymbol
            && matches!(info.glyph_id, 0x1F3FB..=0x1F3FF)
        {
            info.set_continuation();
        } else if info.is_zwj() {
            info.set_continuation();
        } else if matches!(info.glyph_id, 0xE0020..=0xE007F) {
            // Tags are used for Emoji sub-region flag sequences:
            // https://github.com/harfbuzz/harfbuzz/issues/1556
            info.set_continuation();
        }
    }
}

fn foreach_group(
    buffer: &mut Buffer,
    group: impl Fn(&GlyphInfo, &GlyphInfo) -> bool,
    mut f: impl FnMut(&mut Buffer, usize, usize),
) {
    let mut start = 0;
    while start < buffer.len {
        let end = buffer.group_end(start, &group);
        f(buffer, start, end);
        start = end;
    }
}

fn foreach_grapheme(buffer: &mut Buffer, f: impl FnMut(&mut Buffer, usize, usize)) {
    foreach_group(buffer, |_, info| info.is_continuation(), f);
}

fn foreach_cluster(buffer: &mut Buffer, f: impl FnMut(&mut Buffer, usize, usize)) {
    foreach_group(buffer, |a, b| a.cluster == b.cluster, f);
}

fn form_clusters(buffer: &mut Buffer) {
    if !buffer.scratch_flags.contains(BufferScratchFlags::HAS_NON_ASCII) {
        return;
    }

    if buffer.cluster_level == BufferClusterLevel::MonotoneGraphemes {
        foreach_grapheme(buffer, |buffer, start, end| {
            buffer.merge_clusters(start, end)
        });
    } else {
        foreach_grapheme(buffer, |buffer, start, end| {
            buffer.unsafe_to_break(Some(start), Some(end))
        });
    }
}

fn ensure_native_direction(buffer: &mut Buffer) {
    let dir = buffer.direction;
    let hor = buffer
        .script
        .and_then(Direction::from_script)
        .unwrap_or_default();

    if (dir.is_horizontal() && dir != hor && hor != Direction::Invalid)
        || (dir.is_vertical() && dir != Direction::TopToBottom)
    {
        let merge = buffer.cluster_level == BufferClusterLevel::MonotoneCharacters;
        foreach_grapheme(buffer, |buffer, start, end| {
            // Graphemes were merged by form_clusters already, unless asked otherwise.
            if merge {
                buffer.merge_clusters(start, end);
            }

            buffer.reverse_range(start, end);
        });

        buffer.reverse();
        buffer.direction = buffer.direction.reverse();
    }
}

fn rotate_chars(ctx: &mut ShapeContext) {
    let len = ctx.buffer.len;

    if ctx.target_direction.is_backward() {
        let rtlm_mask = ctx.plan.rtlm_mask;

        for info in &mut ctx.buffer.info[..len] {
            let c = info.as_char().mirrored().map_or(0, u32::from);
            if c != 0 && c != info.glyph_id && ctx.face.has_glyph(c) {
                info.glyph_id = c;
            } else {
                info.mask |= rtlm_mask;
            }
        }
    }

    if ctx.target_direction.is_vertical() && !ctx.plan.has_vert {
        for info in &mut ctx.buffer.info[..len] {
            let c = vert_char_for(info.glyph_id);
            if c != info.glyph_id && ctx.face.has_glyph(c) {
                info.glyph_id = c;
            }
        }
    }
}

fn vert_char_for(u: u32) -> u32 {
    match u >> 8 {
        0x20 => match u {
            0x2013 => 0xfe32, // EN DASH
            0x2014 => 0xfe31, // EM DASH
            0x2025 => 0xfe30, // TWO DOT LEADER
            0x2026 => 0xfe19, // HORIZONTAL ELLIPSIS
            _ => u,
        },
        0x30 => match u {
            0x3001 => 0xfe11, // IDEOGRAPHIC COMMA
            0x3002 => 0xfe12, // IDEOGRAPHIC FULL STOP
            0x3008 => 0xfe3f, // LEFT ANGLE BRACKET
            0x3009 => 0xfe40, // RIGHT ANGLE BRACKET
            0x300a => 0xfe3d, // LEFT DOUBLE ANGLE BRACKET
            0x300b => 0xfe3e, // RIGHT DOUBLE ANGLE BRACKET
            0x300c => 0xfe41, // LEFT CORNER BRACKET
            0x300d => 0xfe42, // RIGHT CORNER BRACKET
            0x300e => 0xfe43, // LEFT WHITE CORNER BRACKET
            0x300f => 0xfe44, // RIGHT WHITE CORNER BRACKET
            0x3010 => 0xfe3b, // LEFT BLACK LENTICULAR BRACKET
            0x3011 => 0xfe3c, // RIGHT BLACK LENTICULAR BRACKET
            0x3014 => 0xfe39, // LEFT TORTOISE SHELL BRACKET
            0x3015 => 0xfe3a, // RIGHT TORTOISE SHELL BRACKET
            0x3016 => 0xfe17, // LEFT WHITE LENTICULAR BRACKET
            0x3017 => 0xfe18, // RIGHT WHITE LENTICULAR BRACKET
            _ => u,
        },
        0xfe => match u {
            0xfe4f => 0xfe34, // WAVY LOW LINE
            _ => u,
        },
        0xff => match u {
            0xff01 => 0xfe15, // FULLWIDTH EXCLAMATION MARK
            0xff08 => 0xfe35, // FULLWIDTH LEFT PARENTHESIS
            0xff09 => 0xfe36, // FULLWIDTH RIGHT PARENTHESIS
            0xff0c => 0xfe10, // FULLWIDTH COMMA
            0xff1a => 0xfe13, // FULLWIDTH COLON
            0xff1b => 0xfe14, // FULLWIDTH SEMICOLON
            0xff1f => 0xfe16, // FULLWIDTH QUESTION MARK
            0xff3b => 0xfe47, // FULLWIDTH LEFT SQUARE BRACKET
            0xff3d => 0xfe48, // FULLWIDTH RIGHT SQUARE BRACKET
            0xff3f => 0xfe33, // FULLWIDTH LOW LINE
            0xff5b => 0xfe37, // FULLWIDTH LEFT CURLY BRACKET
            0xff5d => 0xfe38, // FULLWIDTH RIGHT CURLY BRACKET
            _ => u,
        },
        _ => u,
    }
}

/// Replaces characters with nominal glyphs.
///
/// A character followed by a variation selector the font has a mapping for
/// is replaced together with the selector by the variant glyph.
fn map_glyphs(face: &Face, buffer: &mut Buffer) {
    buffer.clear_output();

    let len = buffer.len;
    while buffer.idx < len && buffer.successful {
        let c = buffer.cur(0).as_char();

        if buffer.idx + 1 < len {
            let selector = buffer.cur(1).as_char();
            if selector.is_variation_selector() {
                if let Some(glyph) = face.glyph_variation_index(c, selector) {
                    buffer.replace_glyphs(2, 1, &[u32::from(glyph.0)]);
                    continue;
                }
            }
        }

        let glyph = face.glyph_index(u32::from(c)).map_or(0, |g| u32::from(g.0));
        buffer.replace_glyph(glyph);
    }

    buffer.sync();
}

fn synthesize_glyph_classes(buffer: &mut Buffer) {
    let len = buffer.len;
    for info in &mut buffer.info[..len] {
        // Never mark default-ignorables as marks.
        // They won't get in the way of lookups anyway,
        // but having them as mark will cause them to be skipped
        // over if the lookup-flag says so.
        let class = if info.general_category() != GeneralCategory::NonspacingMark
            || info.is_default_ignorable()
        {
            GlyphPropsFlags::BASE_GLYPH
        } else {
            GlyphPropsFlags::MARK
        };

        info.set_glyph_props(class.bits());
    }
}

fn zero_width_default_ignorables(buffer: &mut Buffer) {
    if buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_DEFAULT_IGNORABLES)
        && !buffer
            .flags
            .contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES)
        && !buffer.flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES)
    {
        let len = buffer.len;
        for (info, pos) in buffer.info[..len].iter().zip(&mut buffer.pos[..len]) {
            if info.is_default_ignorable() {
                pos.x_advance = 0;
                pos.y_advance = 0;
                pos.x_offset = 0;
                pos.y_offset = 0;
            }
        }
    }
}

fn zero_mark_widths_by_gdef(buffer: &mut Buffer, adjust_offsets: bool) {
    let len = buffer.len;
    for (info, pos) in buffer.info[..len].iter().zip(&mut buffer.pos[..len]) {
        if info.is_mark() {
            if adjust_offsets {
                pos.x_offset -= pos.x_advance;
                pos.y_offset -= pos.y_advance;
            }

            pos.x_advance = 0;
            pos.y_advance = 0;
        }
    }
}

fn hide_default_ignorables(buffer: &mut Buffer, face: &Face) {
    if !buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_DEFAULT_IGNORABLES)
        || buffer
            .flags
            .contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES)
    {
        return;
    }

    if !buffer.flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES) {
        if let Some(invisible) = buffer
            .invisible
            .or_else(|| face.glyph_index(u32::from(' ')))
        {
            let len = buffer.len;
            for info in &mut buffer.info[..len] {
                if info.is_default_ignorable() {
                    info.glyph_id = u32::from(invisible.0);
                }
            }
            return;
        }
    }

    buffer.delete_glyphs_inplace(GlyphInfo::is_default_ignorable);
}

fn propagate_flags(buffer: &mut Buffer) {
    // Propagate cluster-level glyph flags to be the same on all cluster glyphs.
    // Simplifies using them.
    if !buffer
        .scratch_flags
        .contains(BufferScratchFlags::HAS_GLYPH_FLAGS)
    {
        return;
    }

    foreach_cluster(buffer, |buffer, start, end| {
        let mut mask = buffer.info[start..end]
            .iter()
            .fold(0, |mask, info| mask | (info.mask & glyph_flag::DEFINED));

        if mask == 0 {
            return;
        }

        if mask & glyph_flag::UNSAFE_TO_BREAK != 0 {
            mask |= glyph_flag::UNSAFE_TO_CONCAT;
        }

        for info in &mut buffer.info[start..end] {
            info.mask = (info.mask & !glyph_flag::DEFINED) | mask;
        }
    });
}
