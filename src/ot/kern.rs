//! Fallback kerning from the `kern` table.

use ttf_parser::GlyphId;

use super::matching::SkippyIter;
use super::{ApplyContext, TableIndex};
use crate::buffer::{Buffer, BufferScratchFlags};
use crate::plan::ShapePlan;
use crate::tables::gsubgpos::LookupFlags;
use crate::{Face, Mask};

pub fn has_kerning(face: &Face) -> bool {
    face.tables().kern.is_some()
}

pub fn has_machine_kerning(face: &Face) -> bool {
    match face.tables().kern {
        Some(ref kern) => kern.subtables.into_iter().any(|s| s.has_state_machine),
        None => false,
    }
}

pub fn has_cross_kerning(face: &Face) -> bool {
    match face.tables().kern {
        Some(ref kern) => kern.subtables.into_iter().any(|s| s.has_cross_stream),
        None => false,
    }
}

/// Applies pair kerning from every usable `kern` subtable.
pub fn kern(plan: &ShapePlan, face: &Face, buffer: &mut Buffer) {
    let Some(table) = face.tables().kern else {
        return;
    };

    let horizontal = buffer.direction.is_horizontal();

    // Subtables are written in logical order.
    let backward = buffer.direction.is_backward();
    if backward {
        buffer.reverse();
    }

    for subtable in table.subtables {
        if subtable.variable || subtable.horizontal != horizontal {
            continue;
        }

        if subtable.has_state_machine {
            log::debug!("state machine kern subtables are not supported");
            continue;
        }

        machine_kern(
            face,
            buffer,
            plan.kern_mask,
            subtable.has_cross_stream,
            |left, right| {
                subtable
                    .glyphs_kerning(GlyphId(left as u16), GlyphId(right as u16))
                    .map_or(0, i32::from)
            },
        );
    }

    if backward {
        buffer.reverse();
    }
}

fn machine_kern(
    face: &Face,
    buffer: &mut Buffer,
    kern_mask: Mask,
    cross_stream: bool,
    get_kerning: impl Fn(u32, u32) -> i32,
) {
    let mut ctx = ApplyContext::new(TableIndex::GPOS, face, buffer);
    ctx.set_lookup_mask(kern_mask);
    ctx.lookup_props = u32::from(LookupFlags::IGNORE_MARKS.bits());

    let horizontal = ctx.buffer.direction.is_horizontal();

    let mut i = 0;
    while i < ctx.buffer.len {
        if (ctx.buffer.info[i].mask & kern_mask) == 0 {
            i += 1;
            continue;
        }

        let next = {
            let mut iter = SkippyIter::new(&ctx, i, false);
            if iter.next(None) {
                Some(iter.index())
            } else {
                None
            }
        };

        let Some(j) = next else {
            i += 1;
            continue;
        };

        let info = &ctx.buffer.info;
        let kern = get_kerning(info[i].glyph_id, info[j].glyph_id);

        if kern != 0 {
            let pos = &mut ctx.buffer.pos;
            if horizontal {
                if cross_stream {
                    pos[j].y_offset = kern;
                    ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
                } else {
                    let kern1 = kern >> 1;
                    let kern2 = kern - kern1;
                    pos[i].x_advance += kern1;
                    pos[j].x_advance += kern2;
                    pos[j].x_offset += kern2;
                }
            } else if cross_stream {
                pos[j].x_offset = kern;
                ctx.buffer.scratch_flags |= BufferScratchFlags::HAS_GPOS_ATTACHMENT;
            } else {
                let kern1 = kern >> 1;
                let kern2 = kern - kern1;
                pos[i].y_advance += kern1;
                pos[j].y_advance += kern2;
                pos[j].y_offset += kern2;
            }

            ctx.buffer.unsafe_to_break(Some(i), Some(j + 1));
        }

        i = j;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::buffer::{GlyphInfo, GlyphPosition, GlyphPropsFlags};
    use crate::testing::*;
    use crate::Direction;

    fn glyph_buffer(glyphs: &[(u32, GlyphPropsFlags)]) -> Buffer {
        let mut buffer = Buffer::new();
        for (cluster, &(glyph, props)) in glyphs.iter().enumerate() {
            let mut info = GlyphInfo {
                glyph_id: glyph,
                mask: 1,
                cluster: cluster as u32,
                ..GlyphInfo::default()
            };
            info.set_glyph_props(props.bits());
            buffer.info.push(info);
        }
        buffer.len = glyphs.len();
        buffer.pos.resize(glyphs.len(), GlyphPosition::default());
        buffer.direction = Direction::LeftToRight;
        buffer
    }

    fn pair_kerning(left: u32, right: u32) -> i32 {
        match (left, right) {
            (1, 2) => -41,
            _ => 0,
        }
    }

    #[test]
    fn kerning_is_split_between_the_pair() {
        let data = FontBuilder::new().glyph('a', 1, 500).build();
        let face = Face::from_slice(&data, 0).unwrap();
        let mut buffer = glyph_buffer(&[
            (1, GlyphPropsFlags::BASE_GLYPH),
            (7, GlyphPropsFlags::MARK),
            (2, GlyphPropsFlags::BASE_GLYPH),
        ]);

        machine_kern(&face, &mut buffer, 1, false, pair_kerning);

        let advances: Vec<i32> = buffer.pos.iter().map(|pos| pos.x_advance).collect();
        assert_eq!(advances, [-21, 0, -20]);
        assert_eq!(buffer.pos[2].x_offset, -20);
    }

    #[test]
    fn cross_stream_kerning_moves_the_second_glyph() {
        let data = FontBuilder::new().glyph('a', 1, 500).build();
        let face = Face::from_slice(&data, 0).unwrap();
        let mut buffer = glyph_buffer(&[
            (1, GlyphPropsFlags::BASE_GLYPH),
            (2, GlyphPropsFlags::BASE_GLYPH),
        ]);

        machine_kern(&face, &mut buffer, 1, true, pair_kerning);
        assert_eq!(buffer.pos[1].y_offset, -41);
        assert_eq!(buffer.pos[0].x_advance, 0);
        assert!(buffer
            .scratch_flags
            .contains(BufferScratchFlags::HAS_GPOS_ATTACHMENT));
    }

    #[test]
    fn masked_glyphs_are_not_kerned() {
        let data = FontBuilder::new().glyph('a', 1, 500).build();
        let face = Face::from_slice(&data, 0).unwrap();
        let mut buffer = glyph_buffer(&[
            (1, GlyphPropsFlags::BASE_GLYPH),
            (2, GlyphPropsFlags::BASE_GLYPH),
        ]);

        machine_kern(&face, &mut buffer, 2, false, pair_kerning);
        assert!(buffer.pos.iter().all(|pos| pos.x_advance == 0));
    }

    #[test]
    fn kern_table_is_detected() {
        let data = FontBuilder::new()
            .glyph('a', 1, 500)
            .glyph('b', 2, 500)
            .kern(&[(1, 2, -50)])
            .build();
        let face = Face::from_slice(&data, 0).unwrap();
        assert!(has_kerning(&face));
        assert!(!has_machine_kerning(&face));
        assert!(!has_cross_kerning(&face));

        let data = FontBuilder::new().glyph('a', 1, 500).build();
        let face = Face::from_slice(&data, 0).unwrap();
        assert!(!has_kerning(&face));
    }
}
