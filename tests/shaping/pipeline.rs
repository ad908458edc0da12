use rustyshaper::{
    Direction, Face, Feature, SerializeFlags, ShapePlan, UnicodeBuffer, Variation,
};

use crate::shape;
use crate::testing::*;

fn latin_font() -> Vec<u8> {
    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 600)
        .glyph(' ', 3, 250)
        .build()
}

#[test]
fn empty_buffer() {
    assert_eq!(shape(&latin_font(), "", ""), "");
}

#[test]
fn missing_glyph_maps_to_notdef() {
    assert_eq!(
        shape(&latin_font(), "az", ""),
        "gid1=0+500|\
         gid0=1+0"
    );
}

#[test]
fn serialize_flags() {
    let data = latin_font();
    assert_eq!(shape(&data, "ab", "--no-clusters"), "gid1+500|gid2+600");
    assert_eq!(shape(&data, "ab", "--no-positions"), "gid1=0|gid2=1");
    assert_eq!(shape(&data, "ab", "--no-glyph-names"), "1=0+500|2=1+600");
    assert_eq!(shape(&data, "ab", "--ned"), "gid1|gid2@500,0");
}

#[test]
fn right_to_left_is_reversed() {
    let data = FontBuilder::new()
        .glyph('\u{05D0}', 1, 500)
        .glyph('\u{05D1}', 2, 600)
        .build();

    assert_eq!(
        shape(&data, "\u{05D0}\u{05D1}", ""),
        "gid2=2+600|\
         gid1=0+500"
    );
}

#[test]
fn right_to_left_mirroring() {
    let data = FontBuilder::new()
        .glyph('(', 1, 300)
        .glyph(')', 2, 310)
        .glyph('\u{05D0}', 3, 500)
        .build();

    assert_eq!(
        shape(&data, "(\u{05D0}", ""),
        "gid3=1+500|\
         gid2=0+310"
    );
    assert_eq!(
        shape(&data, "(\u{05D0}", "--direction=ltr"),
        "gid1=0+300|\
         gid3=1+500"
    );
}

#[test]
fn forced_direction_against_the_script() {
    assert_eq!(
        shape(&latin_font(), "ab", "--direction=rtl"),
        "gid2=1+600|\
         gid1=0+500"
    );
}

#[test]
fn default_ignorables_are_hidden() {
    let data = latin_font();
    assert_eq!(
        shape(&data, "a\u{200B}b", ""),
        "gid1=0+500|\
         gid3=1+0|\
         gid2=4+600"
    );
    assert_eq!(
        shape(&data, "a\u{200B}b", "--remove-default-ignorables"),
        "gid1=0+500|\
         gid2=4+600"
    );
}

#[test]
fn default_ignorables_are_deleted_without_a_space() {
    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 600)
        .build();

    assert_eq!(
        shape(&data, "a\u{200B}b", ""),
        "gid1=0+500|\
         gid2=4+600"
    );
}

#[test]
fn marks_join_the_base_cluster() {
    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('\u{0301}', 2, 0)
        .build();

    assert_eq!(
        shape(&data, "a\u{0301}a", ""),
        "gid1=0+500|\
         gid2=0+0|\
         gid1=3+500"
    );
    assert_eq!(
        shape(&data, "a\u{0301}a", "--cluster-level=2"),
        "gid1=0+500|\
         gid2=1+0|\
         gid1=3+500"
    );
}

#[test]
fn shape_plan_can_be_reused() {
    let data = latin_font();
    let face = Face::from_slice(&data, 0).unwrap();
    let plan = ShapePlan::new(&face, Direction::LeftToRight, None, None, &[]);

    for text in ["ab", "ba", "aab"] {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let with_plan = rustyshaper::shape_with_plan(&face, &plan, buffer);

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        let direct = rustyshaper::shape(&face, &[], buffer);

        assert_eq!(
            with_plan.serialize(&face, SerializeFlags::default()),
            direct.serialize(&face, SerializeFlags::default())
        );
    }
}

#[test]
fn plan_direction_wins_over_buffer() {
    let data = latin_font();
    let face = Face::from_slice(&data, 0).unwrap();
    let plan = ShapePlan::new(&face, Direction::RightToLeft, None, None, &[]);

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str("ab");
    buffer.set_direction(Direction::LeftToRight);
    let glyphs = rustyshaper::shape_with_plan(&face, &plan, buffer);

    let ids: Vec<u32> = glyphs.glyph_infos().iter().map(|i| i.glyph_id).collect();
    assert_eq!(ids, [2, 1]);
}

#[test]
fn glyph_buffer_can_be_cleared_and_reused() {
    let data = latin_font();
    let face = Face::from_slice(&data, 0).unwrap();

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str("ab");
    let glyphs = rustyshaper::shape(&face, &[], buffer);
    assert_eq!(glyphs.len(), 2);

    let mut buffer = glyphs.clear();
    assert!(buffer.is_empty());
    buffer.push_str("a");
    let glyphs = rustyshaper::shape(&face, &[], buffer);
    assert_eq!(glyphs.glyph_positions()[0].x_advance, 500);
}

#[test]
fn features_parse_from_strings() {
    let feature: Feature = "kern[1:3]=0".parse().unwrap();
    assert_eq!(feature.value, 0);
    assert_eq!((feature.start, feature.end), (1, 3));
    assert!("kern[".parse::<Feature>().is_err());
}

const TEXTS: &[&str] = &[
    "ab",
    "fi",
    "afi",
    "abfi\u{301}\u{323}",
    "a\u{301}\u{301}b\u{323}",
    "\u{301}fi\u{323}\u{301}",
    "aabbaabb",
];

/// A font that runs every kind of layout lookup on `TEXTS`.
fn layout_heavy_font() -> Vec<u8> {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[2]), 6)]);
    gsub.add_lookup(5, 0, vec![context_format3(&[&[1], &[2]], &[(1, 0)])]);
    gsub.add_lookup(4, 0, vec![ligature_subst(&[(3, &[(7, &[4])])])]);
    gsub.add_lookup(6, 0, vec![chain_context_format3(&[&[1]], &[&[3]], &[&[4]], &[(0, 2)])]);
    gsub.add_feature(b"calt", &[1]);
    gsub.add_feature(b"liga", &[2]);
    gsub.add_variation(&[(0, 0x2000, 0x4000)], &[(0, &[1, 3])]);

    let marks = [(5, 0, (100, 500)), (6, 1, (100, -50))];
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(
        4,
        0,
        vec![mark_base_pos(
            &marks,
            &[
                (1, &[(250, 600), (250, -20)]),
                (2, &[(250, 600), (250, -20)]),
                (8, &[(250, 600), (250, -20)]),
            ],
        )],
    );
    gpos.add_lookup(5, 0, vec![mark_lig_pos(&marks, &[(7, &[(150, 650), (500, 650)])])]);
    gpos.add_lookup(6, 0, vec![mark_mark_pos(&marks[..1], &[(5, &[(100, 900)])])]);
    gpos.add_lookup(
        3,
        0x0001,
        vec![cursive_pos(&[
            (1, Some((0, 0)), Some((500, 20))),
            (2, Some((0, 0)), Some((500, -20))),
        ])],
    );
    gpos.add_lookup(2, 0, vec![pair_pos_format1(&[(1, &[(2, -30), (8, -15)])])]);
    gpos.add_feature(b"curs", &[3]);
    gpos.add_feature(b"kern", &[4]);
    gpos.add_feature(b"mark", &[0, 1]);
    gpos.add_feature(b"mkmk", &[2]);

    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('f', 3, 400)
        .glyph('i', 4, 300)
        .glyph('\u{301}', 5, 0)
        .glyph('\u{323}', 6, 0)
        .glyph('\u{FB01}', 7, 700)
        .glyph('\u{E000}', 8, 500)
        .mark_glyph(5, 1)
        .mark_glyph(6, 2)
        .axis(b"wght", 100, 400, 900)
        .gsub(gsub.build(b"DFLT"))
        .gpos(gpos.build(b"DFLT"))
        .build()
}

/// Returns the byte ranges of the listed tables.
fn table_ranges(data: &[u8], tags: &[&[u8; 4]]) -> Vec<std::ops::Range<usize>> {
    let read_u32 = |at: usize| {
        u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]) as usize
    };

    let num_tables = usize::from(u16::from_be_bytes([data[4], data[5]]));
    (0..num_tables)
        .map(|i| 12 + i * 16)
        .filter(|&record| tags.iter().any(|tag| data[record..record + 4] == tag[..]))
        .map(|record| {
            let offset = read_u32(record + 8);
            offset..offset + read_u32(record + 12)
        })
        .collect()
}

/// xorshift32, so failures reproduce.
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        self.next() as usize % n
    }
}

fn shape_all(face: &Face) {
    for text in TEXTS {
        for direction in [Direction::LeftToRight, Direction::RightToLeft] {
            let mut buffer = UnicodeBuffer::new();
            buffer.push_str(text);
            buffer.set_direction(direction);
            let glyphs = rustyshaper::shape(face, &[], buffer);

            assert_eq!(glyphs.glyph_infos().len(), glyphs.glyph_positions().len());
            for info in glyphs.glyph_infos() {
                assert!((info.cluster as usize) < text.len(), "{:?}", text);
            }
        }
    }
}

#[test]
fn layout_heavy_font_applies_its_lookups() {
    let data = layout_heavy_font();
    // The context swaps b for the kerned alternate.
    assert_eq!(
        shape(&data, "ab", ""),
        "gid1=0+485|\
         gid8=1+500"
    );
    assert_eq!(shape(&data, "fi", ""), "gid7=0+700");
    assert_eq!(
        shape(&data, "b\u{301}", ""),
        "gid2=0+500|\
         gid5=0@-350,100+0"
    );
}

#[test]
fn mutated_layout_tables_do_not_panic() {
    let data = layout_heavy_font();
    let ranges = table_ranges(&data, &[b"GDEF", b"GSUB", b"GPOS"]);
    assert_eq!(ranges.len(), 3);

    let mut rng = Rng(0x9E37_79B9);
    for iteration in 0..2000 {
        let mut font = data.clone();
        for _ in 0..1 + rng.below(6) {
            let range = &ranges[rng.below(ranges.len())];
            let at = range.start + rng.below(range.len());
            font[at] = match rng.below(4) {
                0 => 0x00,
                1 => 0xFF,
                2 => font[at] ^ (1 << rng.below(8)),
                _ => rng.next() as u8,
            };
        }

        let mut face = match Face::from_slice(&font, 0) {
            Some(face) => face,
            None => continue,
        };

        if iteration % 2 == 1 {
            face.set_variations(&["wght=700".parse::<Variation>().unwrap()]);
        }

        shape_all(&face);
    }
}
