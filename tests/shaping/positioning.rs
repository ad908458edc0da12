use crate::shape;
use crate::testing::*;

const RIGHT_TO_LEFT: u16 = 0x0001;
const IGNORE_MARKS: u16 = 0x0008;

fn single_pos_font(coverage: &[u16]) -> Vec<u8> {
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(
        1,
        IGNORE_MARKS,
        vec![single_pos_format1(&coverage_format1(coverage), 50)],
    );
    gpos.add_feature(b"kern", &[0]);

    FontBuilder::new()
        .glyph('A', 1, 500)
        .glyph('B', 2, 500)
        .glyph('C', 3, 500)
        .glyph('\u{0301}', 4, 0)
        .mark_glyph(4, 0)
        .gpos(gpos.build(b"DFLT"))
        .build()
}

#[test]
fn single_pos_skips_marks() {
    assert_eq!(
        shape(&single_pos_font(&[1, 2, 3]), "A\u{0301}B", ""),
        "gid1=0+550|\
         gid4=0+0|\
         gid2=3+550"
    );
}

#[test]
fn single_pos_ignores_covered_marks() {
    assert_eq!(
        shape(&single_pos_font(&[1, 2, 3, 4]), "A\u{0301}B", ""),
        "gid1=0+550|\
         gid4=0+0|\
         gid2=3+550"
    );
}

#[test]
fn single_pos_disabled() {
    assert_eq!(
        shape(&single_pos_font(&[1, 2, 3]), "AB", "--features=-kern"),
        "gid1=0+500|\
         gid2=1+500"
    );
}

fn pair_pos_font() -> Vec<u8> {
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(2, 0, vec![pair_pos_format1(&[(1, &[(2, -40)])])]);
    gpos.add_feature(b"kern", &[0]);

    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .gpos(gpos.build(b"DFLT"))
        .kern(&[(1, 2, -100)])
        .build()
}

#[test]
fn pair_pos_001() {
    assert_eq!(
        shape(&pair_pos_font(), "abba", ""),
        "gid1=0+460|\
         gid2=1+500|\
         gid2=2+500|\
         gid1=3+500"
    );
}

#[test]
fn pair_pos_sets_glyph_flags() {
    assert_eq!(
        shape(&pair_pos_font(), "ab", "--show-flags"),
        "gid1=0+460|\
         gid2=1+500#3"
    );
}

#[test]
fn kern_table_without_gpos() {
    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .kern(&[(1, 2, -50)])
        .build();

    assert_eq!(
        shape(&data, "ab", ""),
        "gid1=0+475|\
         gid2=1@-25,0+475"
    );
    assert_eq!(
        shape(&data, "ab", "--features=-kern"),
        "gid1=0+500|\
         gid2=1+500"
    );
}

#[test]
fn mark_to_base_001() {
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(
        4,
        0,
        vec![mark_base_pos(&[(3, 0, (50, 0))], &[(1, &[(300, 400)])])],
    );
    gpos.add_feature(b"mark", &[0]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('\u{0301}', 3, 100)
        .mark_glyph(3, 0)
        .gpos(gpos.build(b"DFLT"))
        .build();

    // The anchor difference is relative to the base origin.
    assert_eq!(
        shape(&data, "a\u{0301}", ""),
        "gid1=0+500|\
         gid3=0@-250,400+0"
    );

    // No base in coverage, so the mark stays put with its width zeroed.
    assert_eq!(
        shape(&data, "b\u{0301}", ""),
        "gid2=0+500|\
         gid3=0+0"
    );
}

#[test]
fn mark_to_ligature_component() {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(4, 0, vec![ligature_subst(&[(1, &[(10, &[2])])])]);
    gsub.add_feature(b"liga", &[0]);

    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(
        5,
        0,
        vec![mark_lig_pos(&[(3, 0, (0, 0))], &[(10, &[(100, 0), (400, 0)])])],
    );
    gpos.add_feature(b"mark", &[0]);

    let data = FontBuilder::new()
        .glyph('c', 1, 500)
        .glyph('v', 2, 500)
        .glyph('\u{0301}', 3, 0)
        .glyph('\u{E000}', 10, 1000)
        .mark_glyph(3, 0)
        .gsub(gsub.build(b"DFLT"))
        .gpos(gpos.build(b"DFLT"))
        .build();

    // A trailing mark lands on the last component.
    assert_eq!(
        shape(&data, "cv\u{0301}", ""),
        "gid10=0+1000|\
         gid3=0@-600,0+0"
    );
}

#[test]
fn mark_to_mark_001() {
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(4, 0, vec![mark_base_pos(&[(3, 0, (0, 0))], &[(1, &[(250, 500)])])]);
    gpos.add_lookup(6, 0, vec![mark_mark_pos(&[(4, 0, (0, 0))], &[(3, &[(0, 200)])])]);
    gpos.add_feature(b"mark", &[0]);
    gpos.add_feature(b"mkmk", &[1]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('\u{0301}', 3, 0)
        .glyph('\u{0302}', 4, 0)
        .mark_glyph(3, 0)
        .mark_glyph(4, 0)
        .gpos(gpos.build(b"DFLT"))
        .build();

    assert_eq!(
        shape(&data, "a\u{0301}\u{0302}", ""),
        "gid1=0+500|\
         gid3=0@-250,500+0|\
         gid4=0@-250,700+0"
    );
}

#[test]
fn marks_without_gpos_hang_over_the_base() {
    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('\u{0301}', 3, 200)
        .mark_glyph(3, 0)
        .build();

    assert_eq!(
        shape(&data, "a\u{0301}", ""),
        "gid1=0+500|\
         gid3=0@-200,0+0"
    );
}

#[test]
fn long_right_to_left_cursive_run() {
    let mut gpos = LayoutBuilder::new();
    gpos.add_lookup(3, RIGHT_TO_LEFT, vec![cursive_pos(&[(1, Some((0, 0)), Some((500, 10)))])]);
    gpos.add_feature(b"curs", &[0]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .gpos(gpos.build(b"DFLT"))
        .build();
    let face = rustyshaper::Face::from_slice(&data, 0).unwrap();

    let mut buffer = rustyshaper::UnicodeBuffer::new();
    buffer.push_str(&"a".repeat(20_000));
    let glyphs = rustyshaper::shape(&face, &[], buffer);

    assert_eq!(glyphs.len(), 20_000);
    assert!(glyphs.glyph_positions().iter().all(|pos| pos.x_advance == 500));
}
