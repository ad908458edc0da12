use rustyshaper::{Face, Feature, SerializeFlags, Tag, UnicodeBuffer};

use crate::shape;
use crate::testing::*;

fn ligature_font() -> Vec<u8> {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(4, 0, vec![ligature_subst(&[(1, &[(3, &[2])])])]);
    gsub.add_feature(b"liga", &[0]);

    FontBuilder::new()
        .glyph('f', 1, 400)
        .glyph('i', 2, 300)
        .glyph('\u{FB01}', 3, 700)
        .gsub(gsub.build(b"DFLT"))
        .build()
}

#[test]
fn ligature_001() {
    assert_eq!(shape(&ligature_font(), "fi", ""), "gid3=0+700");
}

#[test]
fn ligature_002() {
    assert_eq!(
        shape(&ligature_font(), "fif", ""),
        "gid3=0+700|\
         gid1=2+400"
    );
}

#[test]
fn ligature_disabled_by_user_feature() {
    assert_eq!(
        shape(&ligature_font(), "fi", "--features=-liga"),
        "gid1=0+400|\
         gid2=1+300"
    );
}

#[test]
fn ligature_limited_to_cluster_range() {
    let data = ligature_font();
    let face = Face::from_slice(&data, 0).unwrap();

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str("fifi");
    let features = [Feature::new(Tag::from_bytes(b"liga"), 0, 0..2)];
    let glyphs = rustyshaper::shape(&face, &features, buffer);

    assert_eq!(
        glyphs.serialize(&face, SerializeFlags::default()),
        "gid1=0+400|\
         gid2=1+300|\
         gid3=2+700"
    );
}

#[test]
fn multiple_substitution_keeps_the_cluster() {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(2, 0, vec![multiple_subst(&[(1, &[2, 3])])]);
    gsub.add_feature(b"ccmp", &[0]);

    let data = FontBuilder::new()
        .glyph('\u{01C4}', 1, 1000)
        .glyph('D', 2, 600)
        .glyph('\u{017D}', 3, 500)
        .gsub(gsub.build(b"DFLT"))
        .build();

    assert_eq!(
        shape(&data, "\u{01C4}", ""),
        "gid2=0+600|\
         gid3=0+500"
    );
}

fn alternate_font() -> Vec<u8> {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(3, 0, vec![alternate_subst(&[(1, &[10, 11, 12])])]);
    gsub.add_feature(b"salt", &[0]);

    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('\u{E000}', 10, 510)
        .glyph('\u{E001}', 11, 520)
        .glyph('\u{E002}', 12, 530)
        .gsub(gsub.build(b"DFLT"))
        .build()
}

#[test]
fn alternate_by_feature_value() {
    let data = alternate_font();
    assert_eq!(shape(&data, "a", ""), "gid1=0+500");
    assert_eq!(shape(&data, "a", "--features=salt"), "gid10=0+510");
    assert_eq!(shape(&data, "a", "--features=salt=2"), "gid11=0+520");
    // Out of range values leave the glyph alone.
    assert_eq!(shape(&data, "a", "--features=salt=7"), "gid1=0+500");
}

fn chain_context_font() -> Vec<u8> {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(6, 0, vec![chain_context_format3(&[&[1]], &[&[2]], &[], &[(0, 1)])]);
    gsub.add_lookup(1, 0, vec![single_subst_format2(&coverage_format1(&[2]), &[3])]);
    gsub.add_feature(b"calt", &[0]);

    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('c', 3, 450)
        .gsub(gsub.build(b"DFLT"))
        .build()
}

#[test]
fn chain_context_001() {
    assert_eq!(
        shape(&chain_context_font(), "ab", ""),
        "gid1=0+500|\
         gid3=1+450"
    );
}

#[test]
fn chain_context_002() {
    // No backtrack match.
    assert_eq!(
        shape(&chain_context_font(), "bb", ""),
        "gid2=0+500|\
         gid2=1+500"
    );
}

#[test]
fn context_applies_nested_lookup_at_sequence_index() {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(5, 0, vec![context_format3(&[&[1], &[2]], &[(1, 1)])]);
    gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[2]), 1)]);
    gsub.add_feature(b"calt", &[0]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('c', 3, 450)
        .gsub(gsub.build(b"DFLT"))
        .build();

    assert_eq!(
        shape(&data, "abb", ""),
        "gid1=0+500|\
         gid3=1+450|\
         gid2=2+500"
    );
}

#[test]
fn nested_ligature_past_the_context_window() {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(5, 0, vec![context_format3(&[&[1]], &[(0, 1)])]);
    gsub.add_lookup(4, 0, vec![ligature_subst(&[(1, &[(9, &[2, 3])])])]);
    gsub.add_feature(b"calt", &[0]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('c', 3, 450)
        .glyph('\u{E000}', 9, 1200)
        .gsub(gsub.build(b"DFLT"))
        .build();

    // The window only covers `a`, the nested lookup eats `b` and `c` too.
    assert_eq!(shape(&data, "abc", ""), "gid9=0+1200");
    assert_eq!(
        shape(&data, "abca", ""),
        "gid9=0+1200|\
         gid1=3+500"
    );
}

#[test]
fn reverse_chain_with_lookahead() {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(
        8,
        0,
        vec![reverse_chain_single_subst(&coverage_format1(&[1]), &[], &[&[2]], &[3])],
    );
    gsub.add_feature(b"rlig", &[0]);

    let data = FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 500)
        .glyph('c', 3, 450)
        .gsub(gsub.build(b"DFLT"))
        .build();

    assert_eq!(
        shape(&data, "aab", ""),
        "gid1=0+500|\
         gid3=1+450|\
         gid2=2+500"
    );
}

#[test]
fn variation_selector_picks_variant_glyph() {
    let data = FontBuilder::new()
        .glyph('\u{2764}', 1, 800)
        .glyph('\u{E000}', 2, 900)
        .variation('\u{2764}', '\u{FE0F}', 2)
        .build();

    assert_eq!(shape(&data, "\u{2764}\u{FE0F}", ""), "gid2=0+900");
    assert_eq!(shape(&data, "\u{2764}", ""), "gid1=0+800");
}

fn variable_font() -> Vec<u8> {
    let mut gsub = LayoutBuilder::new();
    gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 1)]);
    gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 2)]);
    gsub.add_feature(b"liga", &[0]);
    // Weights from 650 up use the second lookup.
    gsub.add_variation(&[(0, 0x2000, 0x4000)], &[(0, &[1])]);

    FontBuilder::new()
        .glyph('a', 1, 500)
        .glyph('b', 2, 550)
        .glyph('c', 3, 600)
        .axis(b"wght", 100, 400, 900)
        .gsub(gsub.build(b"DFLT"))
        .build()
}

#[test]
fn feature_variation_by_axis_value() {
    let data = variable_font();
    assert_eq!(shape(&data, "a", ""), "gid2=0+550");
    assert_eq!(shape(&data, "a", "--variations=wght=400"), "gid2=0+550");
    assert_eq!(shape(&data, "a", "--variations=wght=500"), "gid2=0+550");
    assert_eq!(shape(&data, "a", "--variations=wght=700"), "gid3=0+600");
    assert_eq!(shape(&data, "a", "--variations=wght=900"), "gid3=0+600");
    assert_eq!(shape(&data, "a", "--variations=wght=2000"), "gid3=0+600");
    assert_eq!(shape(&data, "a", "--variations=opsz=700"), "gid2=0+550");
}
