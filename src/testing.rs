//! Builders for tiny in-memory fonts and layout subtables used by tests.
//!
//! Everything is written big-endian exactly as it would appear in a font
//! file, so the parsers see the same bytes they would see in the wild.

#![allow(dead_code)]

use alloc::vec::Vec;

/// A growable big-endian byte writer with offset patching.
#[derive(Default)]
struct Writer {
    data: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Writer::default()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn u16(&mut self, v: u16) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn i16(&mut self, v: i16) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn u24(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes()[1..]);
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.data.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn tag(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.data.extend_from_slice(tag);
        self
    }

    fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.data.extend_from_slice(data);
        self
    }

    /// Reserves a 16-bit offset and returns its position.
    fn offset16(&mut self) -> usize {
        let pos = self.len();
        self.u16(0);
        pos
    }

    fn offset32(&mut self) -> usize {
        let pos = self.len();
        self.u32(0);
        pos
    }

    /// Points a reserved 16-bit offset at the current end.
    fn patch16(&mut self, at: usize) {
        let value = self.len() as u16;
        self.data[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    fn patch32(&mut self, at: usize) {
        let value = self.len() as u32;
        self.data[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Appends a child table, pointing a reserved offset at it.
    fn child16(&mut self, at: usize, data: &[u8]) {
        self.patch16(at);
        self.bytes(data);
    }

    fn align4(&mut self) {
        while self.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

pub fn coverage_format1(glyphs: &[u16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1).u16(glyphs.len() as u16);
    for &glyph in glyphs {
        w.u16(glyph);
    }
    w.finish()
}

/// Ranges are `(start, end, start coverage index)`.
pub fn coverage_format2(ranges: &[(u16, u16, u16)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(2).u16(ranges.len() as u16);
    for &(start, end, index) in ranges {
        w.u16(start).u16(end).u16(index);
    }
    w.finish()
}

pub fn class_def_format1(start: u16, classes: &[u16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1).u16(start).u16(classes.len() as u16);
    for &class in classes {
        w.u16(class);
    }
    w.finish()
}

/// Ranges are `(start, end, class)`.
pub fn class_def_format2(ranges: &[(u16, u16, u16)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(2).u16(ranges.len() as u16);
    for &(start, end, class) in ranges {
        w.u16(start).u16(end).u16(class);
    }
    w.finish()
}

fn sorted_glyphs<T: Copy>(entries: &[(u16, T)]) -> Vec<(u16, T)> {
    let mut entries = entries.to_vec();
    entries.sort_by_key(|entry| entry.0);
    entries
}

// GSUB

pub fn single_subst_format1(coverage: &[u8], delta: i16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.i16(delta);
    w.child16(cov, coverage);
    w.finish()
}

pub fn single_subst_format2(coverage: &[u8], substitutes: &[u16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(2);
    let cov = w.offset16();
    w.u16(substitutes.len() as u16);
    for &glyph in substitutes {
        w.u16(glyph);
    }
    w.child16(cov, coverage);
    w.finish()
}

/// A format 1 subtable with a coverage and an array of glyph sequences.
/// Used by both multiple and alternate substitutions.
fn sequence_subst(entries: &[(u16, &[u16])]) -> Vec<u8> {
    let entries = sorted_glyphs(entries);
    let first: Vec<u16> = entries.iter().map(|e| e.0).collect();

    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(entries.len() as u16);
    let offsets: Vec<usize> = entries.iter().map(|_| w.offset16()).collect();

    for (slot, (_, glyphs)) in offsets.into_iter().zip(&entries) {
        w.patch16(slot);
        w.u16(glyphs.len() as u16);
        for &glyph in glyphs.iter() {
            w.u16(glyph);
        }
    }

    w.child16(cov, &coverage_format1(&first));
    w.finish()
}

pub fn multiple_subst(entries: &[(u16, &[u16])]) -> Vec<u8> {
    sequence_subst(entries)
}

pub fn alternate_subst(entries: &[(u16, &[u16])]) -> Vec<u8> {
    sequence_subst(entries)
}

/// Entries are `(first glyph, [(ligature, remaining components)])`.
pub fn ligature_subst(entries: &[(u16, &[(u16, &[u16])])]) -> Vec<u8> {
    let entries = sorted_glyphs(entries);
    let first: Vec<u16> = entries.iter().map(|e| e.0).collect();

    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(entries.len() as u16);
    let offsets: Vec<usize> = entries.iter().map(|_| w.offset16()).collect();

    for (slot, (_, ligatures)) in offsets.into_iter().zip(&entries) {
        let mut set = Writer::new();
        set.u16(ligatures.len() as u16);
        let lig_offsets: Vec<usize> = ligatures.iter().map(|_| set.offset16()).collect();
        for (lig_slot, &(glyph, rest)) in lig_offsets.into_iter().zip(ligatures.iter()) {
            set.patch16(lig_slot);
            set.u16(glyph).u16(rest.len() as u16 + 1);
            for &component in rest {
                set.u16(component);
            }
        }

        w.child16(slot, &set.finish());
    }

    w.child16(cov, &coverage_format1(&first));
    w.finish()
}

/// Backtrack and lookahead are lists of glyph sets, one coverage each.
pub fn reverse_chain_single_subst(
    coverage: &[u8],
    backtrack: &[&[u16]],
    lookahead: &[&[u16]],
    substitutes: &[u16],
) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(backtrack.len() as u16);
    let backtrack_slots: Vec<usize> = backtrack.iter().map(|_| w.offset16()).collect();
    w.u16(lookahead.len() as u16);
    let lookahead_slots: Vec<usize> = lookahead.iter().map(|_| w.offset16()).collect();
    w.u16(substitutes.len() as u16);
    for &glyph in substitutes {
        w.u16(glyph);
    }

    w.child16(cov, coverage);
    for (slot, glyphs) in backtrack_slots.into_iter().zip(backtrack) {
        w.child16(slot, &coverage_format1(glyphs));
    }
    for (slot, glyphs) in lookahead_slots.into_iter().zip(lookahead) {
        w.child16(slot, &coverage_format1(glyphs));
    }
    w.finish()
}

pub fn extension_subtable(kind: u16, subtable: &[u8]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1).u16(kind);
    let offset = w.offset32();
    w.patch32(offset);
    w.bytes(subtable);
    w.finish()
}

// Contextual lookups, shared by GSUB and GPOS.

/// A format 3 context: one coverage per input position.
pub fn context_format3(input: &[&[u16]], records: &[(u16, u16)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(3).u16(input.len() as u16).u16(records.len() as u16);
    let slots: Vec<usize> = input.iter().map(|_| w.offset16()).collect();
    for &(sequence_index, lookup_index) in records {
        w.u16(sequence_index).u16(lookup_index);
    }
    for (slot, glyphs) in slots.into_iter().zip(input) {
        w.child16(slot, &coverage_format1(glyphs));
    }
    w.finish()
}

/// A format 3 chained context: one coverage per position.
pub fn chain_context_format3(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    records: &[(u16, u16)],
) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(3);
    let mut slots = Vec::new();
    for sequence in [backtrack, input, lookahead] {
        w.u16(sequence.len() as u16);
        for glyphs in sequence {
            slots.push((w.offset16(), *glyphs));
        }
    }
    w.u16(records.len() as u16);
    for &(sequence_index, lookup_index) in records {
        w.u16(sequence_index).u16(lookup_index);
    }
    for (slot, glyphs) in slots {
        w.child16(slot, &coverage_format1(glyphs));
    }
    w.finish()
}

// GPOS

/// Value format with only the horizontal advance.
const X_ADVANCE: u16 = 0x0004;

pub fn single_pos_format1(coverage: &[u8], x_advance: i16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(X_ADVANCE).i16(x_advance);
    w.child16(cov, coverage);
    w.finish()
}

pub fn single_pos_format2(coverage: &[u8], x_advances: &[i16]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(2);
    let cov = w.offset16();
    w.u16(X_ADVANCE).u16(x_advances.len() as u16);
    for &value in x_advances {
        w.i16(value);
    }
    w.child16(cov, coverage);
    w.finish()
}

/// Entries are `(first, [(second, first glyph x advance)])`.
pub fn pair_pos_format1(entries: &[(u16, &[(u16, i16)])]) -> Vec<u8> {
    let entries = sorted_glyphs(entries);
    let first: Vec<u16> = entries.iter().map(|e| e.0).collect();

    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(X_ADVANCE).u16(0).u16(entries.len() as u16);
    let slots: Vec<usize> = entries.iter().map(|_| w.offset16()).collect();

    for (slot, (_, pairs)) in slots.into_iter().zip(&entries) {
        let pairs = sorted_glyphs(pairs);
        w.patch16(slot);
        w.u16(pairs.len() as u16);
        for (second, value) in pairs {
            w.u16(second).i16(value);
        }
    }

    w.child16(cov, &coverage_format1(&first));
    w.finish()
}

fn anchor(x: i16, y: i16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1).i16(x).i16(y);
    w.finish()
}

/// Marks are `(glyph, class, anchor)`, already sorted by glyph.
fn mark_array(marks: &[(u16, u16, (i16, i16))]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(marks.len() as u16);
    let mut slots = Vec::new();
    for &(_, class, _) in marks {
        w.u16(class);
        slots.push(w.offset16());
    }
    for (slot, &(_, _, (x, y))) in slots.into_iter().zip(marks) {
        w.child16(slot, &anchor(x, y));
    }
    w.finish()
}

/// A row-major matrix of optional anchors.
fn anchor_matrix(rows: &[Vec<Option<(i16, i16)>>], cols: u16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(rows.len() as u16);
    let mut slots = Vec::new();
    for row in rows {
        for col in 0..usize::from(cols) {
            match row.get(col).copied().flatten() {
                Some(point) => slots.push((w.offset16(), point)),
                None => {
                    w.u16(0);
                }
            }
        }
    }
    for (slot, (x, y)) in slots {
        w.child16(slot, &anchor(x, y));
    }
    w.finish()
}

fn mark_attachment(
    marks: &[(u16, u16, (i16, i16))],
    bases: &[(u16, &[(i16, i16)])],
) -> Vec<u8> {
    let mut marks = marks.to_vec();
    marks.sort_by_key(|m| m.0);
    let bases = sorted_glyphs(bases);

    let class_count = marks
        .iter()
        .map(|m| m.1 + 1)
        .chain(bases.iter().map(|b| b.1.len() as u16))
        .max()
        .unwrap_or(0);

    let mark_glyphs: Vec<u16> = marks.iter().map(|m| m.0).collect();
    let base_glyphs: Vec<u16> = bases.iter().map(|b| b.0).collect();
    let rows: Vec<Vec<Option<(i16, i16)>>> = bases
        .iter()
        .map(|(_, anchors)| anchors.iter().copied().map(Some).collect())
        .collect();

    let mut w = Writer::new();
    w.u16(1);
    let mark_cov = w.offset16();
    let base_cov = w.offset16();
    w.u16(class_count);
    let mark_arr = w.offset16();
    let base_arr = w.offset16();

    w.child16(mark_cov, &coverage_format1(&mark_glyphs));
    w.child16(base_cov, &coverage_format1(&base_glyphs));
    w.child16(mark_arr, &mark_array(&marks));
    w.child16(base_arr, &anchor_matrix(&rows, class_count));
    w.finish()
}

/// Marks are `(glyph, class, anchor)`; bases are `(glyph, anchor per class)`.
pub fn mark_base_pos(
    marks: &[(u16, u16, (i16, i16))],
    bases: &[(u16, &[(i16, i16)])],
) -> Vec<u8> {
    mark_attachment(marks, bases)
}

/// Same layout as [`mark_base_pos`], with the second list holding mark1 glyphs.
pub fn mark_mark_pos(
    marks: &[(u16, u16, (i16, i16))],
    bases: &[(u16, &[(i16, i16)])],
) -> Vec<u8> {
    mark_attachment(marks, bases)
}

/// Ligatures are `(glyph, anchor per component)`. A component anchor is
/// used for every mark class.
pub fn mark_lig_pos(
    marks: &[(u16, u16, (i16, i16))],
    ligatures: &[(u16, &[(i16, i16)])],
) -> Vec<u8> {
    let mut marks = marks.to_vec();
    marks.sort_by_key(|m| m.0);
    let ligatures = sorted_glyphs(ligatures);

    let class_count = marks.iter().map(|m| m.1 + 1).max().unwrap_or(1);
    let mark_glyphs: Vec<u16> = marks.iter().map(|m| m.0).collect();
    let lig_glyphs: Vec<u16> = ligatures.iter().map(|l| l.0).collect();

    let mut array = Writer::new();
    array.u16(ligatures.len() as u16);
    let slots: Vec<usize> = ligatures.iter().map(|_| array.offset16()).collect();
    for (slot, (_, components)) in slots.into_iter().zip(&ligatures) {
        let rows: Vec<Vec<Option<(i16, i16)>>> = components
            .iter()
            .map(|&point| vec![Some(point); usize::from(class_count)])
            .collect();
        array.child16(slot, &anchor_matrix(&rows, class_count));
    }

    let mut w = Writer::new();
    w.u16(1);
    let mark_cov = w.offset16();
    let lig_cov = w.offset16();
    w.u16(class_count);
    let mark_arr = w.offset16();
    let lig_arr = w.offset16();

    w.child16(mark_cov, &coverage_format1(&mark_glyphs));
    w.child16(lig_cov, &coverage_format1(&lig_glyphs));
    w.child16(mark_arr, &mark_array(&marks));
    w.child16(lig_arr, &array.finish());
    w.finish()
}

/// Entries are `(glyph, entry anchor, exit anchor)`.
pub fn cursive_pos(entries: &[(u16, Option<(i16, i16)>, Option<(i16, i16)>)]) -> Vec<u8> {
    let mut entries = entries.to_vec();
    entries.sort_by_key(|e| e.0);
    let glyphs: Vec<u16> = entries.iter().map(|e| e.0).collect();

    let mut w = Writer::new();
    w.u16(1);
    let cov = w.offset16();
    w.u16(entries.len() as u16);
    let mut slots = Vec::new();
    for &(_, entry, exit) in &entries {
        for point in [entry, exit] {
            match point {
                Some(point) => slots.push((w.offset16(), point)),
                None => {
                    w.u16(0);
                }
            }
        }
    }

    w.child16(cov, &coverage_format1(&glyphs));
    for (slot, (x, y)) in slots {
        w.child16(slot, &anchor(x, y));
    }
    w.finish()
}

/// Builds a GSUB or GPOS table with a single script whose default
/// language system enables every feature.
#[derive(Default)]
pub struct LayoutBuilder {
    lookups: Vec<(u16, u16, Vec<Vec<u8>>)>,
    features: Vec<([u8; 4], Vec<u16>)>,
    variations: Vec<(Vec<(u16, i16, i16)>, Vec<(u16, Vec<u16>)>)>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        LayoutBuilder::default()
    }

    /// Adds a lookup and returns its index.
    pub fn add_lookup(&mut self, kind: u16, flags: u16, subtables: Vec<Vec<u8>>) -> u16 {
        self.lookups.push((kind, flags, subtables));
        self.lookups.len() as u16 - 1
    }

    /// Adds a feature. Features keep their insertion order.
    pub fn add_feature(&mut self, tag: &[u8; 4], lookups: &[u16]) -> u16 {
        self.features.push((*tag, lookups.to_vec()));
        self.features.len() as u16 - 1
    }

    /// Adds a feature variation record.
    ///
    /// Conditions are `(axis, min, max)` ranges in F2Dot14 units. When all
    /// of them hold, each `(feature, lookups)` pair replaces the lookups of
    /// that feature. Records are matched in insertion order.
    pub fn add_variation(
        &mut self,
        conditions: &[(u16, i16, i16)],
        substitutions: &[(u16, &[u16])],
    ) {
        let mut substitutions: Vec<(u16, Vec<u16>)> = substitutions
            .iter()
            .map(|&(feature, lookups)| (feature, lookups.to_vec()))
            .collect();
        substitutions.sort_by_key(|s| s.0);
        self.variations.push((conditions.to_vec(), substitutions));
    }

    pub fn build(&self, script: &[u8; 4]) -> Vec<u8> {
        let mut w = Writer::new();
        let has_variations = !self.variations.is_empty();
        w.u16(1).u16(u16::from(has_variations));
        let script_list = w.offset16();
        let feature_list = w.offset16();
        let lookup_list = w.offset16();
        let variations = if has_variations { Some(w.offset32()) } else { None };

        w.child16(script_list, &self.script_list(script));
        w.child16(feature_list, &self.feature_list());
        w.child16(lookup_list, &self.lookup_list());
        if let Some(slot) = variations {
            w.patch32(slot);
            w.bytes(&self.feature_variations());
        }
        w.finish()
    }

    fn script_list(&self, tag: &[u8; 4]) -> Vec<u8> {
        let mut lang_sys = Writer::new();
        lang_sys.u16(0).u16(0xFFFF).u16(self.features.len() as u16);
        for index in 0..self.features.len() {
            lang_sys.u16(index as u16);
        }

        let mut script = Writer::new();
        let default = script.offset16();
        script.u16(0);
        script.child16(default, &lang_sys.finish());

        let mut w = Writer::new();
        w.u16(1).tag(tag);
        let slot = w.offset16();
        w.child16(slot, &script.finish());
        w.finish()
    }

    fn feature_list(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16(self.features.len() as u16);
        let mut slots = Vec::new();
        for (tag, _) in &self.features {
            w.tag(tag);
            slots.push(w.offset16());
        }

        for (slot, (_, lookups)) in slots.into_iter().zip(&self.features) {
            w.patch16(slot);
            w.u16(0).u16(lookups.len() as u16);
            for &index in lookups {
                w.u16(index);
            }
        }
        w.finish()
    }

    fn lookup_list(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16(self.lookups.len() as u16);
        let slots: Vec<usize> = self.lookups.iter().map(|_| w.offset16()).collect();

        for (slot, (kind, flags, subtables)) in slots.into_iter().zip(&self.lookups) {
            let mut lookup = Writer::new();
            lookup.u16(*kind).u16(*flags).u16(subtables.len() as u16);
            let offsets: Vec<usize> = subtables.iter().map(|_| lookup.offset16()).collect();
            if flags & 0x0010 != 0 {
                // Mark filtering set.
                lookup.u16(0);
            }
            for (offset, subtable) in offsets.into_iter().zip(subtables) {
                lookup.child16(offset, subtable);
            }
            w.child16(slot, &lookup.finish());
        }
        w.finish()
    }

    fn feature_variations(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u16(1).u16(0).u32(self.variations.len() as u32);
        let slots: Vec<(usize, usize)> = self
            .variations
            .iter()
            .map(|_| (w.offset32(), w.offset32()))
            .collect();

        for ((conditions_slot, substitutions_slot), (conditions, substitutions)) in
            slots.into_iter().zip(&self.variations)
        {
            w.patch32(conditions_slot);
            w.bytes(&condition_set(conditions));
            w.patch32(substitutions_slot);
            w.bytes(&feature_substitution(substitutions));
        }
        w.finish()
    }
}

fn condition_set(conditions: &[(u16, i16, i16)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(conditions.len() as u16);
    let slots: Vec<usize> = conditions.iter().map(|_| w.offset32()).collect();
    for (slot, &(axis, min, max)) in slots.into_iter().zip(conditions) {
        w.patch32(slot);
        w.u16(1).u16(axis).i16(min).i16(max);
    }
    w.finish()
}

fn feature_substitution(substitutions: &[(u16, Vec<u16>)]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(1).u16(0).u16(substitutions.len() as u16);
    let slots: Vec<usize> = substitutions
        .iter()
        .map(|(feature, _)| {
            w.u16(*feature);
            w.offset32()
        })
        .collect();

    for (slot, (_, lookups)) in slots.into_iter().zip(substitutions) {
        w.patch32(slot);
        w.u16(0).u16(lookups.len() as u16);
        for &index in lookups {
            w.u16(index);
        }
    }
    w.finish()
}

/// Builds a minimal TrueType font: a cmap, horizontal metrics and
/// optional layout tables. Units per em is 1000.
#[derive(Default)]
pub struct FontBuilder {
    glyphs: Vec<(char, u16, u16)>,
    marks: Vec<(u16, u16)>,
    variations: Vec<(char, char, u16)>,
    gsub: Option<Vec<u8>>,
    gpos: Option<Vec<u8>>,
    kern: Option<Vec<(u16, u16, i16)>>,
    axes: Vec<([u8; 4], i16, i16, i16)>,
}

impl FontBuilder {
    pub fn new() -> Self {
        FontBuilder::default()
    }

    /// Maps a character to a glyph with the given advance.
    pub fn glyph(mut self, c: char, glyph: u16, advance: u16) -> Self {
        self.glyphs.push((c, glyph, advance));
        self
    }

    /// Marks a glyph as a mark with the given attachment class.
    /// Forces a GDEF table.
    pub fn mark_glyph(mut self, glyph: u16, class: u16) -> Self {
        self.marks.push((glyph, class));
        self
    }

    /// Maps a base character and a variation selector to a glyph.
    pub fn variation(mut self, c: char, selector: char, glyph: u16) -> Self {
        self.variations.push((c, selector, glyph));
        self
    }

    pub fn gsub(mut self, data: Vec<u8>) -> Self {
        self.gsub = Some(data);
        self
    }

    pub fn gpos(mut self, data: Vec<u8>) -> Self {
        self.gpos = Some(data);
        self
    }

    /// Adds a horizontal format 0 `kern` table.
    pub fn kern(mut self, pairs: &[(u16, u16, i16)]) -> Self {
        self.kern = Some(pairs.to_vec());
        self
    }

    /// Adds a variation axis with integer min, default and max values.
    /// Forces an `fvar` table.
    pub fn axis(mut self, tag: &[u8; 4], min: i16, default: i16, max: i16) -> Self {
        self.axes.push((*tag, min, default, max));
        self
    }

    fn num_glyphs(&self) -> u16 {
        let max = self
            .glyphs
            .iter()
            .map(|g| g.1)
            .chain(self.marks.iter().map(|m| m.0))
            .chain(self.variations.iter().map(|v| v.2))
            .max()
            .unwrap_or(0);
        max + 1
    }

    pub fn build(self) -> Vec<u8> {
        let num_glyphs = self.num_glyphs();

        let mut tables: Vec<([u8; 4], Vec<u8>)> = vec![
            (*b"head", head()),
            (*b"hhea", hhea(num_glyphs)),
            (*b"maxp", maxp(num_glyphs)),
            (*b"hmtx", self.hmtx(num_glyphs)),
            (*b"cmap", self.cmap()),
        ];

        if !self.marks.is_empty() {
            tables.push((*b"GDEF", self.gdef()));
        }
        if let Some(ref data) = self.gsub {
            tables.push((*b"GSUB", data.clone()));
        }
        if let Some(ref data) = self.gpos {
            tables.push((*b"GPOS", data.clone()));
        }
        if let Some(ref pairs) = self.kern {
            tables.push((*b"kern", kern(pairs)));
        }
        if !self.axes.is_empty() {
            tables.push((*b"fvar", fvar(&self.axes)));
        }

        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut w = Writer::new();
        w.u32(0x00010000).u16(tables.len() as u16);
        // Search fields are not used by the parser.
        w.u16(0).u16(0).u16(0);

        let mut slots = Vec::new();
        for (tag, data) in &tables {
            w.tag(tag).u32(0);
            slots.push(w.offset32());
            w.u32(data.len() as u32);
        }

        for (slot, (_, data)) in slots.into_iter().zip(&tables) {
            w.align4();
            w.patch32(slot);
            w.bytes(data);
        }
        w.align4();
        w.finish()
    }

    fn hmtx(&self, num_glyphs: u16) -> Vec<u8> {
        let mut w = Writer::new();
        for glyph in 0..num_glyphs {
            let advance = self
                .glyphs
                .iter()
                .find(|g| g.1 == glyph)
                .map_or(0, |g| g.2);
            w.u16(advance).i16(0);
        }
        w.finish()
    }

    fn cmap(&self) -> Vec<u8> {
        let mut glyphs = self.glyphs.clone();
        glyphs.sort_by_key(|g| g.0);

        // Windows, Unicode full repertoire, format 12.
        let mut full = Writer::new();
        full.u16(12).u16(0);
        let length = full.offset32();
        full.u32(0).u32(glyphs.len() as u32);
        for &(c, glyph, _) in &glyphs {
            full.u32(c as u32).u32(c as u32).u32(u32::from(glyph));
        }
        let size = full.len() as u32;
        full.data[length..length + 4].copy_from_slice(&size.to_be_bytes());
        let full = full.finish();

        let mut records: Vec<(u16, u16, Vec<u8>)> = vec![(3, 10, full)];
        if !self.variations.is_empty() {
            records.insert(0, (0, 5, self.variation_subtable()));
        }

        let mut w = Writer::new();
        w.u16(0).u16(records.len() as u16);
        let mut slots = Vec::new();
        for (platform, encoding, _) in &records {
            w.u16(*platform).u16(*encoding);
            slots.push(w.offset32());
        }
        for (slot, (_, _, data)) in slots.into_iter().zip(&records) {
            w.patch32(slot);
            w.bytes(data);
        }
        w.finish()
    }

    /// A format 14 subtable with non-default mappings only.
    fn variation_subtable(&self) -> Vec<u8> {
        let mut selectors: Vec<char> = self.variations.iter().map(|v| v.1).collect();
        selectors.sort();
        selectors.dedup();

        let mut w = Writer::new();
        w.u16(14);
        let length = w.offset32();
        w.u32(selectors.len() as u32);
        let mut slots = Vec::new();
        for &selector in &selectors {
            w.u24(selector as u32).u32(0);
            slots.push((w.offset32(), selector));
        }

        for (slot, selector) in slots {
            let mut mappings: Vec<(char, u16)> = self
                .variations
                .iter()
                .filter(|v| v.1 == selector)
                .map(|v| (v.0, v.2))
                .collect();
            mappings.sort_by_key(|m| m.0);

            w.patch32(slot);
            w.u32(mappings.len() as u32);
            for (c, glyph) in mappings {
                w.u24(c as u32).u16(glyph);
            }
        }

        let size = w.len() as u32;
        w.data[length..length + 4].copy_from_slice(&size.to_be_bytes());
        w.finish()
    }

    fn gdef(&self) -> Vec<u8> {
        let mut classes: Vec<(u16, u16)> = self
            .glyphs
            .iter()
            .map(|g| (g.1, 1))
            .filter(|g| g.0 != 0)
            .collect();
        for &(glyph, _) in &self.marks {
            classes.retain(|c| c.0 != glyph);
            classes.push((glyph, 3));
        }
        classes.sort_by_key(|c| c.0);
        classes.dedup_by_key(|c| c.0);
        let class_ranges: Vec<(u16, u16, u16)> =
            classes.iter().map(|&(g, class)| (g, g, class)).collect();

        let mut marks = self.marks.clone();
        marks.sort_by_key(|m| m.0);
        let mark_ranges: Vec<(u16, u16, u16)> =
            marks.iter().map(|&(g, class)| (g, g, class)).collect();

        let mut w = Writer::new();
        w.u16(1).u16(0);
        let glyph_classes = w.offset16();
        w.u16(0).u16(0);
        let mark_classes = w.offset16();

        w.child16(glyph_classes, &class_def_format2(&class_ranges));
        w.child16(mark_classes, &class_def_format2(&mark_ranges));
        w.finish()
    }
}

fn head() -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(0x00010000) // version
        .u32(0x00010000) // revision
        .u32(0) // checksum adjustment
        .u32(0x5F0F3CF5) // magic
        .u16(0) // flags
        .u16(1000) // units per em
        .u32(0)
        .u32(0) // created
        .u32(0)
        .u32(0) // modified
        .i16(0)
        .i16(-200)
        .i16(1000)
        .i16(800) // bbox
        .u16(0) // mac style
        .u16(8) // lowest ppem
        .i16(2) // direction hint
        .i16(0) // index to loc format
        .i16(0); // glyph data format
    w.finish()
}

fn hhea(num_metrics: u16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(0x00010000).i16(800).i16(-200).i16(0).u16(1000);
    w.i16(0).i16(0).i16(1000); // min lsb, min rsb, max extent
    w.i16(1).i16(0).i16(0); // caret
    w.bytes(&[0; 8]); // reserved
    w.i16(0); // metric data format
    w.u16(num_metrics);
    w.finish()
}

fn maxp(num_glyphs: u16) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(0x00005000).u16(num_glyphs);
    w.finish()
}

fn fvar(axes: &[([u8; 4], i16, i16, i16)]) -> Vec<u8> {
    // 16.16 fixed.
    let fixed = |v: i16| (i32::from(v) << 16) as u32;

    let mut w = Writer::new();
    w.u32(0x00010000).u16(16).u16(2);
    // Axis count and size, no named instances.
    w.u16(axes.len() as u16).u16(20).u16(0).u16(0);
    for &(tag, min, default, max) in axes {
        w.tag(&tag).u32(fixed(min)).u32(fixed(default)).u32(fixed(max));
        w.u16(0).u16(256);
    }
    w.finish()
}

fn kern(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
    let mut pairs = pairs.to_vec();
    pairs.sort_by_key(|p| (p.0, p.1));

    let mut w = Writer::new();
    w.u16(0).u16(1);
    // Subtable header: version, length, coverage (format 0, horizontal).
    w.u16(0).u16(6 + 8 + 6 * pairs.len() as u16).u16(0x0001);
    w.u16(pairs.len() as u16).u16(0).u16(0).u16(0);
    for (left, right, value) in pairs {
        w.u16(left).u16(right).i16(value);
    }
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_tables_are_sorted_and_aligned() {
        let data = FontBuilder::new()
            .glyph('a', 1, 500)
            .mark_glyph(2, 1)
            .kern(&[(1, 2, -10)])
            .build();

        let num_tables = u16::from_be_bytes([data[4], data[5]]);
        assert_eq!(num_tables, 7);

        let mut prev = [0u8; 4];
        for i in 0..usize::from(num_tables) {
            let record = &data[12 + i * 16..12 + (i + 1) * 16];
            let tag = [record[0], record[1], record[2], record[3]];
            assert!(tag > prev);
            prev = tag;
            let offset = u32::from_be_bytes([record[8], record[9], record[10], record[11]]);
            assert_eq!(offset % 4, 0);
        }
    }

    #[test]
    fn lookup_offsets_point_past_the_header() {
        let mut builder = LayoutBuilder::new();
        builder.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 1)]);
        builder.add_feature(b"liga", &[0]);
        let data = builder.build(b"latn");
        let lookup_list = usize::from(u16::from_be_bytes([data[8], data[9]]));
        assert!(lookup_list > 10 && lookup_list < data.len());
    }
}
