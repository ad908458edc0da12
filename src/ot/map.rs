//! Feature-to-lookup mapping and mask allocation.

use alloc::vec::Vec;

use super::{LayoutTableExt, TableIndex};
use crate::buffer::{glyph_flag, Buffer};
use crate::plan::ShapePlan;
use crate::tables::gsubgpos::{FeatureIndex, LangIndex, LookupIndex, ScriptIndex, VariationIndex};
use crate::tag::tags_from_script_and_language;
use crate::{Face, Language, Mask, Script, Tag};

/// A callback run between two stages of lookups.
///
/// Returns `true` when it changed the glyphs in the buffer.
pub type PauseFunc = fn(&ShapePlan, &Face, &mut Buffer) -> bool;

/// A compiled feature map.
///
/// Knows which lookups to apply, in which stage and with which mask.
#[derive(Clone, Debug)]
pub struct Map {
    chosen_script: [Option<Tag>; 2],
    found_script: [bool; 2],
    global_mask: Mask,
    features: Vec<FeatureMap>,
    // Feature tag to its position in `features`.
    feature_indices: crate::map::Map,
    lookups: [Vec<LookupMap>; 2],
    stages: [Vec<StageMap>; 2],
}

#[derive(Clone, Copy, Debug)]
pub struct FeatureMap {
    tag: Tag,
    // GSUB/GPOS
    index: [Option<FeatureIndex>; 2],
    stage: [usize; 2],
    shift: u32,
    mask: Mask,
    // mask for value=1, for quick access
    one_mask: Mask,
    auto_zwnj: bool,
    auto_zwj: bool,
    random: bool,
    per_syllable: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupMap {
    pub index: LookupIndex,
    pub mask: Mask,
    pub auto_zwnj: bool,
    pub auto_zwj: bool,
    pub random: bool,
    pub per_syllable: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct StageMap {
    // Cumulative
    pub last_lookup: usize,
    pub pause_func: Option<PauseFunc>,
}

impl Map {
    pub const MAX_BITS: u32 = 8;
    pub const MAX_VALUE: u32 = (1 << Self::MAX_BITS) - 1;

    #[inline]
    pub fn global_mask(&self) -> Mask {
        self.global_mask
    }

    /// Returns the mask of a feature and the shift of its value inside the mask.
    ///
    /// `(0, 0)` for features that got no bits.
    #[inline]
    pub fn get_mask(&self, feature_tag: Tag) -> (Mask, u32) {
        self.get_feature(feature_tag)
            .map_or((0, 0), |info| (info.mask, info.shift))
    }

    /// Returns the mask that enables a feature with the value 1.
    #[inline]
    pub fn get_1_mask(&self, feature_tag: Tag) -> Mask {
        self.get_feature(feature_tag).map_or(0, |info| info.one_mask)
    }

    #[inline]
    pub fn get_feature_index(&self, table_index: TableIndex, feature_tag: Tag) -> Option<FeatureIndex> {
        self.get_feature(feature_tag)?.index[table_index]
    }

    #[inline]
    pub fn get_feature_stage(&self, table_index: TableIndex, feature_tag: Tag) -> Option<usize> {
        self.get_feature(feature_tag).map(|info| info.stage[table_index])
    }

    #[inline]
    pub fn chosen_script(&self, table_index: TableIndex) -> Option<Tag> {
        self.chosen_script[table_index]
    }

    #[inline]
    pub fn found_script(&self, table_index: TableIndex) -> bool {
        self.found_script[table_index]
    }

    #[inline]
    pub fn stages(&self, table_index: TableIndex) -> &[StageMap] {
        &self.stages[table_index]
    }

    #[inline]
    pub fn lookups(&self, table_index: TableIndex) -> &[LookupMap] {
        &self.lookups[table_index]
    }

    /// Returns the lookups of a single stage.
    pub fn stage_lookups(&self, table_index: TableIndex, stage: usize) -> &[LookupMap] {
        let stages = &self.stages[table_index];
        let lookups = &self.lookups[table_index];

        let start = stage
            .checked_sub(1)
            .and_then(|prev| stages.get(prev))
            .map_or(0, |prev| prev.last_lookup);

        let end = stages
            .get(stage)
            .map_or(lookups.len(), |stage| stage.last_lookup);

        lookups.get(start..end).unwrap_or(&[])
    }

    fn get_feature(&self, feature_tag: Tag) -> Option<&FeatureMap> {
        let idx = self.feature_indices.get(feature_tag.0)?;
        self.features.get(idx as usize)
    }
}

bitflags::bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FeatureFlags: u32 {
        /// Feature applies to all characters; results in no mask allocated for it.
        const GLOBAL = 0x01;
        /// Has fallback implementation, so include mask bit even if feature not found.
        const HAS_FALLBACK = 0x02;
        /// Don't skip over ZWNJ when matching **context**.
        const MANUAL_ZWNJ = 0x04;
        /// Don't skip over ZWJ when matching **input**.
        const MANUAL_ZWJ = 0x08;
        const MANUAL_JOINERS = Self::MANUAL_ZWNJ.bits() | Self::MANUAL_ZWJ.bits();
        const GLOBAL_MANUAL_JOINERS = Self::GLOBAL.bits() | Self::MANUAL_JOINERS.bits();
        /// If feature not found in LangSys, look for it in global feature list and pick one.
        const GLOBAL_SEARCH = 0x10;
        /// Randomly select a glyph from an AlternateSubstFormat1 subtable.
        const RANDOM = 0x20;
        /// Do not match across syllable boundaries.
        const PER_SYLLABLE = 0x40;
    }
}

/// Collects requested features and compiles them into a [`Map`].
pub struct MapBuilder<'a, 'b> {
    face: &'a Face<'b>,
    found_script: [bool; 2],
    chosen_script: [Option<Tag>; 2],
    script_index: [Option<ScriptIndex>; 2],
    lang_index: [Option<LangIndex>; 2],
    current_stage: [usize; 2],
    feature_infos: Vec<FeatureInfo>,
    stages: [Vec<StageInfo>; 2],
}

#[derive(Clone, Copy, Debug)]
struct FeatureInfo {
    tag: Tag,
    // sequence#, used for stable sorting only
    seq: usize,
    max_value: u32,
    flags: FeatureFlags,
    // for non-global features, what should the unset glyphs take
    default_value: u32,
    // GSUB/GPOS
    stage: [usize; 2],
}

#[derive(Clone, Copy)]
struct StageInfo {
    index: usize,
    pause_func: Option<PauseFunc>,
}

impl<'a, 'b> MapBuilder<'a, 'b> {
    pub fn new(face: &'a Face<'b>, script: Option<Script>, language: Option<&Language>) -> Self {
        // Fetch script/language indices for GSUB/GPOS. We need these later to skip
        // features not available in either table and not waste precious bits for them.
        let (script_tags, lang_tags) = tags_from_script_and_language(script, language);

        let mut found_script = [false; 2];
        let mut chosen_script = [None; 2];
        let mut script_index = [None; 2];
        let mut lang_index = [None; 2];

        for (table_index, table) in face.layout_tables() {
            if let Some((found, idx, tag)) = table.select_script(&script_tags) {
                chosen_script[table_index] = Some(tag);
                found_script[table_index] = found;
                script_index[table_index] = Some(idx);
                lang_index[table_index] = table.select_script_language(idx, &lang_tags);
            }
        }

        Self {
            face,
            found_script,
            chosen_script,
            script_index,
            lang_index,
            current_stage: [0, 0],
            feature_infos: Vec::new(),
            stages: [Vec::new(), Vec::new()],
        }
    }

    #[inline]
    pub fn chosen_script(&self, table_index: TableIndex) -> Option<Tag> {
        self.chosen_script[table_index]
    }

    pub fn add_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        if tag.is_null() {
            return;
        }

        let seq = self.feature_infos.len();
        self.feature_infos.push(FeatureInfo {
            tag,
            seq,
            max_value: value,
            flags,
            default_value: if flags.contains(FeatureFlags::GLOBAL) {
                value
            } else {
                0
            },
            stage: self.current_stage,
        });
    }

    #[inline]
    pub fn enable_feature(&mut self, tag: Tag, flags: FeatureFlags, value: u32) {
        self.add_feature(tag, flags | FeatureFlags::GLOBAL, value);
    }

    #[inline]
    pub fn disable_feature(&mut self, tag: Tag) {
        self.add_feature(tag, FeatureFlags::GLOBAL, 0);
    }

    #[inline]
    pub fn add_gsub_pause(&mut self, pause: Option<PauseFunc>) {
        self.add_pause(TableIndex::GSUB, pause);
    }

    #[inline]
    pub fn add_gpos_pause(&mut self, pause: Option<PauseFunc>) {
        self.add_pause(TableIndex::GPOS, pause);
    }

    fn add_pause(&mut self, table_index: TableIndex, pause: Option<PauseFunc>) {
        self.stages[table_index].push(StageInfo {
            index: self.current_stage[table_index],
            pause_func: pause,
        });

        self.current_stage[table_index] += 1;
    }

    pub fn compile(&mut self) -> Map {
        // We default to applying required feature in stage 0. If the required
        // feature has a tag that is known to the shaper, we apply the required
        // feature in the stage for that tag.
        let mut required_index = [None; 2];
        let mut required_tag = [None; 2];
        let mut required_stage = [0usize; 2];
        let mut variation_index: [Option<VariationIndex>; 2] = [None; 2];

        for (table_index, table) in self.face.layout_tables() {
            if let Some(script) = self.script_index[table_index] {
                let lang = self.lang_index[table_index];
                if let Some((idx, tag)) = table.get_required_language_feature(script, lang) {
                    required_index[table_index] = Some(idx);
                    required_tag[table_index] = Some(tag);
                }
            }

            variation_index[table_index] =
                table.find_variation_index(self.face.variation_coordinates());
        }

        let (features, global_mask) = self.allocate_bits(&mut required_stage, &required_tag);

        let mut feature_indices = crate::map::Map::new();
        for (idx, feature) in features.iter().enumerate() {
            feature_indices.insert(feature.tag.0, idx as u32);
        }

        let mut map = Map {
            chosen_script: self.chosen_script,
            found_script: self.found_script,
            global_mask,
            features,
            feature_indices,
            lookups: [Vec::new(), Vec::new()],
            stages: [Vec::new(), Vec::new()],
        };

        // Done with these.
        self.feature_infos.clear();

        self.add_gsub_pause(None);
        self.add_gpos_pause(None);

        for table_index in TableIndex::iter() {
            // Collect lookup indices for features.
            let mut stage_index = 0;
            let mut last_lookup = 0;

            for stage in 0..self.current_stage[table_index] {
                if let Some(feature_index) = required_index[table_index] {
                    if required_stage[table_index] == stage {
                        self.add_lookups(
                            &mut map,
                            table_index,
                            feature_index,
                            variation_index[table_index],
                            global_bit_mask(),
                            true,
                            true,
                            false,
                            false,
                        );
                    }
                }

                for feature in map.features.clone() {
                    if feature.stage[table_index] != stage {
                        continue;
                    }

                    if let Some(feature_index) = feature.index[table_index] {
                        self.add_lookups(
                            &mut map,
                            table_index,
                            feature_index,
                            variation_index[table_index],
                            feature.mask,
                            feature.auto_zwnj,
                            feature.auto_zwj,
                            feature.random,
                            feature.per_syllable,
                        );
                    }
                }

                // Sort lookups and merge duplicates.
                let lookups = &mut map.lookups[table_index];
                if last_lookup < lookups.len() {
                    lookups[last_lookup..].sort_by_key(|lookup| lookup.index);

                    let mut j = last_lookup;
                    for i in j + 1..lookups.len() {
                        if lookups[i].index != lookups[j].index {
                            j += 1;
                            lookups[j] = lookups[i];
                        } else {
                            lookups[j].mask |= lookups[i].mask;
                            lookups[j].auto_zwnj &= lookups[i].auto_zwnj;
                            lookups[j].auto_zwj &= lookups[i].auto_zwj;
                        }
                    }

                    lookups.truncate(j + 1);
                }

                last_lookup = lookups.len();

                if let Some(info) = self.stages[table_index].get(stage_index) {
                    if info.index == stage {
                        map.stages[table_index].push(StageMap {
                            last_lookup,
                            pause_func: info.pause_func,
                        });

                        stage_index += 1;
                    }
                }
            }
        }

        map
    }

    /// Merges duplicate features and gives every surviving one its mask bits.
    fn allocate_bits(
        &mut self,
        required_stage: &mut [usize; 2],
        required_tag: &[Option<Tag>; 2],
    ) -> (Vec<FeatureMap>, Mask) {
        let global_shift = glyph_flag::DEFINED.count_ones();
        let mut global_mask = global_bit_mask();

        // Sort features and merge duplicates.
        let infos = &mut self.feature_infos;
        if !infos.is_empty() {
            infos.sort_by_key(|info| (info.tag, info.seq));

            let mut j = 0;
            for i in 1..infos.len() {
                if infos[i].tag != infos[j].tag {
                    j += 1;
                    infos[j] = infos[i];
                    continue;
                }

                if infos[i].flags.contains(FeatureFlags::GLOBAL) {
                    infos[j].flags |= FeatureFlags::GLOBAL;
                    infos[j].max_value = infos[i].max_value;
                    infos[j].default_value = infos[i].default_value;
                } else {
                    infos[j].flags.remove(FeatureFlags::GLOBAL);
                    infos[j].max_value = infos[j].max_value.max(infos[i].max_value);
                    // Inherit default_value from j
                }

                let fallback = infos[i].flags & FeatureFlags::HAS_FALLBACK;
                infos[j].flags |= fallback;
                infos[j].stage[0] = infos[j].stage[0].min(infos[i].stage[0]);
                infos[j].stage[1] = infos[j].stage[1].min(infos[i].stage[1]);
            }

            infos.truncate(j + 1);
        }

        let mut features = Vec::new();
        let mut next_bit = global_shift + 1;

        for info in self.feature_infos.iter() {
            let uses_global_bit = info.flags.contains(FeatureFlags::GLOBAL) && info.max_value == 1;
            let bits_needed = if uses_global_bit {
                0
            } else {
                // Limit bits per feature.
                Map::MAX_BITS.min(u32::BITS - info.max_value.leading_zeros())
            };

            if info.max_value == 0 {
                continue;
            }

            if next_bit + bits_needed > Mask::BITS {
                log::debug!("no mask bits left for feature '{}'", info.tag);
                continue;
            }

            let mut found = false;
            let mut feature_index = [None; 2];
            for (table_index, table) in self.face.layout_tables() {
                if required_tag[table_index] == Some(info.tag) {
                    required_stage[table_index] = info.stage[table_index];
                }

                if let Some(script) = self.script_index[table_index] {
                    let lang = self.lang_index[table_index];
                    feature_index[table_index] = table.find_language_feature(script, lang, info.tag);
                    found |= feature_index[table_index].is_some();
                }
            }

            if !found && info.flags.contains(FeatureFlags::GLOBAL_SEARCH) {
                for (table_index, table) in self.face.layout_tables() {
                    feature_index[table_index] = table.find_feature_index(info.tag);
                    found |= feature_index[table_index].is_some();
                }
            }

            if !found && !info.flags.contains(FeatureFlags::HAS_FALLBACK) {
                log::debug!("feature '{}' is not in the font and was dropped", info.tag);
                continue;
            }

            let (shift, mask) = if uses_global_bit {
                (global_shift, global_bit_mask())
            } else {
                let shift = next_bit;
                let mask = (1 << (next_bit + bits_needed)) - (1 << next_bit);
                next_bit += bits_needed;
                global_mask |= (info.default_value << shift) & mask;
                (shift, mask)
            };

            features.push(FeatureMap {
                tag: info.tag,
                index: feature_index,
                stage: info.stage,
                shift,
                mask,
                one_mask: (1 << shift) & mask,
                auto_zwnj: !info.flags.contains(FeatureFlags::MANUAL_ZWNJ),
                auto_zwj: !info.flags.contains(FeatureFlags::MANUAL_ZWJ),
                random: info.flags.contains(FeatureFlags::RANDOM),
                per_syllable: info.flags.contains(FeatureFlags::PER_SYLLABLE),
            });
        }

        (features, global_mask)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_lookups(
        &self,
        map: &mut Map,
        table_index: TableIndex,
        feature_index: FeatureIndex,
        variation_index: Option<VariationIndex>,
        mask: Mask,
        auto_zwnj: bool,
        auto_zwj: bool,
        random: bool,
        per_syllable: bool,
    ) -> Option<()> {
        let table = self.face.layout_table(table_index)?;
        let lookup_count = table.lookup_count();
        let feature = table.get_variation(feature_index, variation_index)?;

        for index in feature.lookup_indices {
            if index.0 >= lookup_count {
                continue;
            }

            map.lookups[table_index].push(LookupMap {
                index,
                mask,
                auto_zwnj,
                auto_zwj,
                random,
                per_syllable,
            });
        }

        Some(())
    }
}

/// The bit shared by all global features with the value 1.
///
/// It sits right above the glyph flags.
fn global_bit_mask() -> Mask {
    glyph_flag::DEFINED + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn face_data() -> alloc::vec::Vec<u8> {
        let mut gsub = LayoutBuilder::new();
        gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 1)]);
        gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[2]), 1)]);
        gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[3]), 1)]);
        gsub.add_feature(b"liga", &[0]);
        gsub.add_feature(b"salt", &[1]);
        gsub.add_feature(b"ccmp", &[2, 0]);

        let mut gpos = LayoutBuilder::new();
        gpos.add_lookup(1, 0, vec![single_pos_format1(&coverage_format1(&[1]), 10)]);
        gpos.add_feature(b"kern", &[0]);

        FontBuilder::new()
            .glyph('a', 1, 500)
            .glyph('b', 2, 500)
            .glyph('c', 3, 500)
            .gsub(gsub.build(b"DFLT"))
            .gpos(gpos.build(b"DFLT"))
            .build()
    }

    fn tag(bytes: &[u8; 4]) -> Tag {
        Tag::from_bytes(bytes)
    }

    fn build_map(face: &Face) -> Map {
        let mut builder = MapBuilder::new(face, None, None);
        builder.enable_feature(tag(b"liga"), FeatureFlags::empty(), 1);
        builder.add_feature(tag(b"salt"), FeatureFlags::empty(), 3);
        builder.add_gsub_pause(None);
        builder.enable_feature(tag(b"ccmp"), FeatureFlags::empty(), 1);
        builder.enable_feature(tag(b"kern"), FeatureFlags::empty(), 1);
        builder.add_feature(tag(b"frac"), FeatureFlags::HAS_FALLBACK, 1);
        builder.enable_feature(tag(b"zzzz"), FeatureFlags::empty(), 1);
        builder.compile()
    }

    #[test]
    fn global_features_share_the_global_bit() {
        let data = face_data();
        let face = Face::from_slice(&data, 0).unwrap();
        let map = build_map(&face);

        let global = glyph_flag::DEFINED + 1;
        assert_eq!(map.get_mask(tag(b"liga")), (global, 2));
        assert_eq!(map.get_mask(tag(b"kern")), (global, 2));
        assert_eq!(map.get_1_mask(tag(b"ccmp")), global);

        // Missing features without a fallback get nothing.
        assert_eq!(map.get_mask(tag(b"zzzz")), (0, 0));
        assert!(map.get_feature_index(TableIndex::GSUB, tag(b"zzzz")).is_none());
    }

    #[test]
    fn valued_features_get_their_own_bits() {
        let data = face_data();
        let face = Face::from_slice(&data, 0).unwrap();
        let map = build_map(&face);

        // frac sorts before salt, so it gets the first free bit.
        assert_eq!(map.get_mask(tag(b"frac")), (0b1000, 3));
        assert_eq!(map.get_mask(tag(b"salt")), (0b11_0000, 4));
        assert_eq!(map.get_1_mask(tag(b"salt")), 0b1_0000);

        // Non-global features are off by default.
        assert_eq!(map.global_mask(), glyph_flag::DEFINED + 1);
        assert_eq!(map.get_feature_index(TableIndex::GSUB, tag(b"salt")), Some(FeatureIndex(1)));
        assert!(map.get_feature_index(TableIndex::GPOS, tag(b"salt")).is_none());
    }

    #[test]
    fn lookups_are_staged_and_merged() {
        let data = face_data();
        let face = Face::from_slice(&data, 0).unwrap();
        let map = build_map(&face);

        assert_eq!(map.stages(TableIndex::GSUB).len(), 2);
        assert_eq!(map.stages(TableIndex::GPOS).len(), 1);
        assert_eq!(map.get_feature_stage(TableIndex::GSUB, tag(b"ccmp")), Some(1));

        let first: Vec<u16> = map
            .stage_lookups(TableIndex::GSUB, 0)
            .iter()
            .map(|lookup| lookup.index.0)
            .collect();
        assert_eq!(first, [0, 1]);

        // ccmp runs in the second stage and gets its own copy of lookup 0.
        let second: Vec<u16> = map
            .stage_lookups(TableIndex::GSUB, 1)
            .iter()
            .map(|lookup| lookup.index.0)
            .collect();
        assert_eq!(second, [0, 2]);

        let salt = map.stage_lookups(TableIndex::GSUB, 0)[1];
        assert_eq!(salt.mask, 0b11_0000);
        assert!(map.stage_lookups(TableIndex::GSUB, 5).is_empty());
        assert_eq!(map.chosen_script(TableIndex::GPOS), Some(tag(b"DFLT")));
        assert!(!map.found_script(TableIndex::GPOS));
    }

    #[test]
    fn compiling_is_deterministic() {
        let data = face_data();
        let face = Face::from_slice(&data, 0).unwrap();
        let a = build_map(&face);
        let b = build_map(&face);
        assert_eq!(a.global_mask(), b.global_mask());
        for table_index in TableIndex::iter() {
            assert_eq!(a.lookups(table_index), b.lookups(table_index));
        }
    }

    #[test]
    fn later_global_request_wins() {
        let data = face_data();
        let face = Face::from_slice(&data, 0).unwrap();
        let mut builder = MapBuilder::new(&face, None, None);
        builder.add_feature(tag(b"salt"), FeatureFlags::empty(), 2);
        builder.disable_feature(tag(b"salt"));
        let map = builder.compile();
        assert_eq!(map.get_mask(tag(b"salt")), (0, 0));
    }

    fn variable_face_data() -> alloc::vec::Vec<u8> {
        let mut gsub = LayoutBuilder::new();
        gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 1)]);
        gsub.add_lookup(1, 0, vec![single_subst_format1(&coverage_format1(&[1]), 2)]);
        gsub.add_feature(b"rvrn", &[0]);
        gsub.add_variation(&[(0, 0x2000, 0x4000)], &[(0, &[1])]);

        FontBuilder::new()
            .glyph('a', 1, 500)
            .glyph('b', 2, 500)
            .glyph('c', 3, 500)
            .axis(b"wght", 100, 400, 900)
            .gsub(gsub.build(b"DFLT"))
            .build()
    }

    fn rvrn_lookups(face: &Face) -> alloc::vec::Vec<u16> {
        let mut builder = MapBuilder::new(face, None, None);
        builder.enable_feature(tag(b"rvrn"), FeatureFlags::empty(), 1);
        let map = builder.compile();
        map.lookups(TableIndex::GSUB)
            .iter()
            .map(|lookup| lookup.index.0)
            .collect()
    }

    #[test]
    fn feature_variations_follow_axis_coordinates() {
        let data = variable_face_data();
        let mut face = Face::from_slice(&data, 0).unwrap();
        let weight = |value: f32| [crate::Variation { tag: tag(b"wght"), value }];

        // Default instance.
        assert_eq!(rvrn_lookups(&face), [0]);

        // 700 normalizes to 0.6.
        face.set_variations(&weight(700.0));
        assert_eq!(rvrn_lookups(&face), [1]);

        face.set_variations(&weight(900.0));
        assert_eq!(rvrn_lookups(&face), [1]);

        // 500 normalizes to 0.2, below the condition range.
        face.set_variations(&weight(500.0));
        assert_eq!(rvrn_lookups(&face), [0]);

        face.set_variations(&weight(100.0));
        assert_eq!(rvrn_lookups(&face), [0]);

        // Unknown axes are ignored.
        face.set_variations(&[crate::Variation { tag: tag(b"wdth"), value: 150.0 }]);
        assert_eq!(rvrn_lookups(&face), [0]);
    }
}
