use alloc::vec::Vec;

use crate::ot::{kern, FeatureFlags, Map, MapBuilder, TableIndex};
use crate::{Direction, Face, Feature, Language, Mask, Script, Tag};

/// A reusable plan for shaping a text buffer.
///
/// Compiling a plan selects the script and language systems of the font and
/// allocates mask bits for every requested feature. A plan can be reused for
/// any buffer with the same segment properties and features.
pub struct ShapePlan {
    pub(crate) direction: Direction,
    pub(crate) script: Option<Script>,
    pub(crate) ot_map: Map,

    pub(crate) frac_mask: Mask,
    pub(crate) numr_mask: Mask,
    pub(crate) dnom_mask: Mask,
    pub(crate) rtlm_mask: Mask,
    pub(crate) kern_mask: Mask,

    pub(crate) requested_kerning: bool,
    pub(crate) has_frac: bool,
    pub(crate) has_vert: bool,
    pub(crate) has_gpos_mark: bool,
    pub(crate) zero_marks: bool,
    pub(crate) fallback_glyph_classes: bool,
    pub(crate) adjust_mark_positioning_when_zeroing: bool,

    pub(crate) apply_gpos: bool,
    pub(crate) apply_kern: bool,

    pub(crate) user_features: Vec<Feature>,
}

impl ShapePlan {
    /// Returns a plan that can be used for shaping any buffer with the
    /// provided properties.
    ///
    /// An invalid direction is treated as left-to-right.
    pub fn new(
        face: &Face,
        direction: Direction,
        script: Option<Script>,
        language: Option<&Language>,
        user_features: &[Feature],
    ) -> Self {
        let direction = if direction == Direction::Invalid {
            Direction::LeftToRight
        } else {
            direction
        };

        let mut planner = ShapePlanner::new(face, direction, script, language);
        planner.collect_features(user_features);
        planner.compile(user_features)
    }

    /// The direction this plan was compiled for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The script this plan was compiled for.
    pub fn script(&self) -> Option<Script> {
        self.script
    }
}

struct ShapePlanner<'a, 'b> {
    face: &'a Face<'b>,
    direction: Direction,
    script: Option<Script>,
    ot_map: MapBuilder<'a, 'b>,
}

impl<'a, 'b> ShapePlanner<'a, 'b> {
    fn new(
        face: &'a Face<'b>,
        direction: Direction,
        script: Option<Script>,
        language: Option<&Language>,
    ) -> Self {
        ShapePlanner {
            face,
            direction,
            script,
            ot_map: MapBuilder::new(face, script, language),
        }
    }

    fn collect_features(&mut self, user_features: &[Feature]) {
        const COMMON_FEATURES: &[(Tag, FeatureFlags)] = &[
            (Tag::from_bytes(b"abvm"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"blwm"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"ccmp"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"locl"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"mark"), FeatureFlags::GLOBAL_MANUAL_JOINERS),
            (Tag::from_bytes(b"mkmk"), FeatureFlags::GLOBAL_MANUAL_JOINERS),
            (Tag::from_bytes(b"rlig"), FeatureFlags::GLOBAL),
        ];

        const HORIZONTAL_FEATURES: &[(Tag, FeatureFlags)] = &[
            (Tag::from_bytes(b"calt"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"clig"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"curs"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"dist"), FeatureFlags::GLOBAL),
            (
                Tag::from_bytes(b"kern"),
                FeatureFlags::GLOBAL.union(FeatureFlags::HAS_FALLBACK),
            ),
            (Tag::from_bytes(b"liga"), FeatureFlags::GLOBAL),
            (Tag::from_bytes(b"rclt"), FeatureFlags::GLOBAL),
        ];

        let empty = FeatureFlags::empty();

        self.ot_map.enable_feature(Tag::from_bytes(b"rvrn"), empty, 1);
        self.ot_map.add_gsub_pause(None);

        match self.direction {
            Direction::LeftToRight => {
                self.ot_map.enable_feature(Tag::from_bytes(b"ltra"), empty, 1);
                self.ot_map.enable_feature(Tag::from_bytes(b"ltrm"), empty, 1);
            }
            Direction::RightToLeft => {
                self.ot_map.enable_feature(Tag::from_bytes(b"rtla"), empty, 1);
                self.ot_map.add_feature(Tag::from_bytes(b"rtlm"), empty, 1);
            }
            _ => {}
        }

        // Automatic fractions.
        self.ot_map.add_feature(Tag::from_bytes(b"frac"), empty, 1);
        self.ot_map.add_feature(Tag::from_bytes(b"numr"), empty, 1);
        self.ot_map.add_feature(Tag::from_bytes(b"dnom"), empty, 1);

        // Random!
        self.ot_map
            .enable_feature(Tag::from_bytes(b"rand"), FeatureFlags::RANDOM, Map::MAX_VALUE);

        for &(tag, flags) in COMMON_FEATURES {
            self.ot_map.add_feature(tag, flags, 1);
        }

        if self.direction.is_horizontal() {
            for &(tag, flags) in HORIZONTAL_FEATURES {
                self.ot_map.add_feature(tag, flags, 1);
            }
        } else {
            // A 'vert' feature is wanted no matter which script or
            // language system it is listed under.
            self.ot_map
                .enable_feature(Tag::from_bytes(b"vert"), FeatureFlags::GLOBAL_SEARCH, 1);
        }

        for feature in user_features {
            let flags = if feature.is_global() {
                FeatureFlags::GLOBAL
            } else {
                empty
            };
            self.ot_map.add_feature(feature.tag, flags, feature.value);
        }
    }

    fn compile(mut self, user_features: &[Feature]) -> ShapePlan {
        let ot_map = self.ot_map.compile();

        let frac_mask = ot_map.get_1_mask(Tag::from_bytes(b"frac"));
        let numr_mask = ot_map.get_1_mask(Tag::from_bytes(b"numr"));
        let dnom_mask = ot_map.get_1_mask(Tag::from_bytes(b"dnom"));
        let has_frac = frac_mask != 0 || (numr_mask != 0 && dnom_mask != 0);

        let rtlm_mask = ot_map.get_1_mask(Tag::from_bytes(b"rtlm"));
        let has_vert = ot_map.get_1_mask(Tag::from_bytes(b"vert")) != 0;

        let kern_tag = if self.direction.is_horizontal() {
            Tag::from_bytes(b"kern")
        } else {
            Tag::from_bytes(b"vkrn")
        };
        let kern_mask = ot_map.get_mask(kern_tag).0;
        let requested_kerning = kern_mask != 0;

        let has_gpos_kern = ot_map.get_feature_index(TableIndex::GPOS, kern_tag).is_some();

        // Decide who provides glyph classes. GDEF or Unicode.
        let fallback_glyph_classes = !self.face.has_glyph_classes();

        // Decide who does positioning. GPOS or kern.
        let apply_gpos = self.face.gpos.is_some();
        let apply_kern = (!has_gpos_kern || !apply_gpos) && kern::has_kerning(self.face);

        let zero_marks = !apply_kern || !kern::has_machine_kerning(self.face);
        let has_gpos_mark = ot_map.get_1_mask(Tag::from_bytes(b"mark")) != 0;

        let adjust_mark_positioning_when_zeroing =
            !apply_gpos && (!apply_kern || !kern::has_cross_kerning(self.face));

        ShapePlan {
            direction: self.direction,
            script: self.script,
            ot_map,
            frac_mask,
            numr_mask,
            dnom_mask,
            rtlm_mask,
            kern_mask,
            requested_kerning,
            has_frac,
            has_vert,
            has_gpos_mark,
            zero_marks,
            fallback_glyph_classes,
            adjust_mark_positioning_when_zeroing,
            apply_gpos,
            apply_kern,
            user_features: user_features.to_vec(),
        }
    }
}
