//! Common tables for GSUB and GPOS.

use core::cmp::Ordering;

use ttf_parser::{GlyphId, NormalizedCoordinate, Tag};

use crate::parser::*;
use crate::set::Set;

/// A GSUB or GPOS table.
#[derive(Clone, Copy, Debug)]
pub struct LayoutTable<'a> {
    pub(crate) data: &'a [u8],
    scripts: RecordList<'a>,
    features: RecordList<'a>,
    lookups: LookupList<'a>,
    variations: Option<FeatureVariations<'a>>,
}

impl<'a> LayoutTable<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);

        let major_version = s.read::<u16>()?;
        let minor_version = s.read::<u16>()?;
        if major_version != 1 {
            return None;
        }

        let scripts = RecordList::parse(s.read_at_offset16(data)?)?;
        let features = RecordList::parse(s.read_at_offset16(data)?)?;
        let lookups = LookupList::parse(s.read_at_offset16(data)?)?;

        let mut variations = None;
        if minor_version >= 1 {
            if let Some(offset) = s.read::<Option<Offset32>>()? {
                variations = FeatureVariations::parse(data.get(offset.to_usize()..)?);
            }
        }

        Some(LayoutTable {
            data,
            scripts,
            features,
            lookups,
            variations,
        })
    }

    pub fn script_count(&self) -> u16 {
        self.scripts.len()
    }

    pub fn get_script(&self, index: ScriptIndex) -> Option<Script<'a>> {
        Script::parse(self.scripts.get_data(index.0)?)
    }

    pub fn get_script_tag(&self, index: ScriptIndex) -> Option<Tag> {
        self.scripts.get_tag(index.0)
    }

    pub fn find_script_index(&self, script_tag: Tag) -> Option<ScriptIndex> {
        self.scripts.find_index(script_tag).map(ScriptIndex)
    }

    pub fn feature_count(&self) -> u16 {
        self.features.len()
    }

    pub fn get_feature(&self, index: FeatureIndex) -> Option<Feature<'a>> {
        Feature::parse(self.features.get_data(index.0)?)
    }

    pub fn get_feature_tag(&self, index: FeatureIndex) -> Option<Tag> {
        self.features.get_tag(index.0)
    }

    /// Finds the first feature with the given tag.
    ///
    /// The feature list is sorted by tag, but may contain duplicates,
    /// so this is a plain scan.
    pub fn find_feature_index(&self, feature_tag: Tag) -> Option<FeatureIndex> {
        self.features
            .records
            .into_iter()
            .position(|record| record.tag == feature_tag)
            .map(|i| FeatureIndex(i as u16))
    }

    pub fn lookup_count(&self) -> u16 {
        self.lookups.len()
    }

    pub fn get_lookup(&self, index: LookupIndex) -> Option<Lookup<'a>> {
        self.lookups.get(index)
    }

    /// Returns a feature, substituted by a feature variation if the
    /// variation index selects one.
    pub fn get_variation(
        &self,
        feature_index: FeatureIndex,
        variation_index: Option<VariationIndex>,
    ) -> Option<Feature<'a>> {
        variation_index
            .and_then(|v| self.variations?.find_substitute(feature_index, v))
            .or_else(|| self.get_feature(feature_index))
    }

    pub fn find_variation_index(&self, coords: &[NormalizedCoordinate]) -> Option<VariationIndex> {
        self.variations?.find_index(coords)
    }

    /// Finds a language system by script and language indices.
    ///
    /// `None` as a language index means the default language system.
    pub fn get_lang_sys(
        &self,
        script_index: ScriptIndex,
        lang_index: Option<LangIndex>,
    ) -> Option<LangSys<'a>> {
        let script = self.get_script(script_index)?;
        match lang_index {
            Some(index) => script.get_lang(index),
            None => script.default_lang(),
        }
    }
}

impl Sanitize for LayoutTable<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.check_struct(self.data, 10) {
            return false;
        }

        for i in 0..self.scripts.len() {
            let script = match self.get_script(ScriptIndex(i)) {
                Some(v) => v,
                None => return false,
            };

            if !script.sanitize(c) {
                return false;
            }
        }

        for i in 0..self.features.len() {
            if !c.visit() || self.get_feature(FeatureIndex(i)).is_none() {
                return false;
            }
        }

        // Lookups are validated one by one by the owning table,
        // so that a single broken lookup doesn't disable the whole table.
        self.variations.sanitize(c)
    }
}

/// A type-safe wrapper for a script index.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct ScriptIndex(pub u16);

/// A type-safe wrapper for a language system index.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct LangIndex(pub u16);

/// A type-safe wrapper for a feature index.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct FeatureIndex(pub u16);

impl FromData for FeatureIndex {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Self)
    }
}

/// A type-safe wrapper for a lookup index.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct LookupIndex(pub u16);

impl FromData for LookupIndex {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Self)
    }
}

/// A type-safe wrapper for a feature variation record index.
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct VariationIndex(pub u32);

#[derive(Clone, Copy, Debug)]
struct RecordList<'a> {
    data: &'a [u8],
    records: LazyArray16<'a, TagRecord>,
}

impl<'a> RecordList<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let records = s.read_array16(count)?;
        Some(RecordList { data, records })
    }

    fn len(&self) -> u16 {
        self.records.len()
    }

    fn get_tag(&self, index: u16) -> Option<Tag> {
        self.records.get(index).map(|record| record.tag)
    }

    fn get_data(&self, index: u16) -> Option<&'a [u8]> {
        let offset = self.records.get(index)?.offset.to_usize();
        self.data.get(offset..)
    }

    fn find_index(&self, tag: Tag) -> Option<u16> {
        self.records
            .binary_search_by(|record| record.tag.cmp(&tag))
            .map(|p| p.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct TagRecord {
    tag: Tag,
    offset: Offset16,
}

impl FromData for TagRecord {
    const SIZE: usize = 6;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(TagRecord {
            tag: s.read()?,
            offset: s.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Script<'a> {
    default: Option<LangSys<'a>>,
    systems: RecordList<'a>,
}

impl<'a> Script<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let mut default = None;
        if let Some(offset) = s.read::<Option<Offset16>>()? {
            default = Some(LangSys::parse(data.get(offset.to_usize()..)?)?);
        }
        let mut systems = RecordList::parse(s.tail()?)?;
        // Offsets are relative to this table.
        systems.data = data;
        Some(Script { default, systems })
    }

    pub fn default_lang(&self) -> Option<LangSys<'a>> {
        self.default
    }

    pub fn lang_count(&self) -> u16 {
        self.systems.len()
    }

    pub fn get_lang(&self, index: LangIndex) -> Option<LangSys<'a>> {
        LangSys::parse(self.systems.get_data(index.0)?)
    }

    pub fn get_lang_tag(&self, index: LangIndex) -> Option<Tag> {
        self.systems.get_tag(index.0)
    }

    pub fn find_lang_index(&self, tag: Tag) -> Option<LangIndex> {
        self.systems.find_index(tag).map(LangIndex)
    }
}

impl Sanitize for Script<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        (0..self.systems.len()).all(|i| c.visit() && self.get_lang(LangIndex(i)).is_some())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct LangSys<'a> {
    pub required_feature: Option<FeatureIndex>,
    pub feature_indices: LazyArray16<'a, FeatureIndex>,
}

impl<'a> LangSys<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<Offset16>(); // lookup order, reserved
        let required_feature = match s.read::<FeatureIndex>()? {
            FeatureIndex(0xFFFF) => None,
            v => Some(v),
        };
        let count = s.read::<u16>()?;
        let feature_indices = s.read_array16(count)?;
        Some(LangSys {
            required_feature,
            feature_indices,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Feature<'a> {
    pub lookup_indices: LazyArray16<'a, LookupIndex>,
}

impl<'a> Feature<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        s.skip::<Offset16>(); // params
        let count = s.read::<u16>()?;
        let lookup_indices = s.read_array16(count)?;
        Some(Feature { lookup_indices })
    }
}

#[derive(Clone, Copy, Debug)]
struct LookupList<'a> {
    data: &'a [u8],
    offsets: LazyArray16<'a, Offset16>,
}

impl<'a> LookupList<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let offsets = s.read_array16(count)?;
        Some(LookupList { data, offsets })
    }

    fn len(&self) -> u16 {
        self.offsets.len()
    }

    fn get(&self, index: LookupIndex) -> Option<Lookup<'a>> {
        let offset = self.offsets.get(index.0)?.to_usize();
        Lookup::parse(self.data.get(offset..)?)
    }
}

/// A raw lookup.
///
/// Subtables are kept as raw data, since their type depends on the owning table.
#[derive(Clone, Copy, Debug)]
pub struct Lookup<'a> {
    pub kind: u16,
    pub flags: LookupFlags,
    pub subtables: LazyArray16<'a, Offset16>,
    pub mark_filtering_set: Option<u16>,
    data: &'a [u8],
}

impl<'a> Lookup<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let kind = s.read::<u16>()?;
        let flags = s.read::<LookupFlags>()?;
        let count = s.read::<u16>()?;
        let subtables = s.read_array16(count)?;

        let mut mark_filtering_set: Option<u16> = None;
        if flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
            mark_filtering_set = Some(s.read()?);
        }

        Some(Lookup {
            kind,
            flags,
            subtables,
            mark_filtering_set,
            data,
        })
    }

    /// Returns raw subtable data. Null offsets are skipped.
    pub fn subtables_data(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let data = self.data;
        self.subtables
            .into_iter()
            .filter(|offset| !offset.is_null())
            .filter_map(move |offset| data.get(offset.to_usize()..))
    }

    // lookup_props is a 32-bit integer where the lower 16-bit is LookupFlag and
    // higher 16-bit is mark-filtering-set if the lookup uses one.
    // Not to be confused with glyph_props which is very similar.
    pub fn props(&self) -> u32 {
        let mut props = u32::from(self.flags.bits());
        if let Some(set) = self.mark_filtering_set {
            props |= u32::from(set) << 16;
        }
        props
    }
}

bitflags::bitflags! {
    /// Lookup qualifiers.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT          = 0x0001;
        const IGNORE_BASE_GLYPHS     = 0x0002;
        const IGNORE_LIGATURES       = 0x0004;
        const IGNORE_MARKS           = 0x0008;
        const IGNORE_FLAGS           = 0x000E;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE   = 0xFF00;
    }
}

impl FromData for LookupFlags {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Self::from_bits_retain)
    }
}

/// Unwraps an Extension subtable into its real type and data.
pub fn parse_extension_lookup<'a, T: 'a>(
    data: &'a [u8],
    parse: impl FnOnce(&'a [u8], u16) -> Option<T>,
) -> Option<T> {
    let mut s = Stream::new(data);
    let format: u16 = s.read()?;
    match format {
        1 => {
            let kind = s.read::<u16>()?;
            let offset = s.read::<Offset32>()?.to_usize();
            parse(data.get(offset..)?, kind)
        }
        _ => None,
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureVariations<'a> {
    data: &'a [u8],
    records: LazyArray32<'a, FeatureVariationRecord>,
}

impl<'a> FeatureVariations<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let major_version = s.read::<u16>()?;
        s.skip::<u16>(); // minor version
        if major_version != 1 {
            return None;
        }

        let count = s.read::<u32>()?;
        let records = s.read_array32(count)?;
        Some(FeatureVariations { data, records })
    }

    fn find_index(&self, coords: &[NormalizedCoordinate]) -> Option<VariationIndex> {
        for i in 0..self.records.len() {
            let record = self.records.get(i)?;
            let offset = record.conditions.to_usize();
            // A null condition set matches everything.
            if offset == 0 {
                return Some(VariationIndex(i));
            }

            let set = ConditionSet::parse(self.data.get(offset..)?)?;
            if set.evaluate(coords) {
                return Some(VariationIndex(i));
            }
        }

        None
    }

    fn find_substitute(
        &self,
        feature_index: FeatureIndex,
        variation_index: VariationIndex,
    ) -> Option<Feature<'a>> {
        let offset = self.records.get(variation_index.0)?.substitutions.to_usize();
        let subst = FeatureTableSubstitution::parse(self.data.get(offset..)?)?;
        subst.find_substitute(feature_index)
    }
}

impl Sanitize for FeatureVariations<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        self.records.iter().all(|record| {
            let conditions = match c.check_range(self.data, record.conditions.to_usize()) {
                Some(Some(data)) => ConditionSet::parse(data),
                Some(None) => return true,
                None => return false,
            };

            let substitutions = match c.check_range(self.data, record.substitutions.to_usize()) {
                Some(Some(data)) => FeatureTableSubstitution::parse(data),
                Some(None) => return true,
                None => return false,
            };

            conditions.is_some() && substitutions.is_some()
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureVariationRecord {
    conditions: Offset32,
    substitutions: Offset32,
}

impl FromData for FeatureVariationRecord {
    const SIZE: usize = 8;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(FeatureVariationRecord {
            conditions: s.read()?,
            substitutions: s.read()?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct ConditionSet<'a> {
    data: &'a [u8],
    conditions: LazyArray16<'a, Offset32>,
}

impl<'a> ConditionSet<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let conditions = s.read_array16(count)?;
        Some(ConditionSet { data, conditions })
    }

    fn evaluate(&self, coords: &[NormalizedCoordinate]) -> bool {
        self.conditions.into_iter().all(|offset| {
            self.data
                .get(offset.to_usize()..)
                .and_then(Condition::parse)
                .map_or(false, |c| c.evaluate(coords))
        })
    }
}

#[derive(Clone, Copy, Debug)]
enum Condition {
    Format1 {
        axis_index: u16,
        filter_range_min: i16,
        filter_range_max: i16,
    },
}

impl Condition {
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let axis_index = s.read::<u16>()?;
                let filter_range_min = s.read::<i16>()?;
                let filter_range_max = s.read::<i16>()?;
                Some(Condition::Format1 {
                    axis_index,
                    filter_range_min,
                    filter_range_max,
                })
            }
            _ => None,
        }
    }

    fn evaluate(&self, coords: &[NormalizedCoordinate]) -> bool {
        let Condition::Format1 {
            axis_index,
            filter_range_min,
            filter_range_max,
        } = *self;
        let coord = coords
            .get(usize::from(axis_index))
            .map(|c| c.get())
            .unwrap_or(0);
        filter_range_min <= coord && coord <= filter_range_max
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureTableSubstitution<'a> {
    data: &'a [u8],
    records: LazyArray16<'a, FeatureTableSubstitutionRecord>,
}

impl<'a> FeatureTableSubstitution<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let major_version = s.read::<u16>()?;
        s.skip::<u16>(); // minor version
        if major_version != 1 {
            return None;
        }

        let count = s.read::<u16>()?;
        let records = s.read_array16(count)?;
        Some(FeatureTableSubstitution { data, records })
    }

    fn find_substitute(&self, feature_index: FeatureIndex) -> Option<Feature<'a>> {
        let (_, record) = self
            .records
            .binary_search_by(|r| r.feature_index.cmp(&feature_index))?;
        Feature::parse(self.data.get(record.feature.to_usize()..)?)
    }
}

#[derive(Clone, Copy, Debug)]
struct FeatureTableSubstitutionRecord {
    feature_index: FeatureIndex,
    feature: Offset32,
}

impl FromData for FeatureTableSubstitutionRecord {
    const SIZE: usize = 6;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(FeatureTableSubstitutionRecord {
            feature_index: s.read()?,
            feature: s.read()?,
        })
    }
}

/// A table that defines which glyph ids are covered by some lookup.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table
#[derive(Clone, Copy, Debug)]
pub enum Coverage<'a> {
    Format1 { glyphs: LazyArray16<'a, GlyphId> },
    Format2 { records: LazyArray16<'a, RangeRecord> },
}

impl<'a> FromSlice<'a> for Coverage<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let count = s.read::<u16>()?;
                let glyphs = s.read_array16(count)?;
                Some(Coverage::Format1 { glyphs })
            }
            2 => {
                let count = s.read::<u16>()?;
                let records = s.read_array16(count)?;
                Some(Coverage::Format2 { records })
            }
            _ => None,
        }
    }
}

impl<'a> Coverage<'a> {
    /// Checks that glyph is present.
    #[inline]
    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.get(glyph).is_some()
    }

    /// Returns the coverage index of the glyph or `None` if it is not covered.
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            Coverage::Format1 { glyphs } => glyphs.binary_search(&glyph).map(|p| p.0),
            Coverage::Format2 { records } => {
                let record = RangeRecord::binary_search(records, glyph)?;
                let offset = glyph.0 - record.start.0;
                record.value.checked_add(offset)
            }
        }
    }

    /// Adds all covered glyphs to the set.
    pub fn collect(&self, set: &mut Set) {
        match *self {
            Coverage::Format1 { glyphs } => {
                for glyph in glyphs {
                    set.add(u32::from(glyph.0));
                }
            }
            Coverage::Format2 { records } => {
                for record in records {
                    set.add_range(u32::from(record.start.0), u32::from(record.end.0));
                }
            }
        }
    }
}

impl Sanitize for Coverage<'_> {
    // Sorting is trusted. Arrays were bounds-checked by `parse`.
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A glyph class.
pub type Class = u16;

/// A table that defines which classes glyph ids belong to.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table
#[derive(Clone, Copy, Debug)]
pub enum ClassDef<'a> {
    Format1 {
        start: GlyphId,
        classes: LazyArray16<'a, Class>,
    },
    Format2 {
        records: LazyArray16<'a, RangeRecord>,
    },
}

impl<'a> FromSlice<'a> for ClassDef<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let start = s.read::<GlyphId>()?;
                let count = s.read::<u16>()?;
                let classes = s.read_array16(count)?;
                Some(ClassDef::Format1 { start, classes })
            }
            2 => {
                let count = s.read::<u16>()?;
                let records = s.read_array16(count)?;
                Some(ClassDef::Format2 { records })
            }
            _ => None,
        }
    }
}

impl<'a> ClassDef<'a> {
    /// Returns the glyph class of the glyph (zero if it is not defined).
    pub fn get(&self, glyph: GlyphId) -> Class {
        let class = match self {
            ClassDef::Format1 { start, classes } => glyph
                .0
                .checked_sub(start.0)
                .and_then(|index| classes.get(index)),
            ClassDef::Format2 { records } => {
                RangeRecord::binary_search(records, glyph).map(|record| record.value)
            }
        };

        class.unwrap_or(0)
    }
}

impl Sanitize for ClassDef<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A record that describes a range of glyph ids.
#[derive(Clone, Copy, Debug)]
pub struct RangeRecord {
    pub start: GlyphId,
    pub end: GlyphId,
    pub value: u16,
}

impl RangeRecord {
    fn binary_search(records: &LazyArray16<RangeRecord>, glyph: GlyphId) -> Option<RangeRecord> {
        records
            .binary_search_by(|record| {
                if glyph < record.start {
                    Ordering::Greater
                } else if glyph <= record.end {
                    Ordering::Equal
                } else {
                    Ordering::Less
                }
            })
            .map(|p| p.1)
    }
}

impl FromData for RangeRecord {
    const SIZE: usize = 6;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(RangeRecord {
            start: s.read::<GlyphId>()?,
            end: s.read::<GlyphId>()?,
            value: s.read::<u16>()?,
        })
    }
}

/// A device table.
///
/// https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#device-and-variationindex-tables
#[derive(Clone, Copy, Debug)]
pub enum Device<'a> {
    Hinting(HintingDevice<'a>),
    Variation(VariationDevice),
}

impl<'a> FromSlice<'a> for Device<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let first = s.read::<u16>()?;
        let second = s.read::<u16>()?;
        let format = s.read::<u16>()?;
        match format {
            1..=3 => {
                let start_size = first;
                let end_size = second;
                let count = (end_size.checked_sub(start_size)? >> (4 - format)) + 1;
                let delta_values = s.read_array16(count)?;
                Some(Device::Hinting(HintingDevice {
                    start_size,
                    end_size,
                    delta_format: format,
                    delta_values,
                }))
            }
            0x8000 => Some(Device::Variation(VariationDevice {
                outer_index: first,
                inner_index: second,
            })),
            _ => None,
        }
    }
}

impl Sanitize for Device<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct HintingDevice<'a> {
    start_size: u16,
    end_size: u16,
    delta_format: u16,
    delta_values: LazyArray16<'a, u16>,
}

impl HintingDevice<'_> {
    /// Returns a delta in font units for the given pixels-per-em.
    pub fn get_delta(&self, ppem: u16, upem: u16) -> Option<i32> {
        let f = self.delta_format;
        debug_assert!(matches!(f, 1..=3));

        if ppem == 0 || ppem < self.start_size || ppem > self.end_size {
            return None;
        }

        let s = ppem - self.start_size;
        let word = self.delta_values.get(s >> (4 - f))?;
        let bits = word >> (16 - (((s & ((1 << (4 - f)) - 1)) + 1) << f));
        let mask = 0xFFFF >> (16 - (1 << f));

        let mut delta = i64::from(bits & mask);
        if delta >= i64::from((mask + 1) >> 1) {
            delta -= i64::from(mask + 1);
        }

        i32::try_from(delta * i64::from(upem) / i64::from(ppem)).ok()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VariationDevice {
    pub outer_index: u16,
    pub inner_index: u16,
}

/// A `(sequence index, lookup index)` pair of a contextual rule.
#[derive(Clone, Copy, Debug)]
pub struct SequenceLookupRecord {
    pub sequence_index: u16,
    pub lookup_index: LookupIndex,
}

impl FromData for SequenceLookupRecord {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(SequenceLookupRecord {
            sequence_index: s.read::<u16>()?,
            lookup_index: s.read::<LookupIndex>()?,
        })
    }
}

/// A [Contextual Lookup](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#seqctxt1) subtable.
#[derive(Clone, Copy, Debug)]
pub enum ContextLookup<'a> {
    /// Rules are keyed by the coverage index of the first glyph.
    Format1 {
        coverage: Coverage<'a>,
        sets: LazyOffsetArray16<'a, SequenceRuleSet<'a>>,
    },
    /// Rules are keyed by the class of the first glyph.
    Format2 {
        coverage: Coverage<'a>,
        classes: ClassDef<'a>,
        sets: LazyOffsetArray16<'a, SequenceRuleSet<'a>>,
    },
    /// A single rule with per-position coverages.
    Format3 {
        coverage: Coverage<'a>,
        coverages: LazyOffsetArray16<'a, Coverage<'a>>,
        lookups: LazyArray16<'a, SequenceLookupRecord>,
    },
}

impl<'a> FromSlice<'a> for ContextLookup<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(ContextLookup::Format1 { coverage, sets })
            }
            2 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let classes = match s.read_at_optional_offset16(data)? {
                    Some(data) => ClassDef::parse(data)?,
                    None => ClassDef::Format2 {
                        records: LazyArray16::default(),
                    },
                };
                let sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(ContextLookup::Format2 {
                    coverage,
                    classes,
                    sets,
                })
            }
            3 => {
                let input_count = s.read::<u16>()?;
                let lookup_count = s.read::<u16>()?;
                let coverages = LazyOffsetArray16::new(data, s.read_array16(input_count)?);
                let coverage = coverages.get(0)?;
                let lookups = s.read_array16(lookup_count)?;
                Some(ContextLookup::Format3 {
                    coverage,
                    coverages,
                    lookups,
                })
            }
            _ => None,
        }
    }
}

impl<'a> ContextLookup<'a> {
    pub fn coverage(&self) -> Coverage<'a> {
        match *self {
            ContextLookup::Format1 { coverage, .. } => coverage,
            ContextLookup::Format2 { coverage, .. } => coverage,
            ContextLookup::Format3 { coverage, .. } => coverage,
        }
    }
}

impl Sanitize for ContextLookup<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            ContextLookup::Format1 { coverage, sets } => coverage.sanitize(c) && sets.sanitize(c),
            ContextLookup::Format2 {
                coverage,
                classes,
                sets,
            } => coverage.sanitize(c) && classes.sanitize(c) && sets.sanitize(c),
            ContextLookup::Format3 {
                coverage,
                coverages,
                ..
            } => {
                coverage.sanitize(c)
                    && (0..coverages.len()).all(|i| !coverages.is_null(i) && coverages.get(i).is_some())
                    && coverages.sanitize(c)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SequenceRuleSet<'a> {
    pub rules: LazyOffsetArray16<'a, SequenceRule<'a>>,
}

impl<'a> FromSlice<'a> for SequenceRuleSet<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let rules = LazyOffsetArray16::parse_with_base(data, &mut s)?;
        Some(SequenceRuleSet { rules })
    }
}

impl Sanitize for SequenceRuleSet<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        self.rules.sanitize(c)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SequenceRule<'a> {
    /// Glyph ids or classes, starting from the second input position.
    pub input: LazyArray16<'a, u16>,
    pub lookups: LazyArray16<'a, SequenceLookupRecord>,
}

impl<'a> FromSlice<'a> for SequenceRule<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let input_count = s.read::<u16>()?;
        let lookup_count = s.read::<u16>()?;
        let input = s.read_array16(input_count.checked_sub(1)?)?;
        let lookups = s.read_array16(lookup_count)?;
        Some(SequenceRule { input, lookups })
    }
}

impl Sanitize for SequenceRule<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A [Chained Contextual Lookup](https://docs.microsoft.com/en-us/typography/opentype/spec/chapter2#chseqctxt1) subtable.
#[derive(Clone, Copy, Debug)]
pub enum ChainedContextLookup<'a> {
    /// Rules are keyed by the coverage index of the first glyph.
    Format1 {
        coverage: Coverage<'a>,
        sets: LazyOffsetArray16<'a, ChainedSequenceRuleSet<'a>>,
    },
    /// Rules are keyed by the input class of the first glyph.
    Format2 {
        coverage: Coverage<'a>,
        backtrack_classes: ClassDef<'a>,
        input_classes: ClassDef<'a>,
        lookahead_classes: ClassDef<'a>,
        sets: LazyOffsetArray16<'a, ChainedSequenceRuleSet<'a>>,
    },
    /// A single rule with per-position coverages.
    Format3 {
        coverage: Coverage<'a>,
        backtrack_coverages: LazyOffsetArray16<'a, Coverage<'a>>,
        input_coverages: LazyOffsetArray16<'a, Coverage<'a>>,
        lookahead_coverages: LazyOffsetArray16<'a, Coverage<'a>>,
        lookups: LazyArray16<'a, SequenceLookupRecord>,
    },
}

impl<'a> FromSlice<'a> for ChainedContextLookup<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(ChainedContextLookup::Format1 { coverage, sets })
            }
            2 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;

                let parse_classes = |s: &mut Stream<'a>| -> Option<ClassDef<'a>> {
                    match s.read_at_optional_offset16(data)? {
                        Some(data) => ClassDef::parse(data),
                        None => Some(ClassDef::Format2 {
                            records: LazyArray16::default(),
                        }),
                    }
                };

                let backtrack_classes = parse_classes(&mut s)?;
                let input_classes = parse_classes(&mut s)?;
                let lookahead_classes = parse_classes(&mut s)?;
                let sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(ChainedContextLookup::Format2 {
                    coverage,
                    backtrack_classes,
                    input_classes,
                    lookahead_classes,
                    sets,
                })
            }
            3 => {
                let backtrack_coverages = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                let input_coverages = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                let coverage = input_coverages.get(0)?;
                let lookahead_coverages = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                let lookup_count = s.read::<u16>()?;
                let lookups = s.read_array16(lookup_count)?;
                Some(ChainedContextLookup::Format3 {
                    coverage,
                    backtrack_coverages,
                    input_coverages,
                    lookahead_coverages,
                    lookups,
                })
            }
            _ => None,
        }
    }
}

impl<'a> ChainedContextLookup<'a> {
    pub fn coverage(&self) -> Coverage<'a> {
        match *self {
            ChainedContextLookup::Format1 { coverage, .. } => coverage,
            ChainedContextLookup::Format2 { coverage, .. } => coverage,
            ChainedContextLookup::Format3 { coverage, .. } => coverage,
        }
    }
}

fn sanitize_coverages<'a>(
    coverages: &LazyOffsetArray16<'a, Coverage<'a>>,
    c: &mut SanitizeContext,
) -> bool {
    (0..coverages.len()).all(|i| !coverages.is_null(i) && coverages.get(i).is_some())
        && coverages.sanitize(c)
}

impl Sanitize for ChainedContextLookup<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            ChainedContextLookup::Format1 { coverage, sets } => {
                coverage.sanitize(c) && sets.sanitize(c)
            }
            ChainedContextLookup::Format2 {
                coverage,
                backtrack_classes,
                input_classes,
                lookahead_classes,
                sets,
            } => {
                coverage.sanitize(c)
                    && backtrack_classes.sanitize(c)
                    && input_classes.sanitize(c)
                    && lookahead_classes.sanitize(c)
                    && sets.sanitize(c)
            }
            ChainedContextLookup::Format3 {
                coverage,
                backtrack_coverages,
                input_coverages,
                lookahead_coverages,
                ..
            } => {
                coverage.sanitize(c)
                    && sanitize_coverages(backtrack_coverages, c)
                    && sanitize_coverages(input_coverages, c)
                    && sanitize_coverages(lookahead_coverages, c)
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceRuleSet<'a> {
    pub rules: LazyOffsetArray16<'a, ChainedSequenceRule<'a>>,
}

impl<'a> FromSlice<'a> for ChainedSequenceRuleSet<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let rules = LazyOffsetArray16::parse_with_base(data, &mut s)?;
        Some(ChainedSequenceRuleSet { rules })
    }
}

impl Sanitize for ChainedSequenceRuleSet<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        self.rules.sanitize(c)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ChainedSequenceRule<'a> {
    pub backtrack: LazyArray16<'a, u16>,
    /// Glyph ids or classes, starting from the second input position.
    pub input: LazyArray16<'a, u16>,
    pub lookahead: LazyArray16<'a, u16>,
    pub lookups: LazyArray16<'a, SequenceLookupRecord>,
}

impl<'a> FromSlice<'a> for ChainedSequenceRule<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let backtrack_count = s.read::<u16>()?;
        let backtrack = s.read_array16(backtrack_count)?;
        let input_count = s.read::<u16>()?;
        let input = s.read_array16(input_count.checked_sub(1)?)?;
        let lookahead_count = s.read::<u16>()?;
        let lookahead = s.read_array16(lookahead_count)?;
        let lookup_count = s.read::<u16>()?;
        let lookups = s.read_array16(lookup_count)?;
        Some(ChainedSequenceRule {
            backtrack,
            input,
            lookahead,
            lookups,
        })
    }
}

impl Sanitize for ChainedSequenceRule<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}
