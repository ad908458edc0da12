//! The Glyph Substitution Table.

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use super::gsubgpos::*;
use crate::parser::*;
use crate::set_digest::SetDigest;

/// A parsed and validated GSUB table.
#[derive(Clone, Debug)]
pub struct SubstitutionTable<'a> {
    pub inner: LayoutTable<'a>,
    pub lookups: Vec<SubstLookup<'a>>,
}

impl<'a> SubstitutionTable<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let inner = LayoutTable::parse(data)?;
        let mut c = SanitizeContext::new(data.len());
        if !inner.sanitize(&mut c) {
            log::warn!("GSUB table is malformed and will be ignored");
            return None;
        }

        let lookups = (0..inner.lookup_count())
            .map(|i| match inner.get_lookup(LookupIndex(i)) {
                Some(lookup) => SubstLookup::parse(lookup, i, &mut c),
                None => {
                    log::warn!("GSUB lookup {} is malformed and will be ignored", i);
                    SubstLookup::empty()
                }
            })
            .collect();

        if c.is_exhausted() {
            log::warn!("GSUB validation ran out of operations");
        }

        Some(SubstitutionTable { inner, lookups })
    }
}

/// A GSUB lookup with its subtables resolved.
#[derive(Clone, Debug)]
pub struct SubstLookup<'a> {
    pub subtables: Vec<SubstLookupSubtable<'a>>,
    pub digest: SetDigest,
    pub reverse: bool,
    pub props: u32,
}

impl<'a> SubstLookup<'a> {
    fn parse(lookup: Lookup<'a>, index: u16, c: &mut SanitizeContext) -> Self {
        let mut subtables = Vec::new();
        for data in lookup.subtables_data() {
            let subtable = SubstLookupSubtable::parse(data, lookup.kind);
            match subtable {
                Some(subtable) if subtable.sanitize(c) => subtables.push(subtable),
                _ => log::warn!("GSUB lookup {} has a malformed subtable", index),
            }
        }

        let mut digest = SetDigest::new();
        let mut reverse = !subtables.is_empty();
        for subtable in &subtables {
            digest.add_coverage(&subtable.coverage());
            reverse &= subtable.is_reverse();
        }

        SubstLookup {
            subtables,
            digest,
            reverse,
            props: lookup.props(),
        }
    }

    fn empty() -> Self {
        SubstLookup {
            subtables: Vec::new(),
            digest: SetDigest::new(),
            reverse: false,
            props: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum SubstLookupSubtable<'a> {
    Single(SingleSubstitution<'a>),
    Multiple(MultipleSubstitution<'a>),
    Alternate(AlternateSubstitution<'a>),
    Ligature(LigatureSubstitution<'a>),
    Context(ContextLookup<'a>),
    ChainContext(ChainedContextLookup<'a>),
    ReverseChainSingle(ReverseChainSingleSubstitution<'a>),
}

impl<'a> SubstLookupSubtable<'a> {
    pub fn parse(data: &'a [u8], kind: u16) -> Option<Self> {
        match kind {
            1 => SingleSubstitution::parse(data).map(Self::Single),
            2 => MultipleSubstitution::parse(data).map(Self::Multiple),
            3 => AlternateSubstitution::parse(data).map(Self::Alternate),
            4 => LigatureSubstitution::parse(data).map(Self::Ligature),
            5 => ContextLookup::parse(data).map(Self::Context),
            6 => ChainedContextLookup::parse(data).map(Self::ChainContext),
            7 => parse_extension_lookup(data, |data, kind| {
                // Nested extensions are not allowed.
                if kind == 7 {
                    None
                } else {
                    Self::parse(data, kind)
                }
            }),
            8 => ReverseChainSingleSubstitution::parse(data).map(Self::ReverseChainSingle),
            _ => None,
        }
    }

    pub fn coverage(&self) -> Coverage<'a> {
        match self {
            Self::Single(t) => t.coverage(),
            Self::Multiple(t) => t.coverage,
            Self::Alternate(t) => t.coverage,
            Self::Ligature(t) => t.coverage,
            Self::Context(t) => t.coverage(),
            Self::ChainContext(t) => t.coverage(),
            Self::ReverseChainSingle(t) => t.coverage,
        }
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::ReverseChainSingle(_))
    }
}

impl Sanitize for SubstLookupSubtable<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            Self::Single(t) => t.coverage().sanitize(c),
            Self::Multiple(t) => t.coverage.sanitize(c) && t.sequences.sanitize(c),
            Self::Alternate(t) => t.coverage.sanitize(c) && t.alternate_sets.sanitize(c),
            Self::Ligature(t) => t.coverage.sanitize(c) && t.ligature_sets.sanitize(c),
            Self::Context(t) => t.sanitize(c),
            Self::ChainContext(t) => t.sanitize(c),
            Self::ReverseChainSingle(t) => t.sanitize(c),
        }
    }
}

/// A [Single Substitution Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub#SS).
#[derive(Clone, Copy, Debug)]
pub enum SingleSubstitution<'a> {
    Format1 {
        coverage: Coverage<'a>,
        delta: i16,
    },
    Format2 {
        coverage: Coverage<'a>,
        substitutes: LazyArray16<'a, GlyphId>,
    },
}

impl<'a> SingleSubstitution<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let delta = s.read::<i16>()?;
                Some(Self::Format1 { coverage, delta })
            }
            2 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let count = s.read::<u16>()?;
                let substitutes = s.read_array16(count)?;
                Some(Self::Format2 {
                    coverage,
                    substitutes,
                })
            }
            _ => None,
        }
    }

    pub fn coverage(&self) -> Coverage<'a> {
        match *self {
            Self::Format1 { coverage, .. } => coverage,
            Self::Format2 { coverage, .. } => coverage,
        }
    }
}

/// A sequence of glyphs for a multiple substitution.
#[derive(Clone, Copy, Debug)]
pub struct Sequence<'a> {
    pub substitutes: LazyArray16<'a, GlyphId>,
}

impl<'a> FromSlice<'a> for Sequence<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let substitutes = s.read_array16(count)?;
        Some(Sequence { substitutes })
    }
}

impl Sanitize for Sequence<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A [Multiple Substitution Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub#MS).
#[derive(Clone, Copy, Debug)]
pub struct MultipleSubstitution<'a> {
    pub coverage: Coverage<'a>,
    pub sequences: LazyOffsetArray16<'a, Sequence<'a>>,
}

impl<'a> MultipleSubstitution<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let sequences = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(MultipleSubstitution {
                    coverage,
                    sequences,
                })
            }
            _ => None,
        }
    }
}

/// A list of glyphs for an alternate substitution.
#[derive(Clone, Copy, Debug)]
pub struct AlternateSet<'a> {
    pub alternates: LazyArray16<'a, GlyphId>,
}

impl<'a> FromSlice<'a> for AlternateSet<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let alternates = s.read_array16(count)?;
        Some(AlternateSet { alternates })
    }
}

impl Sanitize for AlternateSet<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// An [Alternate Substitution Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub#AS).
#[derive(Clone, Copy, Debug)]
pub struct AlternateSubstitution<'a> {
    pub coverage: Coverage<'a>,
    pub alternate_sets: LazyOffsetArray16<'a, AlternateSet<'a>>,
}

impl<'a> AlternateSubstitution<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let alternate_sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(AlternateSubstitution {
                    coverage,
                    alternate_sets,
                })
            }
            _ => None,
        }
    }
}

/// Glyph components for one ligature.
#[derive(Clone, Copy, Debug)]
pub struct Ligature<'a> {
    /// Ligature to substitute.
    pub glyph: GlyphId,
    /// Glyph components for one ligature, starting from the second one.
    pub components: LazyArray16<'a, GlyphId>,
}

impl<'a> FromSlice<'a> for Ligature<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let glyph = s.read::<GlyphId>()?;
        let count = s.read::<u16>()?;
        let components = s.read_array16(count.checked_sub(1)?)?;
        Some(Ligature { glyph, components })
    }
}

impl Sanitize for Ligature<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A set of ligatures starting with the same glyph, in preference order.
#[derive(Clone, Copy, Debug)]
pub struct LigatureSet<'a> {
    pub ligatures: LazyOffsetArray16<'a, Ligature<'a>>,
}

impl<'a> FromSlice<'a> for LigatureSet<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let ligatures = LazyOffsetArray16::parse_with_base(data, &mut s)?;
        Some(LigatureSet { ligatures })
    }
}

impl Sanitize for LigatureSet<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        self.ligatures.sanitize(c)
    }
}

/// A [Ligature Substitution Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub#LS).
#[derive(Clone, Copy, Debug)]
pub struct LigatureSubstitution<'a> {
    pub coverage: Coverage<'a>,
    pub ligature_sets: LazyOffsetArray16<'a, LigatureSet<'a>>,
}

impl<'a> LigatureSubstitution<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let ligature_sets = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                Some(LigatureSubstitution {
                    coverage,
                    ligature_sets,
                })
            }
            _ => None,
        }
    }
}

/// A [Reverse Chaining Contextual Single Substitution Subtable](
/// https://docs.microsoft.com/en-us/typography/opentype/spec/gsub#RCCS).
#[derive(Clone, Copy, Debug)]
pub struct ReverseChainSingleSubstitution<'a> {
    pub coverage: Coverage<'a>,
    pub backtrack_coverages: LazyOffsetArray16<'a, Coverage<'a>>,
    pub lookahead_coverages: LazyOffsetArray16<'a, Coverage<'a>>,
    pub substitutes: LazyArray16<'a, GlyphId>,
}

impl<'a> ReverseChainSingleSubstitution<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let backtrack_coverages = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                let lookahead_coverages = LazyOffsetArray16::parse_with_base(data, &mut s)?;
                let count = s.read::<u16>()?;
                let substitutes = s.read_array16(count)?;
                Some(ReverseChainSingleSubstitution {
                    coverage,
                    backtrack_coverages,
                    lookahead_coverages,
                    substitutes,
                })
            }
            _ => None,
        }
    }
}

impl<'a> Sanitize for ReverseChainSingleSubstitution<'a> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        let all_present = |array: &LazyOffsetArray16<'a, Coverage<'a>>| {
            (0..array.len()).all(|i| !array.is_null(i) && array.get(i).is_some())
        };

        self.coverage.sanitize(c)
            && all_present(&self.backtrack_coverages)
            && all_present(&self.lookahead_coverages)
            && self.backtrack_coverages.sanitize(c)
            && self.lookahead_coverages.sanitize(c)
    }
}
