//! The Glyph Positioning Table.

use alloc::vec::Vec;

use ttf_parser::GlyphId;

use super::gsubgpos::*;
use super::{DynArray, StreamExt};
use crate::parser::*;
use crate::set_digest::SetDigest;

/// A parsed and validated GPOS table.
#[derive(Clone, Debug)]
pub struct PositioningTable<'a> {
    pub inner: LayoutTable<'a>,
    pub lookups: Vec<PosLookup<'a>>,
}

impl<'a> PositioningTable<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let inner = LayoutTable::parse(data)?;
        let mut c = SanitizeContext::new(data.len());
        if !inner.sanitize(&mut c) {
            log::warn!("GPOS table is malformed and will be ignored");
            return None;
        }

        let lookups = (0..inner.lookup_count())
            .map(|i| match inner.get_lookup(LookupIndex(i)) {
                Some(lookup) => PosLookup::parse(lookup, i, &mut c),
                None => {
                    log::warn!("GPOS lookup {} is malformed and will be ignored", i);
                    PosLookup::empty()
                }
            })
            .collect();

        if c.is_exhausted() {
            log::warn!("GPOS validation ran out of operations");
        }

        Some(PositioningTable { inner, lookups })
    }
}

/// A GPOS lookup with its subtables resolved.
#[derive(Clone, Debug)]
pub struct PosLookup<'a> {
    pub subtables: Vec<PosLookupSubtable<'a>>,
    pub digest: SetDigest,
    pub props: u32,
}

impl<'a> PosLookup<'a> {
    fn parse(lookup: Lookup<'a>, index: u16, c: &mut SanitizeContext) -> Self {
        let mut subtables = Vec::new();
        for data in lookup.subtables_data() {
            match PosLookupSubtable::parse(data, lookup.kind) {
                Some(subtable) if subtable.sanitize(c) => subtables.push(subtable),
                _ => log::warn!("GPOS lookup {} has a malformed subtable", index),
            }
        }

        let mut digest = SetDigest::new();
        for subtable in &subtables {
            digest.add_coverage(&subtable.coverage());
        }

        PosLookup {
            subtables,
            digest,
            props: lookup.props(),
        }
    }

    fn empty() -> Self {
        PosLookup {
            subtables: Vec::new(),
            digest: SetDigest::new(),
            props: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum PosLookupSubtable<'a> {
    Single(SingleAdjustment<'a>),
    Pair(PairAdjustment<'a>),
    Cursive(CursiveAdjustment<'a>),
    MarkToBase(MarkToBaseAdjustment<'a>),
    MarkToLigature(MarkToLigatureAdjustment<'a>),
    MarkToMark(MarkToMarkAdjustment<'a>),
    Context(ContextLookup<'a>),
    ChainContext(ChainedContextLookup<'a>),
}

impl<'a> PosLookupSubtable<'a> {
    pub fn parse(data: &'a [u8], kind: u16) -> Option<Self> {
        match kind {
            1 => SingleAdjustment::parse(data).map(Self::Single),
            2 => PairAdjustment::parse(data).map(Self::Pair),
            3 => CursiveAdjustment::parse(data).map(Self::Cursive),
            4 => MarkToBaseAdjustment::parse(data).map(Self::MarkToBase),
            5 => MarkToLigatureAdjustment::parse(data).map(Self::MarkToLigature),
            6 => MarkToMarkAdjustment::parse(data).map(Self::MarkToMark),
            7 => ContextLookup::parse(data).map(Self::Context),
            8 => ChainedContextLookup::parse(data).map(Self::ChainContext),
            9 => parse_extension_lookup(data, |data, kind| {
                if kind == 9 {
                    None
                } else {
                    Self::parse(data, kind)
                }
            }),
            _ => None,
        }
    }

    pub fn coverage(&self) -> Coverage<'a> {
        match self {
            Self::Single(t) => t.coverage(),
            Self::Pair(t) => t.coverage(),
            Self::Cursive(t) => t.coverage,
            Self::MarkToBase(t) => t.mark_coverage,
            Self::MarkToLigature(t) => t.mark_coverage,
            Self::MarkToMark(t) => t.mark1_coverage,
            Self::Context(t) => t.coverage(),
            Self::ChainContext(t) => t.coverage(),
        }
    }
}

impl Sanitize for PosLookupSubtable<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            Self::Single(t) => t.coverage().sanitize(c),
            Self::Pair(t) => t.sanitize(c),
            Self::Cursive(t) => t.sanitize(c),
            Self::MarkToBase(t) => {
                t.mark_coverage.sanitize(c)
                    && t.base_coverage.sanitize(c)
                    && t.marks.sanitize(c)
                    && t.anchors.sanitize(c)
            }
            Self::MarkToLigature(t) => {
                t.mark_coverage.sanitize(c)
                    && t.ligature_coverage.sanitize(c)
                    && t.marks.sanitize(c)
                    && t.ligature_array.sanitize(c)
            }
            Self::MarkToMark(t) => {
                t.mark1_coverage.sanitize(c)
                    && t.mark2_coverage.sanitize(c)
                    && t.marks.sanitize(c)
                    && t.mark2_matrix.sanitize(c)
            }
            Self::Context(t) => t.sanitize(c),
            Self::ChainContext(t) => t.sanitize(c),
        }
    }
}

bitflags::bitflags! {
    /// Which fields a value record carries.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
    pub struct ValueFormatFlags: u16 {
        const X_PLACEMENT        = 0x0001;
        const Y_PLACEMENT        = 0x0002;
        const X_ADVANCE          = 0x0004;
        const Y_ADVANCE          = 0x0008;
        const X_PLACEMENT_DEVICE = 0x0010;
        const Y_PLACEMENT_DEVICE = 0x0020;
        const X_ADVANCE_DEVICE   = 0x0040;
        const Y_ADVANCE_DEVICE   = 0x0080;
    }
}

impl ValueFormatFlags {
    /// Returns the record size in bytes.
    #[inline]
    pub fn size(self) -> usize {
        u16::SIZE * self.bits().count_ones() as usize
    }
}

impl FromData for ValueFormatFlags {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Self::from_bits_truncate)
    }
}

/// A [Value Record](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#value-record).
#[derive(Clone, Copy, Default, Debug)]
pub struct ValueRecord<'a> {
    pub x_placement: i16,
    pub y_placement: i16,
    pub x_advance: i16,
    pub y_advance: i16,
    pub x_placement_device: Option<Device<'a>>,
    pub y_placement_device: Option<Device<'a>>,
    pub x_advance_device: Option<Device<'a>>,
    pub y_advance_device: Option<Device<'a>>,
}

impl<'a> ValueRecord<'a> {
    /// Reads a record. Device offsets are relative to `base`.
    pub fn read(s: &mut Stream<'a>, flags: ValueFormatFlags, base: &'a [u8]) -> Option<Self> {
        let mut record = ValueRecord::default();

        if flags.contains(ValueFormatFlags::X_PLACEMENT) {
            record.x_placement = s.read::<i16>()?;
        }

        if flags.contains(ValueFormatFlags::Y_PLACEMENT) {
            record.y_placement = s.read::<i16>()?;
        }

        if flags.contains(ValueFormatFlags::X_ADVANCE) {
            record.x_advance = s.read::<i16>()?;
        }

        if flags.contains(ValueFormatFlags::Y_ADVANCE) {
            record.y_advance = s.read::<i16>()?;
        }

        let read_device = |s: &mut Stream<'a>| -> Option<Option<Device<'a>>> {
            Some(s.read_at_optional_offset16(base)?.and_then(Device::parse))
        };

        if flags.contains(ValueFormatFlags::X_PLACEMENT_DEVICE) {
            record.x_placement_device = read_device(s)?;
        }

        if flags.contains(ValueFormatFlags::Y_PLACEMENT_DEVICE) {
            record.y_placement_device = read_device(s)?;
        }

        if flags.contains(ValueFormatFlags::X_ADVANCE_DEVICE) {
            record.x_advance_device = read_device(s)?;
        }

        if flags.contains(ValueFormatFlags::Y_ADVANCE_DEVICE) {
            record.y_advance_device = read_device(s)?;
        }

        Some(record)
    }

    pub fn is_empty(&self) -> bool {
        self.x_placement == 0
            && self.y_placement == 0
            && self.x_advance == 0
            && self.y_advance == 0
            && self.x_placement_device.is_none()
            && self.y_placement_device.is_none()
            && self.x_advance_device.is_none()
            && self.y_advance_device.is_none()
    }
}

/// An [Anchor Table](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#anchor-tables).
#[derive(Clone, Copy, Debug)]
pub struct Anchor<'a> {
    pub x: i16,
    pub y: i16,
    pub x_device: Option<Device<'a>>,
    pub y_device: Option<Device<'a>>,
}

impl<'a> FromSlice<'a> for Anchor<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        if !matches!(format, 1..=3) {
            return None;
        }

        let mut table = Anchor {
            x: s.read::<i16>()?,
            y: s.read::<i16>()?,
            x_device: None,
            y_device: None,
        };

        // Format 2 carries a contour point index, which is ignored,
        // since glyph outlines are not available here.

        if format == 3 {
            table.x_device = s.read_at_optional_offset16(data)?.and_then(Device::parse);
            table.y_device = s.read_at_optional_offset16(data)?.and_then(Device::parse);
        }

        Some(table)
    }
}

impl Sanitize for Anchor<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        c.visit()
    }
}

/// A matrix of anchor offsets: one row per base (or ligature component),
/// one column per mark class.
#[derive(Clone, Copy, Debug)]
pub struct AnchorMatrix<'a> {
    data: &'a [u8],
    pub rows: u16,
    pub cols: u16,
    matrix: LazyArray32<'a, Option<Offset16>>,
}

impl<'a> AnchorMatrix<'a> {
    pub fn parse(data: &'a [u8], cols: u16) -> Option<Self> {
        let mut s = Stream::new(data);
        let rows = s.read::<u16>()?;
        let count = u32::from(rows) * u32::from(cols);
        let matrix = s.read_array32(count)?;
        Some(AnchorMatrix {
            data,
            rows,
            cols,
            matrix,
        })
    }

    /// Returns an anchor. A null anchor results in `None`.
    pub fn get(&self, row: u16, col: u16) -> Option<Anchor<'a>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }

        let idx = u32::from(row) * u32::from(self.cols) + u32::from(col);
        let offset = self.matrix.get(idx)??.to_usize();
        Anchor::parse(self.data.get(offset..)?)
    }
}

impl Sanitize for AnchorMatrix<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        self.matrix.iter().all(|offset| match offset {
            Some(offset) => match c.check_range(self.data, offset.to_usize()) {
                Some(Some(data)) => Anchor::parse(data).is_some(),
                _ => false,
            },
            None => true,
        })
    }
}

/// A [Mark Array](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#mark-array-table).
#[derive(Clone, Copy, Debug)]
pub struct MarkArray<'a> {
    data: &'a [u8],
    array: LazyArray16<'a, MarkRecord>,
}

impl<'a> FromSlice<'a> for MarkArray<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let array = s.read_array16(count)?;
        Some(MarkArray { data, array })
    }
}

impl<'a> MarkArray<'a> {
    /// Returns the mark class and anchor for a mark coverage index.
    pub fn get(&self, index: u16) -> Option<(Class, Anchor<'a>)> {
        let record = self.array.get(index)?;
        let anchor = self
            .data
            .get(record.mark_anchor.to_usize()..)
            .and_then(Anchor::parse)?;
        Some((record.class, anchor))
    }

    pub fn len(&self) -> u16 {
        self.array.len()
    }
}

impl Sanitize for MarkArray<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        self.array
            .into_iter()
            .all(|record| match c.check_range(self.data, record.mark_anchor.to_usize()) {
                Some(Some(data)) => Anchor::parse(data).is_some(),
                _ => false,
            })
    }
}

#[derive(Clone, Copy, Debug)]
struct MarkRecord {
    class: Class,
    mark_anchor: Offset16,
}

impl FromData for MarkRecord {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(MarkRecord {
            class: s.read()?,
            mark_anchor: s.read()?,
        })
    }
}

/// A [Single Adjustment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#SP).
#[derive(Clone, Copy, Debug)]
pub enum SingleAdjustment<'a> {
    Format1 {
        coverage: Coverage<'a>,
        value: ValueRecord<'a>,
    },
    Format2 {
        data: &'a [u8],
        coverage: Coverage<'a>,
        flags: ValueFormatFlags,
        values: DynArray<'a>,
    },
}

impl<'a> SingleAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let flags = s.read::<ValueFormatFlags>()?;
                let value = ValueRecord::read(&mut s, flags, data)?;
                Some(Self::Format1 { coverage, value })
            }
            2 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let flags = s.read::<ValueFormatFlags>()?;
                let count = s.read::<u16>()?;
                let values = s.read_dyn_array(usize::from(count), flags.size())?;
                Some(Self::Format2 {
                    data,
                    coverage,
                    flags,
                    values,
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

    /// Returns the value record for a coverage index.
    pub fn value(&self, index: u16) -> Option<ValueRecord<'a>> {
        match *self {
            Self::Format1 { value, .. } => Some(value),
            Self::Format2 {
                data,
                flags,
                values,
                ..
            } => {
                let record = values.get(usize::from(index))?;
                ValueRecord::read(&mut Stream::new(record), flags, data)
            }
        }
    }
}

/// A [Pair Adjustment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#PP).
#[derive(Clone, Copy, Debug)]
pub enum PairAdjustment<'a> {
    Format1 {
        coverage: Coverage<'a>,
        sets: PairSets<'a>,
    },
    Format2 {
        coverage: Coverage<'a>,
        classes: (ClassDef<'a>, ClassDef<'a>),
        matrix: ClassMatrix<'a>,
    },
}

impl<'a> PairAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        let format: u16 = s.read()?;
        match format {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let flags = (s.read::<ValueFormatFlags>()?, s.read::<ValueFormatFlags>()?);
                let count = s.read::<u16>()?;
                let offsets = s.read_array16(count)?;
                Some(Self::Format1 {
                    coverage,
                    sets: PairSets {
                        data,
                        flags,
                        offsets,
                    },
                })
            }
            2 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let flags = (s.read::<ValueFormatFlags>()?, s.read::<ValueFormatFlags>()?);
                let classes = (
                    ClassDef::parse(s.read_at_offset16(data)?)?,
                    ClassDef::parse(s.read_at_offset16(data)?)?,
                );
                let counts = (s.read::<u16>()?, s.read::<u16>()?);
                let count = usize::from(counts.0) * usize::from(counts.1);
                let stride = flags.0.size() + flags.1.size();
                let matrix = ClassMatrix {
                    data,
                    counts,
                    flags,
                    records: s.read_dyn_array(count, stride)?,
                };
                Some(Self::Format2 {
                    coverage,
                    classes,
                    matrix,
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

impl Sanitize for PairAdjustment<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            Self::Format1 { coverage, sets } => {
                coverage.sanitize(c)
                    && (0..sets.len()).all(|i| match sets.offsets.get(i) {
                        Some(offset) => match c.check_range(sets.data, offset.to_usize()) {
                            Some(Some(_)) => sets.get(i).is_some(),
                            _ => false,
                        },
                        None => false,
                    })
            }
            Self::Format2 {
                coverage, classes, ..
            } => coverage.sanitize(c) && classes.0.sanitize(c) && classes.1.sanitize(c),
        }
    }
}

/// A list of pair sets, indexed by the first glyph coverage index.
#[derive(Clone, Copy, Debug)]
pub struct PairSets<'a> {
    data: &'a [u8],
    flags: (ValueFormatFlags, ValueFormatFlags),
    offsets: LazyArray16<'a, Offset16>,
}

impl<'a> PairSets<'a> {
    pub fn len(&self) -> u16 {
        self.offsets.len()
    }

    pub fn get(&self, index: u16) -> Option<PairSet<'a>> {
        let offset = self.offsets.get(index)?.to_usize();
        PairSet::parse(self.data.get(offset..)?, self.flags)
    }
}

/// A set of pair records sharing the first glyph.
#[derive(Clone, Copy, Debug)]
pub struct PairSet<'a> {
    data: &'a [u8],
    flags: (ValueFormatFlags, ValueFormatFlags),
    records: DynArray<'a>,
}

impl<'a> PairSet<'a> {
    fn parse(data: &'a [u8], flags: (ValueFormatFlags, ValueFormatFlags)) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let stride = GlyphId::SIZE + flags.0.size() + flags.1.size();
        let records = s.read_dyn_array(usize::from(count), stride)?;
        Some(PairSet {
            data,
            flags,
            records,
        })
    }

    /// Returns the value records for the second glyph.
    ///
    /// Device offsets are relative to the pair set.
    pub fn get(&self, second: GlyphId) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        let (_, record) = self.records.binary_search_by(|data| {
            Stream::read_at::<GlyphId>(data, 0)
                .unwrap_or(GlyphId(0))
                .cmp(&second)
        })?;

        let mut s = Stream::new(record);
        s.skip::<GlyphId>();
        Some((
            ValueRecord::read(&mut s, self.flags.0, self.data)?,
            ValueRecord::read(&mut s, self.flags.1, self.data)?,
        ))
    }

    /// Checks if the second value record is present.
    pub fn has_second_value(&self) -> bool {
        !self.flags.1.is_empty()
    }
}

/// A class-pair value matrix.
#[derive(Clone, Copy, Debug)]
pub struct ClassMatrix<'a> {
    data: &'a [u8],
    counts: (u16, u16),
    flags: (ValueFormatFlags, ValueFormatFlags),
    records: DynArray<'a>,
}

impl<'a> ClassMatrix<'a> {
    pub fn get(&self, classes: (u16, u16)) -> Option<(ValueRecord<'a>, ValueRecord<'a>)> {
        if classes.0 >= self.counts.0 || classes.1 >= self.counts.1 {
            return None;
        }

        let idx = usize::from(classes.0) * usize::from(self.counts.1) + usize::from(classes.1);
        let record = self.records.get(idx)?;

        let mut s = Stream::new(record);
        Some((
            ValueRecord::read(&mut s, self.flags.0, self.data)?,
            ValueRecord::read(&mut s, self.flags.1, self.data)?,
        ))
    }

    /// Checks if the second value record is present.
    pub fn has_second_value(&self) -> bool {
        !self.flags.1.is_empty()
    }
}

/// A [Cursive Attachment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#CAP).
#[derive(Clone, Copy, Debug)]
pub struct CursiveAdjustment<'a> {
    pub coverage: Coverage<'a>,
    data: &'a [u8],
    entry_exits: LazyArray16<'a, EntryExitRecord>,
}

impl<'a> CursiveAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let count = s.read::<u16>()?;
                let entry_exits = s.read_array16(count)?;
                Some(CursiveAdjustment {
                    coverage,
                    data,
                    entry_exits,
                })
            }
            _ => None,
        }
    }

    /// Returns the entry anchor for a coverage index.
    pub fn entry(&self, index: u16) -> Option<Anchor<'a>> {
        let record = self.entry_exits.get(index)?;
        self.anchor(record.entry_anchor)
    }

    /// Returns the exit anchor for a coverage index.
    pub fn exit(&self, index: u16) -> Option<Anchor<'a>> {
        let record = self.entry_exits.get(index)?;
        self.anchor(record.exit_anchor)
    }

    fn anchor(&self, offset: Option<Offset16>) -> Option<Anchor<'a>> {
        Anchor::parse(self.data.get(offset?.to_usize()..)?)
    }
}

impl Sanitize for CursiveAdjustment<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !self.coverage.sanitize(c) {
            return false;
        }

        self.entry_exits.into_iter().all(|record| {
            [record.entry_anchor, record.exit_anchor]
                .iter()
                .all(|offset| match offset {
                    Some(offset) => match c.check_range(self.data, offset.to_usize()) {
                        Some(Some(data)) => Anchor::parse(data).is_some(),
                        _ => false,
                    },
                    None => true,
                })
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct EntryExitRecord {
    entry_anchor: Option<Offset16>,
    exit_anchor: Option<Offset16>,
}

impl FromData for EntryExitRecord {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        Some(EntryExitRecord {
            entry_anchor: s.read()?,
            exit_anchor: s.read()?,
        })
    }
}

/// A [Mark-to-Base Attachment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#MBP).
#[derive(Clone, Copy, Debug)]
pub struct MarkToBaseAdjustment<'a> {
    pub mark_coverage: Coverage<'a>,
    pub base_coverage: Coverage<'a>,
    pub marks: MarkArray<'a>,
    pub anchors: AnchorMatrix<'a>,
}

impl<'a> MarkToBaseAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let mark_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let base_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let class_count = s.read::<u16>()?;
                let marks = MarkArray::parse(s.read_at_offset16(data)?)?;
                let anchors = AnchorMatrix::parse(s.read_at_offset16(data)?, class_count)?;
                Some(MarkToBaseAdjustment {
                    mark_coverage,
                    base_coverage,
                    marks,
                    anchors,
                })
            }
            _ => None,
        }
    }
}

/// A [Mark-to-Ligature Attachment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#MLP).
#[derive(Clone, Copy, Debug)]
pub struct MarkToLigatureAdjustment<'a> {
    pub mark_coverage: Coverage<'a>,
    pub ligature_coverage: Coverage<'a>,
    pub marks: MarkArray<'a>,
    pub ligature_array: LigatureArray<'a>,
}

impl<'a> MarkToLigatureAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let mark_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let ligature_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let class_count = s.read::<u16>()?;
                let marks = MarkArray::parse(s.read_at_offset16(data)?)?;
                let ligature_array = LigatureArray::parse(s.read_at_offset16(data)?, class_count)?;
                Some(MarkToLigatureAdjustment {
                    mark_coverage,
                    ligature_coverage,
                    marks,
                    ligature_array,
                })
            }
            _ => None,
        }
    }
}

/// A list of per-ligature anchor matrices.
#[derive(Clone, Copy, Debug)]
pub struct LigatureArray<'a> {
    data: &'a [u8],
    class_count: u16,
    offsets: LazyArray16<'a, Offset16>,
}

impl<'a> LigatureArray<'a> {
    fn parse(data: &'a [u8], class_count: u16) -> Option<Self> {
        let mut s = Stream::new(data);
        let count = s.read::<u16>()?;
        let offsets = s.read_array16(count)?;
        Some(LigatureArray {
            data,
            class_count,
            offsets,
        })
    }

    /// Returns the anchor matrix of a ligature: one row per component.
    pub fn get(&self, index: u16) -> Option<AnchorMatrix<'a>> {
        let offset = self.offsets.get(index)?.to_usize();
        AnchorMatrix::parse(self.data.get(offset..)?, self.class_count)
    }
}

impl Sanitize for LigatureArray<'_> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        (0..self.offsets.len()).all(|i| match self.get(i) {
            Some(matrix) => matrix.sanitize(c),
            None => false,
        })
    }
}

/// A [Mark-to-Mark Attachment Positioning Subtable](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos#MMP).
#[derive(Clone, Copy, Debug)]
pub struct MarkToMarkAdjustment<'a> {
    pub mark1_coverage: Coverage<'a>,
    pub mark2_coverage: Coverage<'a>,
    pub marks: MarkArray<'a>,
    pub mark2_matrix: AnchorMatrix<'a>,
}

impl<'a> MarkToMarkAdjustment<'a> {
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let mut s = Stream::new(data);
        match s.read::<u16>()? {
            1 => {
                let mark1_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let mark2_coverage = Coverage::parse(s.read_at_offset16(data)?)?;
                let class_count = s.read::<u16>()?;
                let marks = MarkArray::parse(s.read_at_offset16(data)?)?;
                let mark2_matrix = AnchorMatrix::parse(s.read_at_offset16(data)?, class_count)?;
                Some(MarkToMarkAdjustment {
                    mark1_coverage,
                    mark2_coverage,
                    marks,
                    mark2_matrix,
                })
            }
            _ => None,
        }
    }
}
