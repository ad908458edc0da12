//! Binary parsing utils.
//!
//! Everything here is a read-only view into a font table. Every read is
//! bounds-checked and a failed read produces `None`, never a panic.

use core::cmp::Ordering;
use core::convert::TryInto;
use core::ops::Range;

use ttf_parser::{GlyphId, Tag};

/// A trait for parsing raw binary data of a fixed size.
pub trait FromData: Sized {
    /// Object's raw data size.
    const SIZE: usize;

    /// Parses an object from a raw data.
    fn parse(data: &[u8]) -> Option<Self>;
}

/// A trait for parsing raw binary data of a variable size.
pub trait FromSlice<'a>: Sized {
    /// Parses an object from a raw data.
    fn parse(data: &'a [u8]) -> Option<Self>;
}

impl FromData for () {
    const SIZE: usize = 0;

    #[inline]
    fn parse(_: &[u8]) -> Option<Self> {
        Some(())
    }
}

impl FromData for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.first().copied()
    }
}

impl FromData for i8 {
    const SIZE: usize = 1;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.first().map(|n| *n as i8)
    }
}

impl FromData for u16 {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.get(0..2)?.try_into().ok().map(u16::from_be_bytes)
    }
}

impl FromData for i16 {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.get(0..2)?.try_into().ok().map(i16::from_be_bytes)
    }
}

impl FromData for u32 {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.get(0..4)?.try_into().ok().map(u32::from_be_bytes)
    }
}

impl FromData for i32 {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        data.get(0..4)?.try_into().ok().map(i32::from_be_bytes)
    }
}

impl FromData for GlyphId {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(GlyphId)
    }
}

impl FromData for Tag {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u32::parse(data).map(Tag)
    }
}

/// A 16-bit signed fixed number with the low 14 bits of fraction (2.14).
#[derive(Clone, Copy, Debug)]
pub struct F2Dot14(pub i16);

impl F2Dot14 {
    #[inline]
    pub fn to_f32(self) -> f32 {
        f32::from(self.0) / 16384.0
    }
}

impl FromData for F2Dot14 {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        i16::parse(data).map(F2Dot14)
    }
}

/// A common offset methods.
pub trait Offset {
    /// Converts the offset to `usize`.
    fn to_usize(&self) -> usize;

    /// Checks that offset is null.
    fn is_null(&self) -> bool {
        self.to_usize() == 0
    }
}

/// A type-safe u16 offset.
#[derive(Clone, Copy, PartialEq, Default, Debug)]
pub struct Offset16(pub u16);

impl Offset for Offset16 {
    #[inline]
    fn to_usize(&self) -> usize {
        usize::from(self.0)
    }
}

impl FromData for Offset16 {
    const SIZE: usize = 2;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Offset16)
    }
}

impl FromData for Option<Offset16> {
    const SIZE: usize = Offset16::SIZE;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let offset = Offset16::parse(data)?;
        if offset.0 != 0 {
            Some(Some(offset))
        } else {
            Some(None)
        }
    }
}

/// A type-safe u32 offset.
#[derive(Clone, Copy, PartialEq, Default, Debug)]
pub struct Offset32(pub u32);

impl Offset for Offset32 {
    #[inline]
    fn to_usize(&self) -> usize {
        self.0 as usize
    }
}

impl FromData for Offset32 {
    const SIZE: usize = 4;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        u32::parse(data).map(Offset32)
    }
}

impl FromData for Option<Offset32> {
    const SIZE: usize = Offset32::SIZE;

    #[inline]
    fn parse(data: &[u8]) -> Option<Self> {
        let offset = Offset32::parse(data)?;
        if offset.0 != 0 {
            Some(Some(offset))
        } else {
            Some(None)
        }
    }
}

/// A streaming binary parser.
#[derive(Clone, Copy, Default, Debug)]
pub struct Stream<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Stream<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Stream { data, offset: 0 }
    }

    #[inline]
    pub fn new_at(data: &'a [u8], offset: usize) -> Option<Self> {
        if offset <= data.len() {
            Some(Stream { data, offset })
        } else {
            None
        }
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn tail(&self) -> Option<&'a [u8]> {
        self.data.get(self.offset..)
    }

    #[inline]
    pub fn skip<T: FromData>(&mut self) {
        self.advance(T::SIZE);
    }

    #[inline]
    pub fn advance(&mut self, len: usize) {
        self.offset += len;
    }

    #[inline]
    pub fn read<T: FromData>(&mut self) -> Option<T> {
        self.read_bytes(T::SIZE).and_then(T::parse)
    }

    #[inline]
    pub fn read_at<T: FromData>(data: &[u8], offset: usize) -> Option<T> {
        data.get(offset..offset.checked_add(T::SIZE)?).and_then(T::parse)
    }

    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        let v = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(v)
    }

    #[inline]
    pub fn read_array16<T: FromData>(&mut self, count: u16) -> Option<LazyArray16<'a, T>> {
        let len = usize::from(count) * T::SIZE;
        self.read_bytes(len).map(LazyArray16::new)
    }

    #[inline]
    pub fn read_array32<T: FromData>(&mut self, count: u32) -> Option<LazyArray32<'a, T>> {
        let len = (count as usize).checked_mul(T::SIZE)?;
        self.read_bytes(len).map(LazyArray32::new)
    }

    /// Reads an offset and returns the data it points to, relative to `base`.
    #[inline]
    pub fn read_at_offset16(&mut self, base: &'a [u8]) -> Option<&'a [u8]> {
        let offset = self.read::<Offset16>()?.to_usize();
        base.get(offset..)
    }

    /// Reads an offset and returns the data it points to, relative to `base`.
    #[inline]
    pub fn read_at_offset32(&mut self, base: &'a [u8]) -> Option<&'a [u8]> {
        let offset = self.read::<Offset32>()?.to_usize();
        base.get(offset..)
    }

    /// Reads a nullable offset. A null offset yields `Some(None)`.
    #[inline]
    pub fn read_at_optional_offset16(&mut self, base: &'a [u8]) -> Option<Option<&'a [u8]>> {
        match self.read::<Option<Offset16>>()? {
            Some(offset) => base.get(offset.to_usize()..).map(Some),
            None => Some(None),
        }
    }
}

/// A slice-like container that converts internal binary data only on access.
///
/// Array values are stored in a continuous data chunk.
pub struct LazyArray16<'a, T> {
    data: &'a [u8],
    data_type: core::marker::PhantomData<T>,
}

impl<T> Clone for LazyArray16<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LazyArray16<'_, T> {}

impl<T> Default for LazyArray16<'_, T> {
    #[inline]
    fn default() -> Self {
        LazyArray16 {
            data: &[],
            data_type: core::marker::PhantomData,
        }
    }
}

impl<'a, T: FromData> LazyArray16<'a, T> {
    /// Creates a new `LazyArray`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        LazyArray16 {
            data,
            data_type: core::marker::PhantomData,
        }
    }

    /// Returns a value at `index`.
    #[inline]
    pub fn get(&self, index: u16) -> Option<T> {
        if index < self.len() {
            let start = usize::from(index) * T::SIZE;
            let end = start + T::SIZE;
            self.data.get(start..end).and_then(T::parse)
        } else {
            None
        }
    }

    /// Returns the last value.
    #[inline]
    pub fn last(&self) -> Option<T> {
        if !self.is_empty() {
            self.get(self.len() - 1)
        } else {
            None
        }
    }

    /// Returns sub-array.
    #[inline]
    pub fn slice(&self, range: Range<u16>) -> Option<Self> {
        let start = usize::from(range.start) * T::SIZE;
        let end = usize::from(range.end) * T::SIZE;
        Some(LazyArray16 {
            data: self.data.get(start..end)?,
            ..LazyArray16::default()
        })
    }

    /// Returns array's length.
    #[inline]
    pub fn len(&self) -> u16 {
        (self.data.len() / T::SIZE) as u16
    }

    /// Checks if array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Performs a binary search by specified `key`.
    #[inline]
    pub fn binary_search(&self, key: &T) -> Option<(u16, T)>
    where
        T: Ord,
    {
        self.binary_search_by(|p| p.cmp(key))
    }

    /// Performs a binary search using specified closure.
    #[inline]
    pub fn binary_search_by<F>(&self, mut f: F) -> Option<(u16, T)>
    where
        F: FnMut(&T) -> Ordering,
    {
        // Based on Rust std implementation.

        let mut size = self.len();
        if size == 0 {
            return None;
        }

        let mut base = 0;
        while size > 1 {
            let half = size / 2;
            let mid = base + half;
            // mid is always in [0, size), that means mid is >= 0 and < size.
            // mid >= 0: by definition
            // mid < size: mid = size / 2 + size / 4 + size / 8 ...
            let cmp = f(&self.get(mid)?);
            base = if cmp == Ordering::Greater { base } else { mid };
            size -= half;
        }

        // base is always in [0, size) because base <= mid.
        let value = self.get(base)?;
        if f(&value) == Ordering::Equal {
            Some((base, value))
        } else {
            None
        }
    }

    /// Returns an iterator over the array.
    #[inline]
    pub fn iter(&self) -> LazyArrayIter16<'a, T> {
        LazyArrayIter16 {
            data: *self,
            index: 0,
        }
    }
}

impl<'a, T: FromData + core::fmt::Debug + Copy> core::fmt::Debug for LazyArray16<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_list().entries(*self).finish()
    }
}

impl<'a, T: FromData> IntoIterator for LazyArray16<'a, T> {
    type Item = T;
    type IntoIter = LazyArrayIter16<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        LazyArrayIter16 {
            data: self,
            index: 0,
        }
    }
}

/// An iterator over `LazyArray16`.
#[derive(Clone, Copy)]
#[allow(missing_debug_implementations)]
pub struct LazyArrayIter16<'a, T> {
    data: LazyArray16<'a, T>,
    index: u16,
}

impl<T: FromData> Default for LazyArrayIter16<'_, T> {
    #[inline]
    fn default() -> Self {
        LazyArrayIter16 {
            data: LazyArray16::new(&[]),
            index: 0,
        }
    }
}

impl<'a, T: FromData> Iterator for LazyArrayIter16<'a, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let v = self.data.get(self.index)?;
        self.index += 1;
        Some(v)
    }

    #[inline]
    fn count(self) -> usize {
        usize::from(self.data.len().saturating_sub(self.index))
    }
}

/// A slice-like container that converts internal binary data only on access.
///
/// This is a low-level, internal structure that should not be used directly.
pub struct LazyArray32<'a, T> {
    data: &'a [u8],
    data_type: core::marker::PhantomData<T>,
}

impl<T> Clone for LazyArray32<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LazyArray32<'_, T> {}

impl<T> Default for LazyArray32<'_, T> {
    #[inline]
    fn default() -> Self {
        LazyArray32 {
            data: &[],
            data_type: core::marker::PhantomData,
        }
    }
}

impl<'a, T: FromData> LazyArray32<'a, T> {
    /// Creates a new `LazyArray`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        LazyArray32 {
            data,
            data_type: core::marker::PhantomData,
        }
    }

    /// Returns a value at `index`.
    #[inline]
    pub fn get(&self, index: u32) -> Option<T> {
        if index < self.len() {
            let start = index as usize * T::SIZE;
            let end = start + T::SIZE;
            self.data.get(start..end).and_then(T::parse)
        } else {
            None
        }
    }

    /// Returns array's length.
    #[inline]
    pub fn len(&self) -> u32 {
        (self.data.len() / T::SIZE) as u32
    }

    /// Checks if array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the array.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
    {
        let data = *self;
        (0..data.len()).filter_map(move |i| data.get(i))
    }
}

impl<'a, T: FromData + core::fmt::Debug + Copy> core::fmt::Debug for LazyArray32<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// An array of offsets to `T`, relative to the start of `data`.
///
/// Null offsets and offsets pointing outside of `data` are returned as `None`.
pub struct LazyOffsetArray16<'a, T: FromSlice<'a>> {
    data: &'a [u8],
    offsets: LazyArray16<'a, Option<Offset16>>,
    data_type: core::marker::PhantomData<T>,
}

impl<'a, T: FromSlice<'a>> Clone for LazyOffsetArray16<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: FromSlice<'a>> Copy for LazyOffsetArray16<'a, T> {}

impl<'a, T: FromSlice<'a>> Default for LazyOffsetArray16<'a, T> {
    fn default() -> Self {
        Self {
            data: &[],
            offsets: LazyArray16::new(&[]),
            data_type: core::marker::PhantomData,
        }
    }
}

impl<'a, T: FromSlice<'a>> LazyOffsetArray16<'a, T> {
    /// Creates a new `LazyOffsetArray16`.
    pub fn new(data: &'a [u8], offsets: LazyArray16<'a, Option<Offset16>>) -> Self {
        Self {
            data,
            offsets,
            data_type: core::marker::PhantomData,
        }
    }

    /// Parses `LazyOffsetArray16` from raw data.
    ///
    /// `data` should point to the `count` field; offsets are relative to `base`.
    pub fn parse_with_base(base: &'a [u8], s: &mut Stream<'a>) -> Option<Self> {
        let count = s.read::<u16>()?;
        let offsets = s.read_array16(count)?;
        Some(Self::new(base, offsets))
    }

    /// Returns a value at `index`.
    #[inline]
    pub fn get(&self, index: u16) -> Option<T> {
        let offset = self.offsets.get(index)??.to_usize();
        self.data.get(offset..).and_then(T::parse)
    }

    /// Checks that offset at `index` is null.
    #[inline]
    pub fn is_null(&self, index: u16) -> bool {
        matches!(self.offsets.get(index), Some(None))
    }

    /// Returns array's length.
    #[inline]
    pub fn len(&self) -> u16 {
        self.offsets.len()
    }

    /// Checks if array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over non-null entries.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a
    where
        T: 'a,
    {
        let array = *self;
        (0..array.len()).filter_map(move |i| array.get(i))
    }
}

impl<'a, T: FromSlice<'a> + core::fmt::Debug + 'a> core::fmt::Debug for LazyOffsetArray16<'a, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Structural validation state.
///
/// Tables are walked once, at face creation, before any lookup is trusted.
/// Each structural step consumes one operation from a budget proportional to
/// the blob size. When the budget is exhausted every further check fails,
/// which bounds the time spent on fonts with adversarial offset graphs.
pub struct SanitizeContext {
    max_ops: i32,
    blob_len: usize,
}

impl SanitizeContext {
    pub const MAX_OPS_FACTOR: usize = 8;
    pub const MAX_OPS_MIN: usize = 16384;
    pub const MAX_OPS_MAX: usize = 0x3FFFFFFF;

    /// Creates a new context for a blob of `blob_len` bytes.
    pub fn new(blob_len: usize) -> Self {
        let ops = blob_len
            .saturating_mul(Self::MAX_OPS_FACTOR)
            .clamp(Self::MAX_OPS_MIN, Self::MAX_OPS_MAX);
        SanitizeContext {
            max_ops: ops as i32,
            blob_len,
        }
    }

    /// Creates a context with an explicit operations budget.
    pub fn with_max_ops(blob_len: usize, max_ops: i32) -> Self {
        SanitizeContext { max_ops, blob_len }
    }

    /// Returns the size of the blob being validated.
    #[inline]
    pub fn blob_len(&self) -> usize {
        self.blob_len
    }

    /// Returns the number of operations left.
    #[inline]
    pub fn ops_left(&self) -> i32 {
        self.max_ops
    }

    /// Checks if the operations budget is exhausted.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.max_ops <= 0
    }

    /// Consumes one operation.
    #[inline]
    pub fn visit(&mut self) -> bool {
        self.max_ops -= 1;
        self.max_ops >= 0
    }

    /// Checks that `size` bytes are available at the start of `data`.
    #[inline]
    pub fn check_struct(&mut self, data: &[u8], size: usize) -> bool {
        self.visit() && data.len() >= size
    }

    /// Checks that `count` records of `stride` bytes each are available at
    /// `offset` inside of `data`.
    ///
    /// The byte length is computed with an overflow check.
    #[inline]
    pub fn check_array(&mut self, data: &[u8], offset: usize, count: usize, stride: usize) -> bool {
        if !self.visit() {
            return false;
        }

        let len = match count.checked_mul(stride) {
            Some(v) => v,
            None => return false,
        };

        match offset.checked_add(len) {
            Some(end) => end <= data.len(),
            None => false,
        }
    }

    /// Resolves an offset relative to `base` and bounds-checks the target.
    ///
    /// Returns `Some(None)` for a null offset.
    #[inline]
    pub fn check_range<'a>(&mut self, base: &'a [u8], offset: usize) -> Option<Option<&'a [u8]>> {
        if !self.visit() {
            return None;
        }

        if offset == 0 {
            return Some(None);
        }

        base.get(offset..).filter(|d| !d.is_empty()).map(Some)
    }
}

/// Recursive structural validation.
///
/// Parent structures validate their children only after their own shallow
/// check has passed.
pub trait Sanitize {
    /// Returns `false` when the structure, or any structure reachable from it,
    /// is malformed or the operations budget is exhausted.
    fn sanitize(&self, c: &mut SanitizeContext) -> bool;
}

impl<'a, T: FromSlice<'a> + Sanitize> Sanitize for LazyOffsetArray16<'a, T> {
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        if !c.visit() {
            return false;
        }

        for i in 0..self.len() {
            if self.is_null(i) {
                continue;
            }

            match self.get(i) {
                Some(v) => {
                    if !v.sanitize(c) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        true
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    #[inline]
    fn sanitize(&self, c: &mut SanitizeContext) -> bool {
        match self {
            Some(v) => v.sanitize(c),
            None => true,
        }
    }
}
