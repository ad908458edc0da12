//! A sparse set of 32-bit values, stored as 512-bit pages.

use alloc::vec::Vec;

type Elt = u64;

const ELT_BITS: u32 = Elt::BITS;
const PAGE_BITS: u32 = 512;
const PAGE_ELTS: usize = (PAGE_BITS / ELT_BITS) as usize;

/// A value that is never stored in a set.
pub const INVALID: u32 = u32::MAX;

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
struct Page {
    v: [Elt; PAGE_ELTS],
}

impl Page {
    #[inline]
    fn mask(g: u32) -> Elt {
        1 << (g & (ELT_BITS - 1))
    }

    #[inline]
    fn elt(g: u32) -> usize {
        ((g & (PAGE_BITS - 1)) / ELT_BITS) as usize
    }

    #[inline]
    fn add(&mut self, g: u32) {
        self.v[Self::elt(g)] |= Self::mask(g);
    }

    #[inline]
    fn del(&mut self, g: u32) {
        self.v[Self::elt(g)] &= !Self::mask(g);
    }

    #[inline]
    fn has(&self, g: u32) -> bool {
        self.v[Self::elt(g)] & Self::mask(g) != 0
    }

    fn set_range(&mut self, a: u32, b: u32, value: bool) {
        let (ea, eb) = (Self::elt(a), Self::elt(b));
        let ma = Self::mask(a);
        let mb = Self::mask(b);

        // Bits from `a` up to and including `b` in a single element.
        let span = |from: Elt, to: Elt| (to << 1).wrapping_sub(from) | to;

        let mut apply = |i: usize, bits: Elt| {
            if value {
                self.v[i] |= bits;
            } else {
                self.v[i] &= !bits;
            }
        };

        if ea == eb {
            apply(ea, span(ma, mb));
        } else {
            apply(ea, !(ma - 1));
            for i in ea + 1..eb {
                apply(i, Elt::MAX);
            }
            apply(eb, span(1, mb));
        }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.v.iter().all(|e| *e == 0)
    }

    #[inline]
    fn len(&self) -> usize {
        self.v.iter().map(|e| e.count_ones() as usize).sum()
    }

    fn min(&self) -> Option<u32> {
        self.v
            .iter()
            .position(|e| *e != 0)
            .map(|i| i as u32 * ELT_BITS + self.v[i].trailing_zeros())
    }

    fn max(&self) -> Option<u32> {
        self.v
            .iter()
            .rposition(|e| *e != 0)
            .map(|i| i as u32 * ELT_BITS + (ELT_BITS - 1 - self.v[i].leading_zeros()))
    }

    /// Returns the smallest in-page index that is `>= from`.
    fn next_from(&self, from: u32) -> Option<u32> {
        let mut i = (from / ELT_BITS) as usize;
        if i >= PAGE_ELTS {
            return None;
        }

        let mut e = self.v[i] & !(Self::mask(from) - 1);
        loop {
            if e != 0 {
                return Some(i as u32 * ELT_BITS + e.trailing_zeros());
            }

            i += 1;
            if i == PAGE_ELTS {
                return None;
            }

            e = self.v[i];
        }
    }

    fn combine(&self, other: &Page, op: impl Fn(Elt, Elt) -> Elt) -> Page {
        let mut page = Page::default();
        for (i, e) in page.v.iter_mut().enumerate() {
            *e = op(self.v[i], other.v[i]);
        }
        page
    }
}

#[derive(Clone, Copy, Debug)]
struct PageMap {
    major: u32,
    index: usize,
}

#[inline]
fn major(g: u32) -> u32 {
    g / PAGE_BITS
}

#[inline]
fn major_start(major: u32) -> u32 {
    major * PAGE_BITS
}

/// A set of `u32` values.
///
/// Values are grouped into 512-bit pages that are allocated on demand.
/// The page map is kept sorted by page major, so page lookup is a binary search.
#[derive(Clone, Debug)]
pub struct Set {
    successful: bool,
    page_map: Vec<PageMap>,
    pages: Vec<Page>,
}

impl Default for Set {
    fn default() -> Self {
        Self::new()
    }
}

impl Set {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Set {
            successful: true,
            page_map: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// Checks that all allocations so far succeeded.
    ///
    /// A set that failed to allocate ignores all further modifications.
    #[inline]
    pub fn successful(&self) -> bool {
        self.successful
    }

    fn page_map_index(&self, major: u32) -> Result<usize, usize> {
        self.page_map.binary_search_by(|map| map.major.cmp(&major))
    }

    fn page(&self, g: u32) -> Option<&Page> {
        let i = self.page_map_index(major(g)).ok()?;
        self.pages.get(self.page_map[i].index)
    }

    fn page_mut(&mut self, g: u32, insert: bool) -> Option<&mut Page> {
        let major = major(g);
        let i = match self.page_map_index(major) {
            Ok(i) => i,
            Err(i) => {
                if !insert {
                    return None;
                }

                if self.pages.try_reserve(1).is_err() || self.page_map.try_reserve(1).is_err() {
                    self.successful = false;
                    return None;
                }

                self.pages.push(Page::default());
                self.page_map.insert(
                    i,
                    PageMap {
                        major,
                        index: self.pages.len() - 1,
                    },
                );
                i
            }
        };

        let index = self.page_map[i].index;
        self.pages.get_mut(index)
    }

    /// Pages in ascending order of major.
    fn sorted_pages(&self) -> impl DoubleEndedIterator<Item = (u32, &Page)> + '_ {
        self.page_map
            .iter()
            .map(move |map| (map.major, &self.pages[map.index]))
    }

    /// Adds a value to the set.
    pub fn add(&mut self, g: u32) {
        if !self.successful || g == INVALID {
            return;
        }

        if let Some(page) = self.page_mut(g, true) {
            page.add(g);
        }
    }

    /// Adds an inclusive range of values to the set.
    ///
    /// Returns `false` when the range is invalid.
    pub fn add_range(&mut self, a: u32, b: u32) -> bool {
        if !self.successful {
            return true;
        }

        if a > b || a == INVALID || b == INVALID {
            return false;
        }

        self.set_range(a, b, true);
        true
    }

    /// Removes a value from the set.
    pub fn del(&mut self, g: u32) {
        if !self.successful {
            return;
        }

        if let Some(page) = self.page_mut(g, false) {
            page.del(g);
        }
    }

    /// Removes an inclusive range of values from the set.
    pub fn del_range(&mut self, a: u32, b: u32) {
        if !self.successful || a > b || a == INVALID {
            return;
        }

        self.set_range(a, b.min(INVALID - 1), false);
    }

    fn set_range(&mut self, a: u32, b: u32, value: bool) {
        let (ma, mb) = (major(a), major(b));
        for m in ma..=mb {
            let start = if m == ma { a } else { major_start(m) };
            let end = if m == mb { b } else { major_start(m) + (PAGE_BITS - 1) };

            let page = match self.page_mut(start, value) {
                Some(page) => page,
                None if value => return,
                None => continue,
            };

            page.set_range(start, end, value);
        }
    }

    /// Checks that the set contains a value.
    pub fn has(&self, g: u32) -> bool {
        self.page(g).map_or(false, |page| page.has(g))
    }

    /// Removes all values while keeping the allocation.
    pub fn clear(&mut self) {
        if !self.successful {
            return;
        }

        self.page_map.clear();
        self.pages.clear();
    }

    /// Removes all values and resets the allocation state.
    pub fn reset(&mut self) {
        self.successful = true;
        self.clear();
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Checks that the set has no values.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Returns the smallest value.
    pub fn min(&self) -> Option<u32> {
        self.sorted_pages()
            .find_map(|(major, page)| page.min().map(|g| major_start(major) + g))
    }

    /// Returns the largest value.
    pub fn max(&self) -> Option<u32> {
        self.sorted_pages()
            .rev()
            .find_map(|(major, page)| page.max().map(|g| major_start(major) + g))
    }

    /// Returns the smallest value greater than `g`,
    /// or the smallest value overall when `g` is `None`.
    pub fn next(&self, g: Option<u32>) -> Option<u32> {
        let from = match g {
            Some(INVALID) => return None,
            Some(g) => g + 1,
            None => 0,
        };

        let from_major = major(from);
        let first = match self.page_map_index(from_major) {
            Ok(i) | Err(i) => i,
        };

        for map in &self.page_map[first..] {
            let page = &self.pages[map.index];
            let found = if map.major == from_major {
                page.next_from(from & (PAGE_BITS - 1))
            } else {
                page.min()
            };

            if let Some(n) = found {
                return Some(major_start(map.major) + n);
            }
        }

        None
    }

    /// Returns an iterator over the values in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let mut last = None;
        core::iter::from_fn(move || {
            let next = self.next(last)?;
            last = Some(next);
            Some(next)
        })
    }

    /// Adds all values of `other`.
    pub fn union(&mut self, other: &Set) {
        self.process(other, |a, b| a | b);
    }

    /// Keeps only the values that are also in `other`.
    pub fn intersect(&mut self, other: &Set) {
        self.process(other, |a, b| a & b);
    }

    /// Removes all values that are in `other`.
    pub fn subtract(&mut self, other: &Set) {
        self.process(other, |a, b| a & !b);
    }

    /// Checks that every value of this set is also in `other`.
    pub fn is_subset(&self, other: &Set) -> bool {
        self.sorted_pages().all(|(major, page)| {
            let empty = Page::default();
            let other_page = other
                .page_map_index(major)
                .ok()
                .map_or(&empty, |i| &other.pages[other.page_map[i].index]);
            page.combine(other_page, |a, b| a & !b).is_empty()
        })
    }

    fn process(&mut self, other: &Set, op: impl Fn(Elt, Elt) -> Elt) {
        if !self.successful || !other.successful {
            return;
        }

        let empty = Page::default();
        let mut page_map = Vec::new();
        let mut pages = Vec::new();
        let capacity = self.page_map.len() + other.page_map.len();
        if page_map.try_reserve(capacity).is_err() || pages.try_reserve(capacity).is_err() {
            self.successful = false;
            return;
        }

        let (mut i, mut j) = (0, 0);
        while i < self.page_map.len() || j < other.page_map.len() {
            let a = self.page_map.get(i).map(|m| m.major);
            let b = other.page_map.get(j).map(|m| m.major);

            let (major, page_a, page_b) = match (a, b) {
                (Some(a), Some(b)) if a == b => {
                    i += 1;
                    j += 1;
                    (
                        a,
                        &self.pages[self.page_map[i - 1].index],
                        &other.pages[other.page_map[j - 1].index],
                    )
                }
                (Some(a), Some(b)) if a < b => {
                    i += 1;
                    (a, &self.pages[self.page_map[i - 1].index], &empty)
                }
                (Some(a), None) => {
                    i += 1;
                    (a, &self.pages[self.page_map[i - 1].index], &empty)
                }
                (_, Some(b)) => {
                    j += 1;
                    (b, &empty, &other.pages[other.page_map[j - 1].index])
                }
                (None, None) => break,
            };

            let page = page_a.combine(page_b, &op);
            if !page.is_empty() {
                pages.push(page);
                page_map.push(PageMap {
                    major,
                    index: pages.len() - 1,
                });
            }
        }

        self.page_map = page_map;
        self.pages = pages;
    }
}

impl core::iter::Extend<u32> for Set {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for g in iter {
            self.add(g);
        }
    }
}

impl core::iter::FromIterator<u32> for Set {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let mut set = Set::new();
        set.extend(iter);
        set
    }
}
