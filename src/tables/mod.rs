pub mod gpos;
pub mod gsub;
pub mod gsubgpos;

use core::cmp::Ordering;

/// A slice-like container with runtime-defined stride.
#[derive(Clone, Copy, Debug)]
pub struct DynArray<'a> {
    data: &'a [u8],
    stride: usize,
}

impl<'a> DynArray<'a> {
    #[inline]
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        let start = index.checked_mul(self.stride)?;
        let end = start.checked_add(self.stride)?;
        self.data.get(start..end)
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    #[inline]
    pub fn binary_search_by<F>(&self, mut f: F) -> Option<(usize, &'a [u8])>
    where
        F: FnMut(&[u8]) -> Ordering,
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
            let cmp = f(self.get(mid)?);
            base = if cmp == Ordering::Greater { base } else { mid };
            size -= half;
        }

        let value = self.get(base)?;
        if f(value) == Ordering::Equal {
            Some((base, value))
        } else {
            None
        }
    }
}

trait StreamExt<'a> {
    fn read_dyn_array(&mut self, count: usize, stride: usize) -> Option<DynArray<'a>>;
}

impl<'a> StreamExt<'a> for crate::parser::Stream<'a> {
    #[inline]
    fn read_dyn_array(&mut self, count: usize, stride: usize) -> Option<DynArray<'a>> {
        let len = count.checked_mul(stride)?;
        self.read_bytes(len).map(|data| DynArray::new(data, stride))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_array_search() {
        let data = [0, 1, 9, 0, 3, 9, 0, 7, 9];
        let array = DynArray::new(&data, 3);
        assert_eq!(array.len(), 3);
        let found = array.binary_search_by(|d| d[1].cmp(&3));
        assert_eq!(found, Some((1, &data[3..6])));
        assert!(array.binary_search_by(|d| d[1].cmp(&4)).is_none());
        assert!(array.get(3).is_none());
    }
}
