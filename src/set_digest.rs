use ttf_parser::GlyphId;

use crate::tables::gsubgpos::Coverage;

type Mask = u32;

const MASK_BITS: u32 = Mask::BITS;

/// A single-word approximation of a glyph set, keyed by a bit shift.
#[derive(Clone, Copy, Default, Debug)]
struct BitsPattern<const SHIFT: u32> {
    mask: Mask,
}

impl<const SHIFT: u32> BitsPattern<SHIFT> {
    #[inline]
    fn mask_for(g: u32) -> Mask {
        1 << ((g >> SHIFT) & (MASK_BITS - 1))
    }

    #[inline]
    fn add(&mut self, g: u32) {
        self.mask |= Self::mask_for(g);
    }

    fn add_range(&mut self, a: u32, b: u32) -> bool {
        if self.mask == Mask::MAX {
            return false;
        }

        if (b >> SHIFT) - (a >> SHIFT) >= MASK_BITS - 1 {
            self.mask = Mask::MAX;
            false
        } else {
            let ma = Self::mask_for(a);
            let mb = Self::mask_for(b);
            self.mask |= mb.wrapping_add(mb.wrapping_sub(ma)).wrapping_sub(u32::from(mb < ma));
            true
        }
    }

    #[inline]
    fn union(&mut self, other: &Self) {
        self.mask |= other.mask;
    }

    #[inline]
    fn may_have(&self, other: &Self) -> bool {
        self.mask & other.mask != 0
    }

    #[inline]
    fn may_have_glyph(&self, g: u32) -> bool {
        self.mask & Self::mask_for(g) != 0
    }
}

/// A fast, conservative glyph set filter.
///
/// Never reports a false negative. Used to skip lookups
/// that cannot apply to anything in the buffer.
#[derive(Clone, Copy, Default, Debug)]
pub struct SetDigest {
    a: BitsPattern<4>,
    b: BitsPattern<0>,
    c: BitsPattern<9>,
}

impl SetDigest {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a digest that matches everything.
    pub fn full() -> Self {
        let full = Mask::MAX;
        SetDigest {
            a: BitsPattern { mask: full },
            b: BitsPattern { mask: full },
            c: BitsPattern { mask: full },
        }
    }

    pub fn add(&mut self, g: GlyphId) {
        let g = u32::from(g.0);
        self.a.add(g);
        self.b.add(g);
        self.c.add(g);
    }

    pub fn add_range(&mut self, a: GlyphId, b: GlyphId) {
        let (a, b) = (u32::from(a.0), u32::from(b.0));
        if a > b {
            return;
        }

        self.a.add_range(a, b);
        self.b.add_range(a, b);
        self.c.add_range(a, b);
    }

    pub fn add_coverage(&mut self, coverage: &Coverage) {
        match *coverage {
            Coverage::Format1 { glyphs } => {
                for g in glyphs {
                    self.add(g);
                }
            }
            Coverage::Format2 { records } => {
                for record in records {
                    self.add_range(record.start, record.end);
                }
            }
        }
    }

    pub fn union(&mut self, other: &Self) {
        self.a.union(&other.a);
        self.b.union(&other.b);
        self.c.union(&other.c);
    }

    pub fn may_have(&self, other: &Self) -> bool {
        self.a.may_have(&other.a) && self.b.may_have(&other.b) && self.c.may_have(&other.c)
    }

    pub fn may_have_glyph(&self, g: GlyphId) -> bool {
        let g = u32::from(g.0);
        self.a.may_have_glyph(g) && self.b.may_have_glyph(g) && self.c.may_have_glyph(g)
    }
}
