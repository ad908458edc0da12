use alloc::string::String;
use alloc::vec::Vec;
use core::convert::TryFrom;
use core::fmt::Write;

use ttf_parser::GlyphId;

use crate::common::{script, Direction, Language, Script};
use crate::face::Face;
use crate::set_digest::SetDigest;
use crate::unicode::{CharExt, GeneralCategory};
use crate::Mask;

pub mod glyph_flag {
    /// Indicates that if input text is broken at the beginning of the cluster
    /// this glyph is part of, then both sides need to be re-shaped,
    /// as the result might be different.
    ///
    /// On the flip side, it means that when this flag is not present,
    /// then it is safe to break the glyph-run at the beginning of this cluster,
    /// and the two sides will represent the exact same result one would get
    /// if breaking input text at the beginning of this cluster and shaping
    /// the two sides separately.
    pub const UNSAFE_TO_BREAK: u32 = 0x00000001;
    /// Indicates that if input text is changed on one side of the beginning
    /// of the cluster this glyph is part of, then the shaping results for
    /// the other side might change.
    ///
    /// Note that the absence of this flag will NOT by itself mean that
    /// it IS safe to concat text. Only two pieces of text both of which
    /// clear of this flag can be concatenated safely.
    pub const UNSAFE_TO_CONCAT: u32 = 0x00000002;

    /// All the currently defined flags.
    pub const DEFINED: u32 = 0x00000003; // OR of all defined flags
}

/// Holds the positions of the glyph in both horizontal and vertical directions.
///
/// All positions are relative to the current point.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug)]
pub struct GlyphPosition {
    /// How much the line advances after drawing this glyph when setting text in
    /// horizontal direction.
    pub x_advance: i32,
    /// How much the line advances after drawing this glyph when setting text in
    /// vertical direction.
    pub y_advance: i32,
    /// How much the glyph moves on the X-axis before drawing it, this should
    /// not affect how much the line advances.
    pub x_offset: i32,
    /// How much the glyph moves on the Y-axis before drawing it, this should
    /// not affect how much the line advances.
    pub y_offset: i32,
    var: u32,
}

unsafe impl bytemuck::Zeroable for GlyphPosition {}
unsafe impl bytemuck::Pod for GlyphPosition {}

impl GlyphPosition {
    #[inline]
    pub(crate) fn attach_chain(&self) -> i16 {
        // glyph to which this attaches to, relative to current glyphs;
        // negative for going back, positive for forward.
        let v: &[i16; 2] = bytemuck::cast_ref(&self.var);
        v[0]
    }

    #[inline]
    pub(crate) fn set_attach_chain(&mut self, n: i16) {
        let v: &mut [i16; 2] = bytemuck::cast_mut(&mut self.var);
        v[0] = n;
    }

    #[inline]
    pub(crate) fn attach_type(&self) -> u8 {
        // attachment type
        // Note! if attach_chain() is zero, the value of attach_type() is irrelevant.
        let v: &[u8; 4] = bytemuck::cast_ref(&self.var);
        v[2]
    }

    #[inline]
    pub(crate) fn set_attach_type(&mut self, n: u8) {
        let v: &mut [u8; 4] = bytemuck::cast_mut(&mut self.var);
        v[2] = n;
    }
}

/// A glyph info.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug)]
pub struct GlyphInfo {
    // NOTE: Stores a Unicode codepoint before shaping and a glyph ID after.
    //       Just like harfbuzz, we are using the same variable for two purposes.
    //       Occupies u32 as a codepoint and u16 as a glyph id.
    /// A selected glyph.
    ///
    /// Guarantee to be <= `u16::MAX`.
    pub glyph_id: u32,
    pub(crate) mask: Mask,
    /// An index to the start of the grapheme cluster in the original string.
    ///
    /// [Read more on clusters](https://harfbuzz.github.io/clusters.html).
    pub cluster: u32,
    pub(crate) var1: u32,
    pub(crate) var2: u32,
}

unsafe impl bytemuck::Zeroable for GlyphInfo {}
unsafe impl bytemuck::Pod for GlyphInfo {}

const IS_LIG_BASE: u8 = 0x10;

impl GlyphInfo {
    /// Indicates that if input text is broken at the beginning of the cluster
    /// this glyph is part of, then both sides need to be re-shaped.
    pub fn unsafe_to_break(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_BREAK != 0
    }

    /// Indicates that if input text is changed on one side of the beginning
    /// of the cluster this glyph is part of, the other side might change.
    pub fn unsafe_to_concat(&self) -> bool {
        self.mask & glyph_flag::UNSAFE_TO_CONCAT != 0
    }

    #[inline]
    pub(crate) fn as_char(&self) -> char {
        char::try_from(self.glyph_id).unwrap_or('\0')
    }

    #[inline]
    pub(crate) fn as_glyph(&self) -> GlyphId {
        debug_assert!(self.glyph_id <= u32::from(u16::MAX));
        GlyphId(self.glyph_id as u16)
    }

    // Var allocation: unicode_props
    // Used during the entire shaping process.
    // Only the lower 16 bits of var2 are used.

    #[inline]
    pub(crate) fn unicode_props(&self) -> u16 {
        let v: &[u16; 2] = bytemuck::cast_ref(&self.var2);
        v[0]
    }

    #[inline]
    pub(crate) fn set_unicode_props(&mut self, n: u16) {
        let v: &mut [u16; 2] = bytemuck::cast_mut(&mut self.var2);
        v[0] = n;
    }

    pub(crate) fn init_unicode_props(&mut self, scratch_flags: &mut BufferScratchFlags) {
        let u = self.as_char();
        let gc = u.general_category();
        let mut props = u16::from(gc.to_u8());

        if u as u32 >= 0x80 {
            *scratch_flags |= BufferScratchFlags::HAS_NON_ASCII;

            if u.is_default_ignorable() {
                props |= UnicodeProps::IGNORABLE.bits();
                *scratch_flags |= BufferScratchFlags::HAS_DEFAULT_IGNORABLES;

                match u as u32 {
                    0x200C => props |= UnicodeProps::CF_ZWNJ.bits(),
                    0x200D => props |= UnicodeProps::CF_ZWJ.bits(),

                    // Mongolian Free Variation Selectors need to be remembered
                    // because although we need to hide them like default-ignorables,
                    // they need to non-ignorable during shaping.  This is similar to
                    // what we do for joiners in Indic-like shapers, but since the
                    // FVSes are GC=Mn, we have use a separate bit to remember them.
                    // Fixes:
                    // https://github.com/harfbuzz/harfbuzz/issues/234
                    0x180B..=0x180D | 0x180F => props |= UnicodeProps::HIDDEN.bits(),

                    // TAG characters need similar treatment. Fixes:
                    // https://github.com/harfbuzz/harfbuzz/issues/463
                    0xE0020..=0xE007F => props |= UnicodeProps::HIDDEN.bits(),

                    // COMBINING GRAPHEME JOINER should not be skipped; at least some times.
                    // https://github.com/harfbuzz/harfbuzz/issues/554
                    0x034F => {
                        props |= UnicodeProps::HIDDEN.bits();
                        *scratch_flags |= BufferScratchFlags::HAS_CGJ;
                    }

                    _ => {}
                }
            }

            if gc.is_mark() {
                props |= UnicodeProps::CONTINUATION.bits();
                props |= u16::from(u.modified_combining_class()) << 8;
            }
        }

        self.set_unicode_props(props);
    }

    #[inline]
    pub(crate) fn general_category(&self) -> GeneralCategory {
        let n = self.unicode_props() & UnicodeProps::GENERAL_CATEGORY.bits();
        GeneralCategory::from_u8(n as u8)
    }

    #[inline]
    pub(crate) fn set_general_category(&mut self, gc: GeneralCategory) {
        let gc = u16::from(gc.to_u8());
        let n = (gc & UnicodeProps::GENERAL_CATEGORY.bits())
            | (self.unicode_props() & (0xFF & !UnicodeProps::GENERAL_CATEGORY.bits()));
        self.set_unicode_props(n);
    }

    #[inline]
    pub(crate) fn is_unicode_mark(&self) -> bool {
        self.general_category().is_mark()
    }

    #[inline]
    pub(crate) fn modified_combining_class(&self) -> u8 {
        if self.is_unicode_mark() {
            (self.unicode_props() >> 8) as u8
        } else {
            0
        }
    }

    #[inline]
    pub(crate) fn is_default_ignorable(&self) -> bool {
        let n = self.unicode_props() & UnicodeProps::IGNORABLE.bits();
        n != 0 && !self.is_substituted()
    }

    #[inline]
    pub(crate) fn is_hidden(&self) -> bool {
        self.unicode_props() & UnicodeProps::HIDDEN.bits() != 0
    }

    #[inline]
    pub(crate) fn is_continuation(&self) -> bool {
        self.unicode_props() & UnicodeProps::CONTINUATION.bits() != 0
    }

    #[inline]
    pub(crate) fn set_continuation(&mut self) {
        let n = self.unicode_props() | UnicodeProps::CONTINUATION.bits();
        self.set_unicode_props(n);
    }

    #[inline]
    fn is_unicode_format(&self) -> bool {
        self.general_category() == GeneralCategory::Format
    }

    #[inline]
    pub(crate) fn is_zwnj(&self) -> bool {
        self.is_unicode_format() && (self.unicode_props() & UnicodeProps::CF_ZWNJ.bits() != 0)
    }

    #[inline]
    pub(crate) fn is_zwj(&self) -> bool {
        self.is_unicode_format() && (self.unicode_props() & UnicodeProps::CF_ZWJ.bits() != 0)
    }

    // Var allocation: glyph_props
    // Used during the GSUB/GPOS processing to store GDEF glyph properties.
    // Only the lower 16 bits of var1 are used.

    #[inline]
    pub(crate) fn glyph_props(&self) -> u16 {
        let v: &[u16; 2] = bytemuck::cast_ref(&self.var1);
        v[0]
    }

    #[inline]
    pub(crate) fn set_glyph_props(&mut self, n: u16) {
        let v: &mut [u16; 2] = bytemuck::cast_mut(&mut self.var1);
        v[0] = n;
    }

    #[inline]
    pub(crate) fn is_base_glyph(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::BASE_GLYPH.bits() != 0
    }

    #[inline]
    pub(crate) fn is_ligature(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::LIGATURE.bits() != 0
    }

    #[inline]
    pub(crate) fn is_mark(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::MARK.bits() != 0
    }

    #[inline]
    pub(crate) fn is_substituted(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::SUBSTITUTED.bits() != 0
    }

    #[inline]
    pub(crate) fn is_ligated(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::LIGATED.bits() != 0
    }

    #[inline]
    pub(crate) fn is_multiplied(&self) -> bool {
        self.glyph_props() & GlyphPropsFlags::MULTIPLIED.bits() != 0
    }

    #[inline]
    pub(crate) fn is_ligated_and_didnt_multiply(&self) -> bool {
        self.is_ligated() && !self.is_multiplied()
    }

    #[inline]
    pub(crate) fn clear_ligated_and_multiplied(&mut self) {
        let mut n = self.glyph_props();
        n &= !(GlyphPropsFlags::LIGATED | GlyphPropsFlags::MULTIPLIED).bits();
        self.set_glyph_props(n);
    }

    // Var allocation: lig_props
    // Used during the GSUB/GPOS processing to store ligature properties.
    // Only the third byte of var1 is used.

    #[inline]
    pub(crate) fn lig_props(&self) -> u8 {
        let v: &[u8; 4] = bytemuck::cast_ref(&self.var1);
        v[2]
    }

    #[inline]
    pub(crate) fn set_lig_props(&mut self, n: u8) {
        let v: &mut [u8; 4] = bytemuck::cast_mut(&mut self.var1);
        v[2] = n;
    }

    // The lig_props var is split into two parts:
    //
    // - The lower 4 bits are the component index of a mark, or
    //   the number of components of a ligature.
    // - The upper 3 bits are the ligature id.
    // - The 5th bit tells apart a ligature from a mark attached to one.

    #[inline]
    pub(crate) fn set_lig_props_for_ligature(&mut self, lig_id: u8, lig_num_comps: u8) {
        self.set_lig_props((lig_id << 5) | IS_LIG_BASE | (lig_num_comps & 0x0F));
    }

    #[inline]
    pub(crate) fn set_lig_props_for_mark(&mut self, lig_id: u8, lig_comp: u8) {
        self.set_lig_props((lig_id << 5) | (lig_comp & 0x0F));
    }

    #[inline]
    pub(crate) fn set_lig_props_for_component(&mut self, comp: u8) {
        self.set_lig_props_for_mark(0, comp);
    }

    #[inline]
    pub(crate) fn lig_id(&self) -> u8 {
        self.lig_props() >> 5
    }

    #[inline]
    pub(crate) fn is_ligated_internal(&self) -> bool {
        self.lig_props() & IS_LIG_BASE != 0
    }

    #[inline]
    pub(crate) fn lig_comp(&self) -> u8 {
        if self.is_ligated_internal() {
            0
        } else {
            self.lig_props() & 0x0F
        }
    }

    #[inline]
    pub(crate) fn lig_num_comps(&self) -> u8 {
        if self.is_ligature() && self.is_ligated_internal() {
            self.lig_props() & 0x0F
        } else {
            1
        }
    }

    // Var allocation: syllable
    // Used during the GSUB/GPOS processing to store shaping boundaries.
    // Only the last byte of var1 is used.

    #[inline]
    pub(crate) fn syllable(&self) -> u8 {
        let v: &[u8; 4] = bytemuck::cast_ref(&self.var1);
        v[3]
    }

    #[inline]
    pub(crate) fn set_syllable(&mut self, n: u8) {
        let v: &mut [u8; 4] = bytemuck::cast_mut(&mut self.var1);
        v[3] = n;
    }
}

bitflags::bitflags! {
    #[derive(Default, Debug, Clone, Copy)]
    pub(crate) struct UnicodeProps: u16 {
        const GENERAL_CATEGORY  = 0x001F;
        const IGNORABLE         = 0x0020;
        // MONGOLIAN FREE VARIATION SELECTOR 1..4, or TAG characters, or CGJ sometimes
        const HIDDEN            = 0x0040;
        const CONTINUATION      = 0x0080;

        // If GEN_CAT=FORMAT, top byte masks:
        const CF_ZWJ            = 0x0100;
        const CF_ZWNJ           = 0x0200;
    }
}

bitflags::bitflags! {
    /// Glyph properties computed from GDEF and updated by lookups.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct GlyphPropsFlags: u16 {
        // The following three match LookupFlags::Ignore* numbers.
        const BASE_GLYPH    = 0x02;
        const LIGATURE      = 0x04;
        const MARK          = 0x08;
        const CLASS_MASK    = Self::BASE_GLYPH.bits() | Self::LIGATURE.bits() | Self::MARK.bits();

        // The following are used internally; not derived from GDEF.
        const SUBSTITUTED   = 0x10;
        const LIGATED       = 0x20;
        const MULTIPLIED    = 0x40;

        const PRESERVE      = Self::SUBSTITUTED.bits() | Self::LIGATED.bits() | Self::MULTIPLIED.bits();
    }
}

bitflags::bitflags! {
    /// Flags for buffers.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferFlags: u32 {
        /// Indicates that special handling of the beginning of text paragraph can be applied to this buffer.
        const BEGINNING_OF_TEXT             = 1 << 0;
        /// Indicates that special handling of the end of text paragraph can be applied to this buffer.
        const END_OF_TEXT                   = 1 << 1;
        /// Indicates that characters with Default_Ignorable Unicode property
        /// should use the corresponding glyph from the font, instead of hiding them.
        const PRESERVE_DEFAULT_IGNORABLES   = 1 << 2;
        /// Indicates that characters with Default_Ignorable Unicode property
        /// should be removed from glyph string instead of hiding them.
        const REMOVE_DEFAULT_IGNORABLES     = 1 << 3;
        /// Indicates that the `UNSAFE_TO_CONCAT` glyph flag should be produced.
        const PRODUCE_UNSAFE_TO_CONCAT      = 1 << 6;
    }
}

bitflags::bitflags! {
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct BufferScratchFlags: u32 {
        const HAS_NON_ASCII             = 0x00000001;
        const HAS_DEFAULT_IGNORABLES    = 0x00000002;
        const HAS_GPOS_ATTACHMENT       = 0x00000004;
        const HAS_CGJ                   = 0x00000008;
        const HAS_GLYPH_FLAGS           = 0x00000010;
    }
}

/// Cluster level.
///
/// Controls the cluster level used by the shaping process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BufferClusterLevel {
    /// Return cluster values grouped by graphemes into monotone order.
    #[default]
    MonotoneGraphemes,
    /// Return cluster values grouped into monotone order.
    MonotoneCharacters,
    /// Don't group cluster values.
    Characters,
}

bitflags::bitflags! {
    /// Flags used for serialization with a `BufferSerializer`.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SerializeFlags: u8 {
        /// Do not serialize glyph cluster.
        const NO_CLUSTERS       = 0b00000001;
        /// Do not serialize glyph position information.
        const NO_POSITIONS      = 0b00000010;
        /// Do no serialize glyph name.
        const NO_GLYPH_NAMES    = 0b00000100;
        /// Serialize glyph flags.
        const GLYPH_FLAGS       = 0b00001000;
        /// Do not serialize glyph advances, glyph offsets will reflect absolute
        /// glyph positions.
        const NO_ADVANCES       = 0b00010000;
    }
}

/// The glyph buffer used during shaping.
///
/// Substitution writes into a separate output array and the two arrays are
/// swapped by `sync`. As long as no substitution produced more glyphs than
/// it consumed, the output is written in place into `info`.
pub(crate) struct Buffer {
    // Information about how the text in the buffer should be treated.
    pub flags: BufferFlags,
    pub cluster_level: BufferClusterLevel,
    pub invisible: Option<GlyphId>,

    // Buffer contents.
    pub direction: Direction,
    pub script: Option<Script>,
    pub language: Option<Language>,

    /// Allocations successful.
    pub successful: bool,
    /// Whether we have an output buffer going on.
    pub(crate) have_output: bool,
    pub have_separate_output: bool,
    /// Whether we have positions
    pub have_positions: bool,

    pub idx: usize,
    pub len: usize,
    pub out_len: usize,

    pub info: Vec<GlyphInfo>,
    pub pos: Vec<GlyphPosition>,
    out_info: Vec<GlyphInfo>,

    serial: u8,

    // Managed by enter / leave
    pub scratch_flags: BufferScratchFlags,
    pub max_len: usize,
    pub max_ops: i32,
}

impl Buffer {
    pub const MAX_LEN_FACTOR: usize = 64;
    pub const MAX_LEN_MIN: usize = 16384;
    // Shaping more than a billion chars? Let us know!
    pub const MAX_LEN_DEFAULT: usize = 0x3FFFFFFF;

    pub const MAX_OPS_FACTOR: i32 = 1024;
    pub const MAX_OPS_MIN: i32 = 16384;
    // Shaping more than a billion operations? Let us know!
    pub const MAX_OPS_DEFAULT: i32 = 0x1FFFFFFF;

    /// Creates a new `Buffer`.
    pub fn new() -> Self {
        Buffer {
            flags: BufferFlags::empty(),
            cluster_level: BufferClusterLevel::default(),
            invisible: None,
            scratch_flags: BufferScratchFlags::default(),
            max_len: Self::MAX_LEN_DEFAULT,
            max_ops: Self::MAX_OPS_DEFAULT,
            direction: Direction::Invalid,
            script: None,
            language: None,
            successful: true,
            have_output: false,
            have_positions: false,
            have_separate_output: false,
            idx: 0,
            len: 0,
            out_len: 0,
            info: Vec::new(),
            pos: Vec::new(),
            out_info: Vec::new(),
            serial: 0,
        }
    }

    #[inline]
    pub fn info_slice(&self) -> &[GlyphInfo] {
        &self.info[..self.len]
    }

    #[inline]
    pub fn info_slice_mut(&mut self) -> &mut [GlyphInfo] {
        &mut self.info[..self.len]
    }

    #[inline]
    pub fn out_info(&self) -> &[GlyphInfo] {
        if self.have_separate_output {
            &self.out_info
        } else {
            &self.info
        }
    }

    #[inline]
    pub fn out_info_mut(&mut self) -> &mut [GlyphInfo] {
        if self.have_separate_output {
            &mut self.out_info
        } else {
            &mut self.info
        }
    }

    #[inline]
    pub fn backtrack_len(&self) -> usize {
        if self.have_output {
            self.out_len
        } else {
            self.idx
        }
    }

    #[inline]
    pub fn lookahead_len(&self) -> usize {
        self.len - self.idx
    }

    #[inline]
    fn next_serial(&mut self) -> u8 {
        self.serial = self.serial.wrapping_add(1);

        if self.serial == 0 {
            self.serial += 1;
        }

        self.serial
    }

    fn add(&mut self, codepoint: u32, cluster: u32) {
        if !self.ensure(self.len + 1) {
            return;
        }

        let i = self.len;
        self.info[i] = GlyphInfo {
            glyph_id: codepoint,
            mask: 0,
            cluster,
            var1: 0,
            var2: 0,
        };

        self.len += 1;
    }

    #[inline]
    pub fn reverse(&mut self) {
        if self.is_empty() {
            return;
        }

        self.reverse_range(0, self.len);
    }

    pub fn reverse_range(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }

        self.info[start..end].reverse();
        if self.have_positions {
            self.pos[start..end].reverse();
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn reset_clusters(&mut self) {
        for (i, info) in self.info[..self.len].iter_mut().enumerate() {
            info.cluster = i as u32;
        }
    }

    pub fn guess_segment_properties(&mut self) {
        if self.script.is_none() {
            for info in &self.info[..self.len] {
                match info.as_char().script() {
                    script::COMMON | script::INHERITED | script::UNKNOWN => {}
                    s => {
                        self.script = Some(s);
                        break;
                    }
                }
            }
        }

        if self.direction == Direction::Invalid {
            if let Some(script) = self.script {
                self.direction = Direction::from_script(script).unwrap_or_default();
            }

            if self.direction == Direction::Invalid {
                self.direction = Direction::LeftToRight;
            }
        }
    }

    pub fn sync(&mut self) -> bool {
        assert!(self.have_output);
        assert!(self.idx <= self.len);

        if !self.successful {
            self.have_output = false;
            self.out_len = 0;
            self.idx = 0;
            return false;
        }

        self.next_glyphs(self.len - self.idx);

        if self.have_separate_output {
            // Swap info and out_info.
            core::mem::swap(&mut self.info, &mut self.out_info);
        }

        self.len = self.out_len;

        self.have_output = false;
        self.out_len = 0;
        self.idx = 0;

        true
    }

    pub fn clear_output(&mut self) {
        self.have_output = true;
        self.have_positions = false;

        self.out_len = 0;
        self.have_separate_output = false;
    }

    pub fn clear_positions(&mut self) {
        self.have_output = false;
        self.have_positions = true;

        self.out_len = 0;
        self.have_separate_output = false;

        for pos in &mut self.pos {
            *pos = GlyphPosition::default();
        }
    }

    pub fn replace_glyphs(&mut self, num_in: usize, num_out: usize, glyph_data: &[u32]) {
        if !self.make_room_for(num_in, num_out) {
            return;
        }

        assert!(self.idx + num_in <= self.len);

        self.merge_clusters(self.idx, self.idx + num_in);

        let orig_info = if self.idx < self.len {
            self.info[self.idx]
        } else {
            self.prev()
        };

        let out_len = self.out_len;
        let out = self.out_info_mut();
        for (i, glyph) in glyph_data.iter().take(num_out).enumerate() {
            out[out_len + i] = orig_info;
            out[out_len + i].glyph_id = *glyph;
        }

        self.idx += num_in;
        self.out_len += num_out;
    }

    pub fn replace_glyph(&mut self, glyph_index: u32) {
        if self.have_separate_output || self.out_len != self.idx {
            if !self.make_room_for(1, 1) {
                return;
            }

            let cur = self.info[self.idx];
            let out_len = self.out_len;
            self.out_info_mut()[out_len] = cur;
        }

        let out_len = self.out_len;
        self.out_info_mut()[out_len].glyph_id = glyph_index;

        self.idx += 1;
        self.out_len += 1;
    }

    pub fn output_glyph(&mut self, glyph_index: u32) {
        if !self.make_room_for(0, 1) {
            return;
        }

        if self.idx == self.len && self.out_len == 0 {
            return;
        }

        let out_len = self.out_len;
        let info = if self.idx < self.len {
            self.info[self.idx]
        } else {
            self.out_info()[out_len - 1]
        };

        let out = self.out_info_mut();
        out[out_len] = info;
        out[out_len].glyph_id = glyph_index;

        self.out_len += 1;
    }

    pub fn output_info(&mut self, glyph_info: GlyphInfo) {
        if !self.make_room_for(0, 1) {
            return;
        }

        let out_len = self.out_len;
        self.out_info_mut()[out_len] = glyph_info;
        self.out_len += 1;
    }

    /// Copies glyph at idx to output but doesn't advance idx.
    pub fn copy_glyph(&mut self) {
        if !self.make_room_for(0, 1) {
            return;
        }

        let cur = self.info[self.idx];
        let out_len = self.out_len;
        self.out_info_mut()[out_len] = cur;
        self.out_len += 1;
    }

    /// Copies glyph at idx to output and advance idx.
    ///
    /// If there's no output, just advance idx.
    pub fn next_glyph(&mut self) {
        if self.have_output {
            if self.have_separate_output || self.out_len != self.idx {
                if !self.make_room_for(1, 1) {
                    return;
                }

                let cur = self.info[self.idx];
                let out_len = self.out_len;
                self.out_info_mut()[out_len] = cur;
            }

            self.out_len += 1;
        }

        self.idx += 1;
    }

    /// Copies n glyphs at idx to output and advance idx.
    ///
    /// If there's no output, just advance idx.
    pub fn next_glyphs(&mut self, n: usize) {
        if self.have_output {
            if self.have_separate_output || self.out_len != self.idx {
                if !self.make_room_for(n, n) {
                    return;
                }

                self.copy_to_output(self.idx, self.out_len, n);
            }

            self.out_len += n;
        }

        self.idx += n;
    }

    /// Advance idx without copying to output.
    pub fn skip_glyph(&mut self) {
        self.idx += 1;
    }

    pub fn reset_masks(&mut self, mask: Mask) {
        for info in &mut self.info[..self.len] {
            info.mask = mask;
        }
    }

    pub fn set_masks(
        &mut self,
        mut value: Mask,
        mask: Mask,
        cluster_start: u32,
        cluster_end: u32,
    ) {
        if mask == 0 {
            return;
        }

        let not_mask = !mask;
        value &= mask;

        for info in &mut self.info[..self.len] {
            if cluster_start <= info.cluster && info.cluster < cluster_end {
                info.mask = (info.mask & not_mask) | value;
            }
        }
    }

    pub fn merge_clusters(&mut self, start: usize, end: usize) {
        if end - start < 2 {
            return;
        }

        self.merge_clusters_impl(start, end)
    }

    fn merge_clusters_impl(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            self.unsafe_to_break(Some(start), Some(end));
            return;
        }

        let mut cluster = self.info[start].cluster;

        for i in start + 1..end {
            cluster = core::cmp::min(cluster, self.info[i].cluster);
        }

        // Extend end
        if cluster != self.info[end - 1].cluster {
            while end < self.len && self.info[end - 1].cluster == self.info[end].cluster {
                end += 1;
            }
        }

        // Extend start
        if cluster != self.info[start].cluster {
            while self.idx < start && self.info[start - 1].cluster == self.info[start].cluster {
                start -= 1;
            }
        }

        // If we hit the start of buffer, continue in out-buffer.
        if self.idx == start && self.info[start].cluster != cluster {
            let start_cluster = self.info[start].cluster;
            let mut i = self.out_len;
            while i != 0 && self.out_info()[i - 1].cluster == start_cluster {
                Self::set_cluster(&mut self.out_info_mut()[i - 1], cluster, 0);
                i -= 1;
            }
        }

        for info in &mut self.info[start..end] {
            Self::set_cluster(info, cluster, 0);
        }
    }

    pub fn merge_out_clusters(&mut self, mut start: usize, mut end: usize) {
        if self.cluster_level == BufferClusterLevel::Characters {
            return;
        }

        if end - start < 2 {
            return;
        }

        let mut cluster = self.out_info()[start].cluster;

        for i in start + 1..end {
            cluster = core::cmp::min(cluster, self.out_info()[i].cluster);
        }

        // Extend start
        while start != 0 && self.out_info()[start - 1].cluster == self.out_info()[start].cluster {
            start -= 1;
        }

        // Extend end
        while end < self.out_len && self.out_info()[end - 1].cluster == self.out_info()[end].cluster
        {
            end += 1;
        }

        // If we hit the end of out-buffer, continue in buffer.
        if end == self.out_len {
            let end_cluster = self.out_info()[end - 1].cluster;
            let mut i = self.idx;
            while i < self.len && self.info[i].cluster == end_cluster {
                Self::set_cluster(&mut self.info[i], cluster, 0);
                i += 1;
            }
        }

        for info in &mut self.out_info_mut()[start..end] {
            Self::set_cluster(info, cluster, 0);
        }
    }

    /// Merge clusters for deleting current glyph, and skip it.
    pub fn delete_glyph(&mut self) {
        // The logic here is duplicated in delete_glyphs_inplace().

        let cluster = self.info[self.idx].cluster;

        if (self.idx + 1 < self.len && cluster == self.info[self.idx + 1].cluster)
            || (self.out_len != 0 && cluster == self.out_info()[self.out_len - 1].cluster)
        {
            // Cluster survives; do nothing.
            self.skip_glyph();
            return;
        }

        if self.out_len != 0 {
            // Merge cluster backward.
            if cluster < self.out_info()[self.out_len - 1].cluster {
                let mask = self.info[self.idx].mask;
                let old_cluster = self.out_info()[self.out_len - 1].cluster;

                let mut i = self.out_len;
                while i != 0 && self.out_info()[i - 1].cluster == old_cluster {
                    Self::set_cluster(&mut self.out_info_mut()[i - 1], cluster, mask);
                    i -= 1;
                }
            }

            self.skip_glyph();
            return;
        }

        if self.idx + 1 < self.len {
            // Merge cluster forward.
            self.merge_clusters(self.idx, self.idx + 2);
        }

        self.skip_glyph();
    }

    pub fn delete_glyphs_inplace(&mut self, filter: impl Fn(&GlyphInfo) -> bool) {
        // Merge clusters and delete filtered glyphs.
        // NOTE! We can't use out-buffer as we have positioning data.
        let mut j = 0;

        for i in 0..self.len {
            if filter(&self.info[i]) {
                // Merge clusters.
                // Same logic as delete_glyph(), but for in-place removal.

                let cluster = self.info[i].cluster;
                if i + 1 < self.len && cluster == self.info[i + 1].cluster {
                    // Cluster survives; do nothing.
                    continue;
                }

                if j != 0 {
                    // Merge cluster backward.
                    if cluster < self.info[j - 1].cluster {
                        let mask = self.info[i].mask;
                        let old_cluster = self.info[j - 1].cluster;

                        let mut k = j;
                        while k > 0 && self.info[k - 1].cluster == old_cluster {
                            Self::set_cluster(&mut self.info[k - 1], cluster, mask);
                            k -= 1;
                        }
                    }
                    continue;
                }

                if i + 1 < self.len {
                    // Merge cluster forward.
                    self.merge_clusters(i, i + 2);
                }

                continue;
            }

            if j != i {
                self.info[j] = self.info[i];
                self.pos[j] = self.pos[i];
            }

            j += 1;
        }

        self.len = j;
    }

    pub fn unsafe_to_break(&mut self, start: Option<usize>, end: Option<usize>) {
        self.set_glyph_flags(
            glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT,
            start,
            end,
            true,
            false,
        );
    }

    pub fn unsafe_to_concat(&mut self, start: Option<usize>, end: Option<usize>) {
        if !self.flags.contains(BufferFlags::PRODUCE_UNSAFE_TO_CONCAT) {
            return;
        }

        self.set_glyph_flags(glyph_flag::UNSAFE_TO_CONCAT, start, end, false, false);
    }

    pub fn unsafe_to_break_from_outbuffer(&mut self, start: Option<usize>, end: Option<usize>) {
        self.set_glyph_flags(
            glyph_flag::UNSAFE_TO_BREAK | glyph_flag::UNSAFE_TO_CONCAT,
            start,
            end,
            true,
            true,
        );
    }

    pub fn unsafe_to_concat_from_outbuffer(&mut self, start: Option<usize>, end: Option<usize>) {
        if !self.flags.contains(BufferFlags::PRODUCE_UNSAFE_TO_CONCAT) {
            return;
        }

        self.set_glyph_flags(glyph_flag::UNSAFE_TO_CONCAT, start, end, false, true);
    }

    fn set_glyph_flags(
        &mut self,
        mask: Mask,
        start: Option<usize>,
        end: Option<usize>,
        interior: bool,
        from_out_buffer: bool,
    ) {
        let start = start.unwrap_or(0);
        let end = core::cmp::min(end.unwrap_or(self.len), self.len);

        if interior && !from_out_buffer && end.saturating_sub(start) < 2 {
            return;
        }

        self.scratch_flags |= BufferScratchFlags::HAS_GLYPH_FLAGS;

        if !from_out_buffer || !self.have_output {
            if start > end {
                return;
            }

            if !interior {
                for info in &mut self.info[start..end] {
                    info.mask |= mask;
                }
            } else {
                let cluster = Self::find_min_cluster(self.cluster_level, &self.info, start, end, None);
                self.infos_set_glyph_flags(false, start, end, cluster, mask);
            }
        } else {
            debug_assert!(start <= self.out_len);
            debug_assert!(self.idx <= end);

            if !interior {
                let out_len = self.out_len;
                for info in &mut self.out_info_mut()[start..out_len] {
                    info.mask |= mask;
                }

                for info in &mut self.info[self.idx..end] {
                    info.mask |= mask;
                }
            } else {
                let mut cluster =
                    Self::find_min_cluster(self.cluster_level, &self.info, self.idx, end, None);
                cluster = Self::find_min_cluster(
                    self.cluster_level,
                    self.out_info(),
                    start,
                    self.out_len,
                    Some(cluster),
                );

                let out_len = self.out_len;
                self.infos_set_glyph_flags(true, start, out_len, cluster, mask);
                self.infos_set_glyph_flags(false, self.idx, end, cluster, mask);
            }
        }
    }

    fn find_min_cluster(
        cluster_level: BufferClusterLevel,
        infos: &[GlyphInfo],
        start: usize,
        end: usize,
        cluster: Option<u32>,
    ) -> u32 {
        let mut cluster = cluster.unwrap_or(u32::MAX);

        if start == end {
            return cluster;
        }

        if cluster_level == BufferClusterLevel::Characters {
            for info in &infos[start..end] {
                cluster = core::cmp::min(cluster, info.cluster);
            }

            return cluster;
        }

        cluster
            .min(infos[start].cluster)
            .min(infos[end - 1].cluster)
    }

    fn infos_set_glyph_flags(
        &mut self,
        out_buffer: bool,
        start: usize,
        end: usize,
        cluster: u32,
        mask: Mask,
    ) {
        if start == end {
            return;
        }

        let cluster_level = self.cluster_level;
        let mut touched = false;
        let infos = if out_buffer {
            self.out_info_mut()
        } else {
            &mut self.info[..]
        };

        let cluster_first = infos[start].cluster;
        let cluster_last = infos[end - 1].cluster;

        if cluster_level == BufferClusterLevel::Characters
            || (cluster != cluster_first && cluster != cluster_last)
        {
            for info in &mut infos[start..end] {
                if info.cluster != cluster {
                    touched = true;
                    info.mask |= mask;
                }
            }
        } else if cluster == cluster_first {
            // Monotone clusters
            let mut i = end;
            while start < i && infos[i - 1].cluster != cluster_first {
                touched = true;
                infos[i - 1].mask |= mask;
                i -= 1;
            }
        } else {
            // cluster == cluster_last
            let mut i = start;
            while i < end && infos[i].cluster != cluster_last {
                touched = true;
                infos[i].mask |= mask;
                i += 1;
            }
        }

        if touched {
            self.scratch_flags |= BufferScratchFlags::HAS_GLYPH_FLAGS;
        }
    }

    pub fn move_to(&mut self, i: usize) -> bool {
        if !self.have_output {
            assert!(i <= self.len);
            self.idx = i;
            return true;
        }

        if !self.successful {
            return false;
        }

        assert!(i <= self.out_len + (self.len - self.idx));

        if self.out_len < i {
            let count = i - self.out_len;
            if !self.make_room_for(count, count) {
                return false;
            }

            self.copy_to_output(self.idx, self.out_len, count);
            self.idx += count;
            self.out_len += count;
        } else if self.out_len > i {
            // Tricky part: rewinding...
            let count = self.out_len - i;

            // This will blow in our face if memory allocation fails later
            // in this same lookup...
            //
            // We used to shift with extra 32 items.
            // But that would leave empty slots in the buffer in case of allocation
            // failures.  See comments in shift_forward().  This can cause O(N^2)
            // behavior more severely than adding 32 empty slots can...
            if self.idx < count && !self.shift_forward(count - self.idx) {
                return false;
            }

            assert!(self.idx >= count);

            self.idx -= count;
            self.out_len -= count;
            self.copy_from_output(self.out_len, self.idx, count);
        }

        true
    }

    fn copy_to_output(&mut self, src: usize, dst: usize, count: usize) {
        if self.have_separate_output {
            self.out_info[dst..dst + count].copy_from_slice(&self.info[src..src + count]);
        } else {
            self.info.copy_within(src..src + count, dst);
        }
    }

    fn copy_from_output(&mut self, src: usize, dst: usize, count: usize) {
        if self.have_separate_output {
            self.info[dst..dst + count].copy_from_slice(&self.out_info[src..src + count]);
        } else {
            self.info.copy_within(src..src + count, dst);
        }
    }

    #[must_use]
    pub fn ensure(&mut self, size: usize) -> bool {
        if size < self.info.len() {
            true
        } else {
            self.enlarge(size)
        }
    }

    fn enlarge(&mut self, size: usize) -> bool {
        if !self.successful {
            return false;
        }

        if size > self.max_len {
            self.successful = false;
            return false;
        }

        let mut new_allocated = self.info.len();
        while size >= new_allocated {
            new_allocated += (new_allocated >> 1) + 32;
        }

        let additional = new_allocated - self.info.len();
        if self.info.try_reserve(additional).is_err()
            || self.pos.try_reserve(additional).is_err()
            || self.out_info.try_reserve(additional).is_err()
        {
            self.successful = false;
            return false;
        }

        self.info.resize(new_allocated, GlyphInfo::default());
        self.pos.resize(new_allocated, GlyphPosition::default());
        self.out_info.resize(new_allocated, GlyphInfo::default());
        true
    }

    fn make_room_for(&mut self, num_in: usize, num_out: usize) -> bool {
        if !self.ensure(self.out_len + num_out) {
            return false;
        }

        if !self.have_separate_output && self.out_len + num_out > self.idx + num_in {
            assert!(self.have_output);

            self.have_separate_output = true;
            let out_len = self.out_len;
            self.out_info[..out_len].copy_from_slice(&self.info[..out_len]);
        }

        true
    }

    fn shift_forward(&mut self, count: usize) -> bool {
        assert!(self.have_output);
        if !self.ensure(self.len + count) {
            return false;
        }

        self.info.copy_within(self.idx..self.len, self.idx + count);

        if self.idx + count > self.len {
            // Under memory failure we might expose this area.  At least
            // clean it up.  Oh well...
            for info in &mut self.info[self.len..self.idx + count] {
                *info = GlyphInfo::default();
            }
        }

        self.len += count;
        self.idx += count;

        true
    }

    pub fn sort(&mut self, start: usize, end: usize, cmp: impl Fn(&GlyphInfo, &GlyphInfo) -> bool) {
        assert!(!self.have_positions);

        for i in start + 1..end {
            let mut j = i;
            while j > start && cmp(&self.info[j - 1], &self.info[i]) {
                j -= 1;
            }

            if i == j {
                continue;
            }

            // Move item i to occupy place for item j, shift what's in between.
            self.merge_clusters(j, i + 1);

            {
                let t = self.info[i];
                self.info.copy_within(j..i, j + 1);
                self.info[j] = t;
            }
        }
    }

    pub fn set_cluster(info: &mut GlyphInfo, cluster: u32, mask: Mask) {
        if info.cluster != cluster {
            info.mask = (info.mask & !glyph_flag::DEFINED) | (mask & glyph_flag::DEFINED);
        }

        info.cluster = cluster;
    }

    // Called around shape()
    pub(crate) fn enter(&mut self) {
        self.serial = 0;
        self.scratch_flags = BufferScratchFlags::empty();

        if let Some(len) = self.len.checked_mul(Buffer::MAX_LEN_FACTOR) {
            self.max_len = len.max(Buffer::MAX_LEN_MIN);
        }

        if let Ok(len) = i32::try_from(self.len) {
            if let Some(ops) = len.checked_mul(Buffer::MAX_OPS_FACTOR) {
                self.max_ops = ops.max(Buffer::MAX_OPS_MIN);
            }
        }
    }

    // Called around shape()
    pub(crate) fn leave(&mut self) {
        self.max_len = Buffer::MAX_LEN_DEFAULT;
        self.max_ops = Buffer::MAX_OPS_DEFAULT;
        self.serial = 0;
    }

    fn clear(&mut self) {
        self.direction = Direction::Invalid;
        self.script = None;
        self.language = None;
        self.scratch_flags = BufferScratchFlags::default();

        self.successful = true;
        self.have_output = false;
        self.have_positions = false;

        self.idx = 0;
        self.info.clear();
        self.pos.clear();
        self.out_info.clear();
        self.len = 0;
        self.out_len = 0;
        self.have_separate_output = false;

        self.serial = 0;
    }

    #[inline]
    pub fn cur(&self, i: usize) -> &GlyphInfo {
        &self.info[self.idx + i]
    }

    #[inline]
    pub fn cur_mut(&mut self, i: usize) -> &mut GlyphInfo {
        let idx = self.idx + i;
        &mut self.info[idx]
    }

    #[inline]
    pub fn cur_pos_mut(&mut self) -> &mut GlyphPosition {
        let i = self.idx;
        &mut self.pos[i]
    }

    #[inline]
    pub fn prev(&self) -> GlyphInfo {
        let idx = self.out_len.saturating_sub(1);
        self.out_info()[idx]
    }

    pub fn digest(&self) -> SetDigest {
        let mut digest = SetDigest::new();
        for info in &self.info[..self.len] {
            digest.add(info.as_glyph());
        }

        digest
    }

    pub fn allocate_lig_id(&mut self) -> u8 {
        let mut lig_id = self.next_serial() & 0x07;

        if lig_id == 0 {
            // In case of overflow.
            lig_id = self.next_serial() & 0x07;
        }

        lig_id
    }

    pub fn group_end(&self, mut start: usize, group: impl Fn(&GlyphInfo, &GlyphInfo) -> bool) -> usize {
        start += 1;

        while start < self.len && group(&self.info[start - 1], &self.info[start]) {
            start += 1;
        }

        start
    }

    pub fn next_syllable(&self, mut start: usize) -> usize {
        if start >= self.len {
            return start;
        }

        let syllable = self.info[start].syllable();
        start += 1;
        while start < self.len && syllable == self.info[start].syllable() {
            start += 1;
        }

        start
    }

    pub fn reverse_groups(
        &mut self,
        group: impl Fn(&GlyphInfo, &GlyphInfo) -> bool,
        merge_clusters: bool,
    ) {
        if self.is_empty() {
            return;
        }

        let mut start = 0;
        let mut i = 1;

        while i < self.len {
            if !group(&self.info[i - 1], &self.info[i]) {
                if merge_clusters {
                    self.merge_clusters(start, i);
                }

                self.reverse_range(start, i);
                start = i;
            }

            i += 1;
        }

        if merge_clusters {
            self.merge_clusters(start, i);
        }

        self.reverse_range(start, i);

        self.reverse();
    }

    pub fn reverse_clusters(&mut self) {
        self.reverse_groups(|a, b| a.cluster == b.cluster, false);
    }
}

/// A buffer that contains an input string ready for shaping.
pub struct UnicodeBuffer(pub(crate) Buffer);

impl UnicodeBuffer {
    /// Create a new `UnicodeBuffer`.
    #[inline]
    pub fn new() -> UnicodeBuffer {
        UnicodeBuffer(Buffer::new())
    }

    /// Returns the length of the data of the buffer.
    ///
    /// This corresponds to the number of unicode codepoints contained in the
    /// buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pushes a string to a buffer.
    ///
    /// Each character gets the byte offset of its first byte as a cluster.
    #[inline]
    pub fn push_str(&mut self, str: &str) {
        for (i, c) in str.char_indices() {
            self.add(c, i as u32);
        }
    }

    /// Appends a character to a buffer with the given cluster value.
    #[inline]
    pub fn add(&mut self, codepoint: char, cluster: u32) {
        self.0.add(codepoint as u32, cluster);
    }

    /// Set the text direction of the `Buffer`'s contents.
    #[inline]
    pub fn set_direction(&mut self, direction: Direction) {
        self.0.direction = direction;
    }

    /// Returns the `Buffer`'s text direction.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.0.direction
    }

    /// Set the script from an ISO15924 tag.
    #[inline]
    pub fn set_script(&mut self, script: Script) {
        self.0.script = Some(script);
    }

    /// Get the ISO15924 script tag.
    pub fn script(&self) -> Script {
        self.0.script.unwrap_or(script::UNKNOWN)
    }

    /// Set the buffer language.
    #[inline]
    pub fn set_language(&mut self, lang: Language) {
        self.0.language = Some(lang);
    }

    /// Get the buffer language.
    #[inline]
    pub fn language(&self) -> Option<Language> {
        self.0.language.clone()
    }

    /// Guess the segment properties (direction, language, script) for the
    /// current buffer.
    #[inline]
    pub fn guess_segment_properties(&mut self) {
        self.0.guess_segment_properties();
    }

    /// Set the flags for this buffer.
    #[inline]
    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.0.flags = flags;
    }

    /// Get the flags for this buffer.
    #[inline]
    pub fn flags(&self) -> BufferFlags {
        self.0.flags
    }

    /// Set the cluster level of the buffer.
    #[inline]
    pub fn set_cluster_level(&mut self, cluster_level: BufferClusterLevel) {
        self.0.cluster_level = cluster_level;
    }

    /// Retrieve the cluster level of the buffer.
    #[inline]
    pub fn cluster_level(&self) -> BufferClusterLevel {
        self.0.cluster_level
    }

    /// Resets clusters.
    #[inline]
    pub fn reset_clusters(&mut self) {
        self.0.reset_clusters();
    }

    /// Clear the contents of the buffer.
    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl core::fmt::Debug for UnicodeBuffer {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.debug_struct("UnicodeBuffer")
            .field("direction", &self.direction())
            .field("language", &self.language())
            .field("script", &self.script())
            .field("cluster_level", &self.cluster_level())
            .finish()
    }
}

impl Default for UnicodeBuffer {
    fn default() -> UnicodeBuffer {
        UnicodeBuffer::new()
    }
}

/// A buffer that contains the results of the shaping process.
pub struct GlyphBuffer(pub(crate) Buffer);

impl GlyphBuffer {
    /// Returns the length of the data of the buffer.
    ///
    /// When called before shaping this is the number of unicode codepoints
    /// contained in the buffer. When called after shaping it returns the number
    /// of glyphs stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len
    }

    /// Returns `true` if the buffer contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the glyph infos.
    #[inline]
    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.0.info[0..self.0.len]
    }

    /// Get the glyph positions.
    #[inline]
    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.0.pos[0..self.0.len]
    }

    /// Clears the content of the glyph buffer and returns an empty
    /// `UnicodeBuffer` reusing the existing allocation.
    #[inline]
    pub fn clear(mut self) -> UnicodeBuffer {
        self.0.clear();
        UnicodeBuffer(self.0)
    }

    /// Converts the glyph buffer content into a string.
    pub fn serialize(&self, face: &Face, flags: SerializeFlags) -> String {
        self.serialize_impl(face, flags).unwrap_or_default()
    }

    fn serialize_impl(
        &self,
        face: &Face,
        flags: SerializeFlags,
    ) -> Result<String, core::fmt::Error> {
        let mut s = String::with_capacity(64);

        let info = self.glyph_infos();
        let pos = self.glyph_positions();
        let mut x = 0;
        let mut y = 0;
        for (info, pos) in info.iter().zip(pos) {
            if !s.is_empty() {
                s.push('|');
            }

            if !flags.contains(SerializeFlags::NO_GLYPH_NAMES) {
                match face.glyph_name(info.as_glyph()) {
                    Some(name) => s.push_str(name),
                    None => write!(&mut s, "gid{}", info.glyph_id)?,
                }
            } else {
                write!(&mut s, "{}", info.glyph_id)?;
            }

            if !flags.contains(SerializeFlags::NO_CLUSTERS) {
                write!(&mut s, "={}", info.cluster)?;
            }

            if !flags.contains(SerializeFlags::NO_POSITIONS) {
                if x + pos.x_offset != 0 || y + pos.y_offset != 0 {
                    write!(&mut s, "@{},{}", x + pos.x_offset, y + pos.y_offset)?;
                }

                if !flags.contains(SerializeFlags::NO_ADVANCES) {
                    write!(&mut s, "+{}", pos.x_advance)?;
                    if pos.y_advance != 0 {
                        write!(&mut s, ",{}", pos.y_advance)?;
                    }
                }
            }

            if flags.contains(SerializeFlags::GLYPH_FLAGS) {
                if info.mask & glyph_flag::DEFINED != 0 {
                    write!(&mut s, "#{:X}", info.mask & glyph_flag::DEFINED)?;
                }
            }

            if flags.contains(SerializeFlags::NO_ADVANCES) {
                x += pos.x_advance;
                y += pos.y_advance;
            }
        }

        Ok(s)
    }
}

impl core::fmt::Debug for GlyphBuffer {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.debug_struct("GlyphBuffer")
            .field("glyph_positions", &self.glyph_positions())
            .field("glyph_infos", &self.glyph_infos())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_from(glyphs: &[u32]) -> Buffer {
        let mut buffer = Buffer::new();
        for (i, g) in glyphs.iter().enumerate() {
            buffer.add(*g, i as u32);
        }
        buffer
    }

    fn glyphs(buffer: &Buffer) -> Vec<u32> {
        buffer.info_slice().iter().map(|info| info.glyph_id).collect()
    }

    fn clusters(buffer: &Buffer) -> Vec<u32> {
        buffer.info_slice().iter().map(|info| info.cluster).collect()
    }

    #[test]
    fn var_slots_do_not_overlap() {
        let mut info = GlyphInfo::default();
        info.set_glyph_props(0xABCD);
        info.set_lig_props(0x12);
        info.set_syllable(0x34);
        info.set_unicode_props(0x5678);
        assert_eq!(info.glyph_props(), 0xABCD);
        assert_eq!(info.lig_props(), 0x12);
        assert_eq!(info.syllable(), 0x34);
        assert_eq!(info.unicode_props(), 0x5678);

        let mut pos = GlyphPosition::default();
        pos.set_attach_chain(-3);
        pos.set_attach_type(2);
        assert_eq!(pos.attach_chain(), -3);
        assert_eq!(pos.attach_type(), 2);
    }

    #[test]
    fn lig_props() {
        let mut info = GlyphInfo::default();
        info.set_glyph_props(GlyphPropsFlags::LIGATURE.bits());
        info.set_lig_props_for_ligature(5, 3);
        assert_eq!(info.lig_id(), 5);
        assert_eq!(info.lig_comp(), 0);
        assert_eq!(info.lig_num_comps(), 3);

        let mut mark = GlyphInfo::default();
        mark.set_glyph_props(GlyphPropsFlags::MARK.bits());
        mark.set_lig_props_for_mark(5, 2);
        assert_eq!(mark.lig_id(), 5);
        assert_eq!(mark.lig_comp(), 2);
        assert_eq!(mark.lig_num_comps(), 1);
    }

    #[test]
    fn unicode_props() {
        let mut flags = BufferScratchFlags::empty();

        let mut info = GlyphInfo {
            glyph_id: 0x200D,
            ..GlyphInfo::default()
        };
        info.init_unicode_props(&mut flags);
        assert!(info.is_zwj());
        assert!(!info.is_zwnj());
        assert!(info.is_default_ignorable());
        assert!(flags.contains(BufferScratchFlags::HAS_DEFAULT_IGNORABLES));

        let mut info = GlyphInfo {
            glyph_id: 0x0301,
            ..GlyphInfo::default()
        };
        info.init_unicode_props(&mut flags);
        assert!(info.is_unicode_mark());
        assert!(info.is_continuation());
        assert_eq!(info.modified_combining_class(), 230);

        let mut info = GlyphInfo {
            glyph_id: 0x180B,
            ..GlyphInfo::default()
        };
        info.init_unicode_props(&mut flags);
        assert!(info.is_hidden());
    }

    #[test]
    fn in_place_output() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.clear_output();
        buffer.replace_glyph(10);
        buffer.next_glyph();
        buffer.replace_glyph(30);
        assert!(!buffer.have_separate_output);
        assert!(buffer.sync());
        assert_eq!(glyphs(&buffer), vec![10, 2, 30]);
    }

    #[test]
    fn growing_output_becomes_separate() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.clear_output();
        buffer.next_glyph();
        buffer.replace_glyphs(1, 3, &[20, 21, 22]);
        assert!(buffer.have_separate_output);
        assert!(buffer.sync());
        assert_eq!(glyphs(&buffer), vec![1, 20, 21, 22, 3]);
        assert_eq!(clusters(&buffer), vec![0, 1, 1, 1, 2]);
    }

    #[test]
    fn delete_merges_cluster_backward() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.clear_output();
        buffer.next_glyph();
        buffer.delete_glyph();
        buffer.next_glyph();
        assert!(buffer.sync());
        assert_eq!(glyphs(&buffer), vec![1, 3]);
        // Cluster 1 was merged into the previous glyph.
        assert_eq!(clusters(&buffer), vec![0, 2]);
    }

    #[test]
    fn delete_first_merges_forward() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.clear_output();
        buffer.delete_glyph();
        assert!(buffer.sync());
        assert_eq!(glyphs(&buffer), vec![2, 3]);
        assert_eq!(clusters(&buffer), vec![0, 2]);
    }

    #[test]
    fn move_to_rewinds() {
        let mut buffer = buffer_from(&[1, 2, 3, 4]);
        buffer.clear_output();
        buffer.next_glyphs(3);
        assert_eq!(buffer.out_len, 3);
        assert!(buffer.move_to(1));
        assert_eq!(buffer.out_len, 1);
        assert_eq!(buffer.idx, 1);
        assert_eq!(buffer.cur(0).glyph_id, 2);
        assert!(buffer.move_to(4));
        assert!(buffer.sync());
        assert_eq!(glyphs(&buffer), vec![1, 2, 3, 4]);
    }

    #[test]
    fn merge_clusters_extends() {
        let mut buffer = buffer_from(&[1, 2, 3, 4]);
        buffer.info[2].cluster = 1;
        buffer.merge_clusters(0, 2);
        assert_eq!(clusters(&buffer), vec![0, 0, 0, 3]);
    }

    #[test]
    fn unsafe_to_break_marks_interior() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.unsafe_to_break(Some(0), Some(3));
        assert!(!buffer.info[0].unsafe_to_break());
        assert!(buffer.info[1].unsafe_to_break());
        assert!(buffer.info[2].unsafe_to_break());
        assert!(buffer.scratch_flags.contains(BufferScratchFlags::HAS_GLYPH_FLAGS));
    }

    #[test]
    fn unsafe_to_concat_requires_flag() {
        let mut buffer = buffer_from(&[1, 2]);
        buffer.unsafe_to_concat(Some(0), Some(2));
        assert!(!buffer.info[1].unsafe_to_concat());

        buffer.flags = BufferFlags::PRODUCE_UNSAFE_TO_CONCAT;
        buffer.unsafe_to_concat(Some(0), Some(2));
        assert!(buffer.info[0].unsafe_to_concat());
        assert!(buffer.info[1].unsafe_to_concat());
    }

    #[test]
    fn reverse_clusters_keeps_groups() {
        let mut buffer = buffer_from(&[1, 2, 3]);
        buffer.info[1].cluster = 0;
        buffer.reverse_clusters();
        assert_eq!(glyphs(&buffer), vec![3, 1, 2]);
    }

    #[test]
    fn sort_merges_clusters() {
        let mut buffer = buffer_from(&[3, 1, 2]);
        buffer.sort(0, 3, |a, b| a.glyph_id > b.glyph_id);
        assert_eq!(glyphs(&buffer), vec![1, 2, 3]);
        assert_eq!(clusters(&buffer), vec![0, 0, 0]);
    }

    #[test]
    fn delete_inplace() {
        let mut buffer = buffer_from(&[1, 0, 2]);
        buffer.clear_positions();
        buffer.delete_glyphs_inplace(|info| info.glyph_id == 0);
        assert_eq!(glyphs(&buffer), vec![1, 2]);
        assert_eq!(clusters(&buffer), vec![0, 2]);
    }

    #[test]
    fn lig_ids_skip_zero() {
        let mut buffer = Buffer::new();
        for _ in 0..32 {
            assert_ne!(buffer.allocate_lig_id(), 0);
        }
    }

    #[test]
    fn max_len_budget() {
        let mut buffer = buffer_from(&[1]);
        buffer.max_len = 4;
        buffer.clear_output();
        buffer.replace_glyphs(1, 8, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(!buffer.successful);
        assert!(!buffer.sync());
    }

    #[test]
    fn segment_properties() {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(" \u{05D0}");
        buffer.guess_segment_properties();
        assert_eq!(buffer.script(), script::HEBREW);
        assert_eq!(buffer.direction(), Direction::RightToLeft);
    }
}
