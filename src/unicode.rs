use unicode_properties::UnicodeGeneralCategory;

use crate::common::{script, Script};
use crate::Tag;

/// A general category value, numbered so that it fits into 5 bits
/// of the per-glyph unicode props.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum GeneralCategory {
    Control = 0,
    Format = 1,
    Unassigned = 2,
    PrivateUse = 3,
    Surrogate = 4,
    LowercaseLetter = 5,
    ModifierLetter = 6,
    OtherLetter = 7,
    TitlecaseLetter = 8,
    UppercaseLetter = 9,
    SpacingMark = 10,
    EnclosingMark = 11,
    NonspacingMark = 12,
    DecimalNumber = 13,
    LetterNumber = 14,
    OtherNumber = 15,
    ConnectorPunctuation = 16,
    DashPunctuation = 17,
    ClosePunctuation = 18,
    FinalPunctuation = 19,
    InitialPunctuation = 20,
    OtherPunctuation = 21,
    OpenPunctuation = 22,
    CurrencySymbol = 23,
    ModifierSymbol = 24,
    MathSymbol = 25,
    OtherSymbol = 26,
    LineSeparator = 27,
    ParagraphSeparator = 28,
    SpaceSeparator = 29,
}

impl GeneralCategory {
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(n: u8) -> Self {
        use GeneralCategory::*;
        match n {
            0 => Control,
            1 => Format,
            3 => PrivateUse,
            4 => Surrogate,
            5 => LowercaseLetter,
            6 => ModifierLetter,
            7 => OtherLetter,
            8 => TitlecaseLetter,
            9 => UppercaseLetter,
            10 => SpacingMark,
            11 => EnclosingMark,
            12 => NonspacingMark,
            13 => DecimalNumber,
            14 => LetterNumber,
            15 => OtherNumber,
            16 => ConnectorPunctuation,
            17 => DashPunctuation,
            18 => ClosePunctuation,
            19 => FinalPunctuation,
            20 => InitialPunctuation,
            21 => OtherPunctuation,
            22 => OpenPunctuation,
            23 => CurrencySymbol,
            24 => ModifierSymbol,
            25 => MathSymbol,
            26 => OtherSymbol,
            27 => LineSeparator,
            28 => ParagraphSeparator,
            29 => SpaceSeparator,
            _ => Unassigned,
        }
    }

    #[inline]
    pub fn is_mark(self) -> bool {
        matches!(
            self,
            Self::SpacingMark | Self::EnclosingMark | Self::NonspacingMark
        )
    }

    #[inline]
    pub fn is_letter(self) -> bool {
        matches!(
            self,
            Self::LowercaseLetter
                | Self::ModifierLetter
                | Self::OtherLetter
                | Self::TitlecaseLetter
                | Self::UppercaseLetter
        )
    }
}

impl From<unicode_properties::GeneralCategory> for GeneralCategory {
    fn from(gc: unicode_properties::GeneralCategory) -> Self {
        use unicode_properties::GeneralCategory as G;
        match gc {
            G::UppercaseLetter => Self::UppercaseLetter,
            G::LowercaseLetter => Self::LowercaseLetter,
            G::TitlecaseLetter => Self::TitlecaseLetter,
            G::ModifierLetter => Self::ModifierLetter,
            G::OtherLetter => Self::OtherLetter,
            G::NonspacingMark => Self::NonspacingMark,
            G::SpacingMark => Self::SpacingMark,
            G::EnclosingMark => Self::EnclosingMark,
            G::DecimalNumber => Self::DecimalNumber,
            G::LetterNumber => Self::LetterNumber,
            G::OtherNumber => Self::OtherNumber,
            G::ConnectorPunctuation => Self::ConnectorPunctuation,
            G::DashPunctuation => Self::DashPunctuation,
            G::OpenPunctuation => Self::OpenPunctuation,
            G::ClosePunctuation => Self::ClosePunctuation,
            G::InitialPunctuation => Self::InitialPunctuation,
            G::FinalPunctuation => Self::FinalPunctuation,
            G::OtherPunctuation => Self::OtherPunctuation,
            G::MathSymbol => Self::MathSymbol,
            G::CurrencySymbol => Self::CurrencySymbol,
            G::ModifierSymbol => Self::ModifierSymbol,
            G::OtherSymbol => Self::OtherSymbol,
            G::SpaceSeparator => Self::SpaceSeparator,
            G::LineSeparator => Self::LineSeparator,
            G::ParagraphSeparator => Self::ParagraphSeparator,
            G::Control => Self::Control,
            G::Format => Self::Format,
            G::Surrogate => Self::Surrogate,
            G::PrivateUse => Self::PrivateUse,
            G::Unassigned => Self::Unassigned,
        }
    }
}

pub trait CharExt {
    fn general_category(self) -> GeneralCategory;
    fn script(self) -> Script;
    fn combining_class(self) -> u8;
    fn modified_combining_class(self) -> u8;
    fn mirrored(self) -> Option<char>;
    fn is_default_ignorable(self) -> bool;
    fn is_variation_selector(self) -> bool;
}

impl CharExt for char {
    fn general_category(self) -> GeneralCategory {
        GeneralCategory::from(UnicodeGeneralCategory::general_category(self))
    }

    fn script(self) -> Script {
        let name = unicode_script::UnicodeScript::script(&self).short_name();
        Script::from_iso15924_tag(Tag::from_bytes_lossy(name.as_bytes()))
            .unwrap_or(script::UNKNOWN)
    }

    fn combining_class(self) -> u8 {
        unicode_ccc::get_canonical_combining_class(self) as u8
    }

    fn modified_combining_class(self) -> u8 {
        let u = self as u32;

        // Reorder SAKOT to ensure it comes after any tone marks.
        if u == 0x1A60 {
            return 254;
        }

        // Reorder PADMA to ensure it comes after any vowel marks.
        if u == 0x0FC6 {
            return 254;
        }

        // Reorder TSA -PHRU to reorder before U+0F74
        if u == 0x0F39 {
            return 127;
        }

        let class = self.combining_class();
        MODIFIED_COMBINING_CLASS
            .iter()
            .find(|(from, _)| *from == class)
            .map_or(class, |(_, to)| *to)
    }

    fn mirrored(self) -> Option<char> {
        unicode_bidi_mirroring::get_mirrored(self)
    }

    fn is_default_ignorable(self) -> bool {
        is_default_ignorable(self as u32)
    }

    fn is_variation_selector(self) -> bool {
        let c = self as u32;
        (0x180B..=0x180D).contains(&c)
            || c == 0x180F
            || (0xFE00..=0xFE0F).contains(&c)
            || (0xE0100..=0xE01EF).contains(&c)
    }
}

// Hebrew, Arabic, Syriac, Telugu, Thai, Lao and Tibetan classes are
// renumbered so that the canonical ordering matches the visual one.
const MODIFIED_COMBINING_CLASS: &[(u8, u8)] = &[
    // Hebrew
    (10, 22),
    (11, 15),
    (12, 16),
    (13, 17),
    (14, 23),
    (15, 18),
    (16, 19),
    (17, 20),
    (18, 21),
    (19, 14),
    (20, 24),
    (21, 12),
    (22, 25),
    (23, 13),
    (24, 10),
    (25, 11),
    (26, 26),
    // Arabic
    (27, 28),
    (28, 29),
    (29, 30),
    (30, 31),
    (31, 32),
    (32, 33),
    (33, 27),
    (34, 34),
    (35, 35),
    // Syriac
    (36, 36),
    // Telugu
    (84, 0),
    (91, 0),
    // Thai
    (103, 3),
    (107, 107),
    // Lao
    (118, 118),
    (122, 122),
    // Tibetan
    (129, 129),
    (130, 132),
    (132, 131),
];

// Default_Ignorable codepoints:
//
// Note: While U+115F, U+1160, U+3164 and U+FFA0 are Default_Ignorable,
// we do NOT want to hide them, as the way Uniscribe has implemented them
// is with regular spacing glyphs, and that's the way fonts are made to work.
// As such, we make exceptions for those four.
// Also ignoring U+1BCA0..1BCA3.
//
// 00AD          # Cf       SOFT HYPHEN
// 034F          # Mn       COMBINING GRAPHEME JOINER
// 061C          # Cf       ARABIC LETTER MARK
// 17B4..17B5    # Mn   [2] KHMER VOWEL INHERENT AQ..KHMER VOWEL INHERENT AA
// 180B..180D    # Mn   [3] MONGOLIAN FREE VARIATION SELECTOR ONE..THREE
// 180E          # Cf       MONGOLIAN VOWEL SEPARATOR
// 180F          # Mn       MONGOLIAN FREE VARIATION SELECTOR FOUR
// 200B..200F    # Cf   [5] ZERO WIDTH SPACE..RIGHT-TO-LEFT MARK
// 202A..202E    # Cf   [5] LEFT-TO-RIGHT EMBEDDING..RIGHT-TO-LEFT OVERRIDE
// 2060..206F    # Cf  [16] WORD JOINER..NOMINAL DIGIT SHAPES
// FE00..FE0F    # Mn  [16] VARIATION SELECTOR-1..VARIATION SELECTOR-16
// FEFF          # Cf       ZERO WIDTH NO-BREAK SPACE
// FFF0..FFF8    # Cn   [9] <reserved-FFF0>..<reserved-FFF8>
// 1D173..1D17A  # Cf   [8] MUSICAL SYMBOL BEGIN BEAM..MUSICAL SYMBOL END PHRASE
// E0000..E0FFF  #          TAGS, VARIATION SELECTORS-17..256 and reserved
pub fn is_default_ignorable(ch: u32) -> bool {
    let plane = ch >> 16;
    if plane == 0 {
        // BMP
        let page = ch >> 8;
        match page {
            0x00 => ch == 0x00AD,
            0x03 => ch == 0x034F,
            0x06 => ch == 0x061C,
            0x17 => (0x17B4..=0x17B5).contains(&ch),
            0x18 => (0x180B..=0x180F).contains(&ch),
            0x20 => {
                (0x200B..=0x200F).contains(&ch)
                    || (0x202A..=0x202E).contains(&ch)
                    || (0x2060..=0x206F).contains(&ch)
            }
            0xFE => (0xFE00..=0xFE0F).contains(&ch) || ch == 0xFEFF,
            0xFF => (0xFFF0..=0xFFF8).contains(&ch),
            _ => false,
        }
    } else {
        // Other planes
        match plane {
            0x01 => (0x1D173..=0x1D17A).contains(&ch),
            0x0E => (0xE0000..=0xE0FFF).contains(&ch),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_category_roundtrips_through_props() {
        for c in ['a', 'A', '\u{301}', '1', ' ', '\u{200D}', '\u{E000}'] {
            let gc = CharExt::general_category(c);
            assert_eq!(GeneralCategory::from_u8(gc.to_u8()), gc);
        }

        assert_eq!(CharExt::general_category('\u{301}'), GeneralCategory::NonspacingMark);
        assert_eq!(CharExt::general_category('\u{200D}'), GeneralCategory::Format);
    }

    #[test]
    fn default_ignorables() {
        assert!('\u{200C}'.is_default_ignorable());
        assert!('\u{200D}'.is_default_ignorable());
        assert!('\u{034F}'.is_default_ignorable());
        assert!('\u{FE0F}'.is_default_ignorable());
        assert!('\u{E0041}'.is_default_ignorable());
        assert!(!'\u{3164}'.is_default_ignorable());
        assert!(!'a'.is_default_ignorable());
    }

    #[test]
    fn modified_classes() {
        // HEBREW POINT SHEVA
        assert_eq!('\u{05B0}'.combining_class(), 10);
        assert_eq!('\u{05B0}'.modified_combining_class(), 22);
        // COMBINING ACUTE ACCENT is unchanged.
        assert_eq!('\u{0301}'.modified_combining_class(), 230);
    }

    #[test]
    fn scripts() {
        assert_eq!('a'.script(), script::LATIN);
        assert_eq!('\u{0627}'.script(), script::ARABIC);
        assert_eq!(' '.script(), script::COMMON);
    }

    #[test]
    fn mirroring() {
        assert_eq!('('.mirrored(), Some(')'));
        assert_eq!('a'.mirrored(), None);
    }
}
