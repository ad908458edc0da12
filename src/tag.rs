//! Conversion of Unicode scripts and BCP 47 languages into OpenType tags.

use smallvec::SmallVec;

use crate::common::{script, Language, Script};
use crate::Tag;

/// The most script or language tags a single script or language maps to.
pub const MAX_TAGS: usize = 3;

pub type ScriptTags = SmallVec<[Tag; MAX_TAGS]>;
pub type LanguageTags = SmallVec<[Tag; MAX_TAGS]>;

// Sorted by language, as needed for binary search.
const LANGUAGES: &[(&str, Tag)] = &[
    ("ar", Tag::from_bytes(b"ARA ")),
    ("az", Tag::from_bytes(b"AZE ")),
    ("be", Tag::from_bytes(b"BEL ")),
    ("bg", Tag::from_bytes(b"BGR ")),
    ("bn", Tag::from_bytes(b"BEN ")),
    ("ca", Tag::from_bytes(b"CAT ")),
    ("cs", Tag::from_bytes(b"CSY ")),
    ("cy", Tag::from_bytes(b"WEL ")),
    ("da", Tag::from_bytes(b"DAN ")),
    ("de", Tag::from_bytes(b"DEU ")),
    ("el", Tag::from_bytes(b"ELL ")),
    ("en", Tag::from_bytes(b"ENG ")),
    ("es", Tag::from_bytes(b"ESP ")),
    ("et", Tag::from_bytes(b"ETI ")),
    ("fa", Tag::from_bytes(b"FAR ")),
    ("fi", Tag::from_bytes(b"FIN ")),
    ("fr", Tag::from_bytes(b"FRA ")),
    ("ga", Tag::from_bytes(b"IRI ")),
    ("gu", Tag::from_bytes(b"GUJ ")),
    ("he", Tag::from_bytes(b"IWR ")),
    ("hi", Tag::from_bytes(b"HIN ")),
    ("hr", Tag::from_bytes(b"HRV ")),
    ("hu", Tag::from_bytes(b"HUN ")),
    ("hy", Tag::from_bytes(b"HYE ")),
    ("id", Tag::from_bytes(b"IND ")),
    ("is", Tag::from_bytes(b"ISL ")),
    ("it", Tag::from_bytes(b"ITA ")),
    ("ja", Tag::from_bytes(b"JAN ")),
    ("ka", Tag::from_bytes(b"KAT ")),
    ("kk", Tag::from_bytes(b"KAZ ")),
    ("km", Tag::from_bytes(b"KHM ")),
    ("kn", Tag::from_bytes(b"KAN ")),
    ("ko", Tag::from_bytes(b"KOR ")),
    ("ku", Tag::from_bytes(b"KUR ")),
    ("lo", Tag::from_bytes(b"LAO ")),
    ("lt", Tag::from_bytes(b"LTH ")),
    ("lv", Tag::from_bytes(b"LVI ")),
    ("mk", Tag::from_bytes(b"MKD ")),
    ("ml", Tag::from_bytes(b"MAL ")),
    ("mn", Tag::from_bytes(b"MNG ")),
    ("mr", Tag::from_bytes(b"MAR ")),
    ("ms", Tag::from_bytes(b"MLY ")),
    ("my", Tag::from_bytes(b"BRM ")),
    ("ne", Tag::from_bytes(b"NEP ")),
    ("nl", Tag::from_bytes(b"NLD ")),
    ("no", Tag::from_bytes(b"NOR ")),
    ("pa", Tag::from_bytes(b"PAN ")),
    ("pl", Tag::from_bytes(b"PLK ")),
    ("ps", Tag::from_bytes(b"PAS ")),
    ("pt", Tag::from_bytes(b"PTG ")),
    ("ro", Tag::from_bytes(b"ROM ")),
    ("ru", Tag::from_bytes(b"RUS ")),
    ("sd", Tag::from_bytes(b"SND ")),
    ("si", Tag::from_bytes(b"SNH ")),
    ("sk", Tag::from_bytes(b"SKY ")),
    ("sl", Tag::from_bytes(b"SLV ")),
    ("sq", Tag::from_bytes(b"SQI ")),
    ("sr", Tag::from_bytes(b"SRB ")),
    ("sv", Tag::from_bytes(b"SVE ")),
    ("sw", Tag::from_bytes(b"SWK ")),
    ("ta", Tag::from_bytes(b"TAM ")),
    ("te", Tag::from_bytes(b"TEL ")),
    ("th", Tag::from_bytes(b"THA ")),
    ("tr", Tag::from_bytes(b"TRK ")),
    ("uk", Tag::from_bytes(b"UKR ")),
    ("ur", Tag::from_bytes(b"URD ")),
    ("uz", Tag::from_bytes(b"UZB ")),
    ("vi", Tag::from_bytes(b"VIT ")),
    ("yi", Tag::from_bytes(b"JII ")),
    ("zh", Tag::from_bytes(b"ZHS ")),
];

/// Converts a script and a language into OpenType script and language tags,
/// most preferred first.
pub fn tags_from_script_and_language(
    script: Option<Script>,
    language: Option<&Language>,
) -> (ScriptTags, LanguageTags) {
    let mut script_tags = ScriptTags::new();
    let mut language_tags = LanguageTags::new();

    let mut needs_script = true;
    let mut needs_language = true;

    if let Some(language) = language {
        let s = language.as_str();
        if let Some(tag) = private_use_tag(s, "-hbsc") {
            script_tags.push(tag);
            needs_script = false;
        }

        if let Some(tag) = private_use_tag(s, "-hbot") {
            language_tags.push(tag);
            needs_language = false;
        }
    }

    if needs_script {
        all_tags_from_script(script, &mut script_tags);
    }

    if needs_language {
        if let Some(language) = language {
            if let Some(tag) = tag_from_language(language.as_str()) {
                language_tags.push(tag);
            }
        }
    }

    (script_tags, language_tags)
}

// `x-hbotABCD` and `x-hbscABCD` select OpenType language and script tags directly.
fn private_use_tag(language: &str, prefix: &str) -> Option<Tag> {
    let private = language.find("x-")?;
    let rest = &language[private + 1..];
    let start = rest.find(prefix)? + prefix.len();
    let tag: &[u8] = rest[start..]
        .split('-')
        .next()
        .map(str::as_bytes)
        .unwrap_or_default();

    if tag.is_empty() || tag.len() > 4 {
        return None;
    }

    let tag = Tag::from_bytes_lossy(tag);
    if prefix == "-hbot" {
        // Language tags are uppercase.
        let b = tag.to_bytes();
        Some(Tag::from_bytes(&[
            b[0].to_ascii_uppercase(),
            b[1].to_ascii_uppercase(),
            b[2].to_ascii_uppercase(),
            b[3].to_ascii_uppercase(),
        ]))
    } else {
        Some(tag)
    }
}

fn tag_from_language(language: &str) -> Option<Tag> {
    let primary = language.split('-').next()?;
    LANGUAGES
        .binary_search_by(|(lang, _)| (*lang).cmp(primary))
        .ok()
        .map(|idx| LANGUAGES[idx].1)
}

fn all_tags_from_script(script: Option<Script>, tags: &mut ScriptTags) {
    if let Some(script) = script {
        if let Some(tag) = new_tag_from_script(script) {
            // Myanmar has 'mym2' but no 'mym3' and the rest no 3-tags yet.
            if tag != Tag::from_bytes(b"mym2") {
                let mut tag3 = tag.to_bytes();
                tag3[3] = b'3';
                tags.push(Tag::from_bytes(&tag3));
            }

            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    let old_tag = old_tag_from_script(script);
    if !tags.contains(&old_tag) {
        tags.push(old_tag);
    }
}

fn old_tag_from_script(script: Option<Script>) -> Tag {
    let script = match script {
        Some(script) => script,
        None => return Tag::from_bytes(b"DFLT"),
    };

    match script {
        // KATAKANA and HIRAGANA both map to 'kana'.
        script::HIRAGANA => Tag::from_bytes(b"kana"),

        // Spaces at the end are preserved, unlike ISO 15924.
        script::LAO => Tag::from_bytes(b"lao "),
        script::YI => Tag::from_bytes(b"yi  "),
        // Unicode-5.0 additions.
        script::NKO => Tag::from_bytes(b"nko "),
        // Unicode-5.1 additions.
        script::VAI => Tag::from_bytes(b"vai "),

        // Else, just change first char to lowercase and return.
        _ => Tag(script.tag().0 | 0x20000000),
    }
}

fn new_tag_from_script(script: Script) -> Option<Tag> {
    match script {
        script::BENGALI => Some(Tag::from_bytes(b"bng2")),
        script::DEVANAGARI => Some(Tag::from_bytes(b"dev2")),
        script::GUJARATI => Some(Tag::from_bytes(b"gjr2")),
        script::GURMUKHI => Some(Tag::from_bytes(b"gur2")),
        script::KANNADA => Some(Tag::from_bytes(b"knd2")),
        script::MALAYALAM => Some(Tag::from_bytes(b"mlm2")),
        script::ORIYA => Some(Tag::from_bytes(b"ory2")),
        script::TAMIL => Some(Tag::from_bytes(b"tml2")),
        script::TELUGU => Some(Tag::from_bytes(b"tel2")),
        script::MYANMAR => Some(Tag::from_bytes(b"mym2")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn tags(script: Option<Script>, lang: Option<&str>) -> (ScriptTags, LanguageTags) {
        let lang = lang.map(|s| Language::from_str(s).unwrap());
        tags_from_script_and_language(script, lang.as_ref())
    }

    #[test]
    fn languages_are_sorted() {
        assert!(LANGUAGES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn simple_script() {
        let (scripts, langs) = tags(Some(script::LATIN), None);
        assert_eq!(scripts.as_slice(), &[Tag::from_bytes(b"latn")]);
        assert!(langs.is_empty());
    }

    #[test]
    fn indic_script() {
        let (scripts, _) = tags(Some(script::DEVANAGARI), None);
        assert_eq!(
            scripts.as_slice(),
            &[
                Tag::from_bytes(b"dev3"),
                Tag::from_bytes(b"dev2"),
                Tag::from_bytes(b"deva"),
            ]
        );

        let (scripts, _) = tags(Some(script::MYANMAR), None);
        assert_eq!(
            scripts.as_slice(),
            &[Tag::from_bytes(b"mym2"), Tag::from_bytes(b"mymr")]
        );
    }

    #[test]
    fn special_scripts() {
        assert_eq!(tags(Some(script::HIRAGANA), None).0[0], Tag::from_bytes(b"kana"));
        assert_eq!(tags(Some(script::LAO), None).0[0], Tag::from_bytes(b"lao "));
        assert_eq!(tags(None, None).0[0], Tag::from_bytes(b"DFLT"));
    }

    #[test]
    fn languages() {
        let (_, langs) = tags(Some(script::LATIN), Some("de-AT"));
        assert_eq!(langs.as_slice(), &[Tag::from_bytes(b"DEU ")]);

        let (_, langs) = tags(Some(script::LATIN), Some("xx"));
        assert!(langs.is_empty());
    }

    #[test]
    fn private_use() {
        let (scripts, langs) = tags(Some(script::LATIN), Some("en-x-hbotabc-hbscgrek"));
        assert_eq!(scripts.as_slice(), &[Tag::from_bytes(b"grek")]);
        assert_eq!(langs.as_slice(), &[Tag::from_bytes(b"ABC ")]);
    }
}
