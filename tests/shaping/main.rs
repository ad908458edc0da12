extern crate alloc;

mod pipeline;
mod positioning;
mod substitution;

#[path = "../../src/testing.rs"]
mod testing;

use std::str::FromStr;

use rustyshaper::BufferFlags;

struct Args {
    font_ptem: Option<f32>,
    variations: Vec<String>,
    direction: Option<rustyshaper::Direction>,
    language: Option<rustyshaper::Language>,
    script: Option<rustyshaper::Script>,
    remove_default_ignorables: bool,
    preserve_default_ignorables: bool,
    unsafe_to_concat: bool,
    cluster_level: rustyshaper::BufferClusterLevel,
    features: Vec<String>,
    no_glyph_names: bool,
    no_positions: bool,
    no_advances: bool,
    no_clusters: bool,
    show_flags: bool,
    ned: bool,
    bot: bool,
    eot: bool,
}

fn parse_args(args: Vec<std::ffi::OsString>) -> Result<Args, pico_args::Error> {
    let mut parser = pico_args::Arguments::from_vec(args);
    let args = Args {
        font_ptem: parser.opt_value_from_str("--font-ptem")?,
        variations: parser
            .opt_value_from_fn("--variations", parse_string_list)?
            .unwrap_or_default(),
        direction: parser.opt_value_from_str("--direction")?,
        language: parser.opt_value_from_str("--language")?,
        script: parser.opt_value_from_str("--script")?,
        remove_default_ignorables: parser.contains("--remove-default-ignorables"),
        preserve_default_ignorables: parser.contains("--preserve-default-ignorables"),
        unsafe_to_concat: parser.contains("--unsafe-to-concat"),
        cluster_level: parser
            .opt_value_from_fn("--cluster-level", parse_cluster)?
            .unwrap_or_default(),
        features: parser
            .opt_value_from_fn("--features", parse_string_list)?
            .unwrap_or_default(),
        no_glyph_names: parser.contains("--no-glyph-names"),
        no_positions: parser.contains("--no-positions"),
        no_advances: parser.contains("--no-advances"),
        no_clusters: parser.contains("--no-clusters"),
        show_flags: parser.contains("--show-flags"),
        ned: parser.contains("--ned"),
        bot: parser.contains("--bot"),
        eot: parser.contains("--eot"),
    };

    let unused = parser.finish();
    if !unused.is_empty() {
        return Err(pico_args::Error::ArgumentParsingFailed {
            cause: format!("unused arguments: {:?}", unused),
        });
    }

    Ok(args)
}

fn parse_string_list(s: &str) -> Result<Vec<String>, String> {
    Ok(s.split(',').map(|s| s.to_string()).collect())
}

fn parse_cluster(s: &str) -> Result<rustyshaper::BufferClusterLevel, String> {
    match s {
        "0" => Ok(rustyshaper::BufferClusterLevel::MonotoneGraphemes),
        "1" => Ok(rustyshaper::BufferClusterLevel::MonotoneCharacters),
        "2" => Ok(rustyshaper::BufferClusterLevel::Characters),
        _ => Err(format!("invalid cluster level")),
    }
}

/// Shapes `text` with an in-memory font and serializes the result.
///
/// Options use the `hb-shape` command line syntax.
pub fn shape(font_data: &[u8], text: &str, options: &str) -> String {
    let args = options
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(std::ffi::OsString::from)
        .collect();
    let args = parse_args(args).unwrap();

    let mut face = rustyshaper::Face::from_slice(font_data, 0).unwrap();

    face.set_points_per_em(args.font_ptem);

    if !args.variations.is_empty() {
        let variations: Vec<_> = args
            .variations
            .iter()
            .map(|s| rustyshaper::Variation::from_str(s).unwrap())
            .collect();
        face.set_variations(&variations);
    }

    let mut buffer = rustyshaper::UnicodeBuffer::new();
    buffer.push_str(text);

    if let Some(d) = args.direction {
        buffer.set_direction(d);
    }

    if let Some(lang) = args.language {
        buffer.set_language(lang);
    }

    if let Some(script) = args.script {
        buffer.set_script(script);
    }

    let mut buffer_flags = BufferFlags::default();
    buffer_flags.set(BufferFlags::BEGINNING_OF_TEXT, args.bot);
    buffer_flags.set(BufferFlags::END_OF_TEXT, args.eot);
    buffer_flags.set(BufferFlags::PRODUCE_UNSAFE_TO_CONCAT, args.unsafe_to_concat);
    buffer_flags.set(
        BufferFlags::REMOVE_DEFAULT_IGNORABLES,
        args.remove_default_ignorables,
    );
    buffer_flags.set(
        BufferFlags::PRESERVE_DEFAULT_IGNORABLES,
        args.preserve_default_ignorables,
    );
    buffer.set_flags(buffer_flags);

    buffer.set_cluster_level(args.cluster_level);
    buffer.reset_clusters();

    let mut features = Vec::new();
    for feature_str in args.features {
        let feature = rustyshaper::Feature::from_str(&feature_str).unwrap();
        features.push(feature);
    }

    let glyph_buffer = rustyshaper::shape(&face, &features, buffer);

    let mut format_flags = rustyshaper::SerializeFlags::default();
    if args.no_glyph_names {
        format_flags |= rustyshaper::SerializeFlags::NO_GLYPH_NAMES;
    }

    if args.no_clusters || args.ned {
        format_flags |= rustyshaper::SerializeFlags::NO_CLUSTERS;
    }

    if args.no_positions {
        format_flags |= rustyshaper::SerializeFlags::NO_POSITIONS;
    }

    if args.no_advances || args.ned {
        format_flags |= rustyshaper::SerializeFlags::NO_ADVANCES;
    }

    if args.show_flags {
        format_flags |= rustyshaper::SerializeFlags::GLYPH_FLAGS;
    }

    glyph_buffer.serialize(&face, format_flags)
}
