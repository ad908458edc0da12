/*!
A complete OpenType GSUB/GPOS shaping engine, in the harfbuzz manner.

The crate turns a [`UnicodeBuffer`] of characters into a [`GlyphBuffer`] of
positioned glyphs using the layout tables of a [`Face`].
*/

#![no_std]
#![warn(missing_docs)]

#[macro_use]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod buffer;
mod common;
mod face;
mod map;
mod ot;
mod parser;
mod plan;
mod set;
mod set_digest;
mod shape;
mod tables;
mod tag;
mod unicode;

#[cfg(test)]
mod testing;

pub use ttf_parser::Tag;

pub use crate::buffer::{
    glyph_flag, BufferClusterLevel, BufferFlags, GlyphBuffer, GlyphInfo, GlyphPosition,
    SerializeFlags, UnicodeBuffer,
};
pub use crate::common::{script, Direction, Feature, Language, Script, Variation};
pub use crate::face::Face;
pub use crate::plan::ShapePlan;
pub use crate::shape::{shape, shape_with_plan};

type Mask = u32;
