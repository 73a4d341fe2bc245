//! SVG rendering of pipeline layers.

mod proj;
mod writer;

pub(crate) use proj::*;
pub(crate) use writer::*;
