//! SVG writing operations.

use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

/// Buffered SVG writer over any sink.
pub(crate) struct SvgWriter<W: Write> {
    writer: BufWriter<W>,
}

/// Implement std::io::Write so `write!` / `writeln!` work.
impl<W: Write> Write for SvgWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.writer.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.writer.flush() }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> { self.writer.write_all(buf) }
}

impl<W: Write> SvgWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { writer: BufWriter::new(inner) }
    }

    /// Write the XML declaration and opening <svg> tag.
    /// The data bounds are recorded as attributes so the map can be georeferenced later.
    pub(crate) fn write_header(&mut self, width: f64, height: f64, margin: f64, scale: f64, bounds: &geo::Rect) -> Result<()> {
        writeln!(self, r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##)?;
        writeln!(self, r##"<svg xmlns="http://www.w3.org/2000/svg"
        width="{width:.0}" height="{height:.0}"
        viewBox="0 0 {width:.3} {height:.3}"
        data-x-min="{x_min}" data-x-max="{x_max}"
        data-y-min="{y_min}" data-y-max="{y_max}"
        data-margin="{margin}" data-scale="{scale}">"##,
            x_min = bounds.min().x,
            x_max = bounds.max().x,
            y_min = bounds.min().y,
            y_max = bounds.max().y,
        )?;
        writeln!(self, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
        Ok(())
    }

    /// Write styles for each drawn layer.
    pub(crate) fn write_styles(&mut self) -> Result<()> {
        writeln!(self, r##"<defs>
<style>
    .border {{ fill: #f3f4f6; stroke: #111827; stroke-width: 1.2; }}
    .cell {{ fill: none; stroke: #9ca3af; stroke-width: 0.4; }}
    .sector {{ fill: #2563eb; fill-opacity: 0.15; stroke: #1d4ed8; stroke-width: 0.3; }}
    .hit {{ fill: #dc2626; }}
    path, circle {{ vector-effect: non-scaling-stroke; }}
</style>
</defs>"##)?;
        Ok(())
    }

    /// Open a named group for one layer.
    pub(crate) fn begin_group(&mut self, id: &str) -> Result<()> {
        writeln!(self, r#"<g id="{id}">"#)?;
        Ok(())
    }

    pub(crate) fn end_group(&mut self) -> Result<()> {
        writeln!(self, "</g>")?;
        Ok(())
    }

    /// Write the closing </svg> tag and hand back the sink.
    pub(crate) fn finish(mut self) -> Result<W> {
        writeln!(self, "</svg>")?;
        self.writer.into_inner()
            .map_err(|e| e.into_error())
            .context("[io::svg] Failed to flush SVG output")
    }
}
