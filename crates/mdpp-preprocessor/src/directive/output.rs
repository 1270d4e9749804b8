//! Output splicing.
//!
//! The [`Splicer`] walks a cursor forward through the source, copying
//! untouched spans verbatim and interleaving generated text written through
//! its [`io::Write`] implementation.

use std::io;

/// Copies source spans and generated text to an in-memory sink.
#[derive(Debug)]
pub(crate) struct Splicer<'a> {
    source: &'a str,
    /// Next source offset not yet copied.
    cursor: usize,
    sink: Vec<u8>,
}

impl<'a> Splicer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            sink: Vec::with_capacity(source.len()),
        }
    }

    /// Copy `source[cursor..stop]` and move the cursor to `stop`.
    pub(crate) fn copy_up_to(&mut self, stop: usize) {
        if stop > self.cursor {
            self.sink
                .extend_from_slice(&self.source.as_bytes()[self.cursor..stop]);
            self.cursor = stop;
        }
    }

    /// Copy `source[cursor..start - trim]` and move the cursor to `stop`.
    ///
    /// `trim` leaves the leading indentation of the line at `start` uncopied
    /// so the caller can supply it again for every generated line.
    pub(crate) fn copy_up_to_start(&mut self, start: usize, trim: usize, stop: usize) {
        self.copy_up_to(start.saturating_sub(trim));
        self.skip_to(stop);
    }

    /// Move the cursor to `offset` without copying, discarding the span.
    pub(crate) fn skip_to(&mut self, offset: usize) {
        self.cursor = self.cursor.max(offset);
    }

    /// Flush the rest of the source and return the output.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.copy_up_to(self.source.len());
        self.sink
    }
}

impl io::Write for Splicer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Offset of the first byte of the line containing `offset`.
pub(crate) fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

/// Offset just past the newline ending the line that contains `offset`.
pub(crate) fn line_end(source: &str, offset: usize) -> usize {
    source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i + 1)
}

/// End of a block span, extended to cover its final newline.
pub(crate) fn block_end(source: &str, end: usize) -> usize {
    if end == 0 || source.as_bytes()[end - 1] == b'\n' {
        end
    } else {
        line_end(source, end)
    }
}

/// Skip spaces and tabs starting at `offset`.
pub(crate) fn skip_blanks(source: &str, offset: usize) -> usize {
    offset
        + source[offset..]
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count()
}

/// Indentation to repeat on generated lines placed at `offset`.
///
/// Spaces, tabs and block quote markers before `offset` are kept; any
/// other character (such as a list bullet) becomes a space.
pub(crate) fn line_prefix(source: &str, offset: usize) -> String {
    source[line_start(source, offset)..offset]
        .chars()
        .map(|c| if matches!(c, ' ' | '\t' | '>') { c } else { ' ' })
        .collect()
}
