//! Physical-line scanning with quote-parity row detection.
//!
//! A logical CSV row may span several physical lines when a quoted field
//! embeds a newline. Rather than parse the full CSV grammar, rows are
//! delimited by tracking the parity of `"` characters: a physical line ends a
//! logical row when the running quote count is even after it and the line
//! carries its terminator.

use std::io::{self, BufRead};

/// The only quote character recognized by the parity rule.
pub const QUOTE: u8 = b'"';

/// Running quote-parity state across physical lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QuoteParity {
    in_quote: bool,
}

impl QuoteParity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one physical line (terminator included, if any).
    ///
    /// Returns `true` when this line completes a logical row. A line without a
    /// trailing `\n` never completes a row, even with balanced quotes.
    pub fn feed(&mut self, line: &[u8]) -> bool {
        if count_quotes(line) % 2 == 1 {
            self.in_quote = !self.in_quote;
        }
        !self.in_quote && line.last() == Some(&b'\n')
    }

    /// Whether the scanner is currently inside an open quoted field.
    pub fn in_quote(&self) -> bool {
        self.in_quote
    }
}

/// Number of quote characters in `line`.
pub fn count_quotes(line: &[u8]) -> usize {
    line.iter().filter(|&&b| b == QUOTE).count()
}

/// Read the next physical line into `buf`, replacing its previous contents.
///
/// Returns the number of bytes read; `0` means end of input.
pub fn next_line<R: BufRead + ?Sized>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<usize> {
    buf.clear();
    reader.read_until(b'\n', buf)
}
