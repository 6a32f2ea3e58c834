//! Trailing-whitespace chomping.
//!
//! Interior whitespace is copied through. A whitespace run that reaches the
//! end of a chunk is held back, since only later input can tell whether it
//! is interior or trailing. At end-of-stream the trailing run is dropped,
//! except for one line terminator (`\r\n` or `\n`) if the run ends with one.

use super::{FilterBuffer, Filtered, Transform};

/// Strips trailing whitespace from a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chomp;

impl Chomp {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn is_chomp_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

/// Length of `input` without its trailing whitespace run.
fn content_len(input: &[u8]) -> usize {
    input
        .iter()
        .rposition(|&c| !is_chomp_space(c))
        .map_or(0, |i| i + 1)
}

impl Transform for Chomp {
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        let keep = content_len(input);
        if keep < input.len() {
            buf.backup(&input[keep..]);
        }
        Filtered::borrowed(&input[..keep], prespace)
    }

    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        let keep = content_len(input);
        let trailing = &input[keep..];
        let eol: &[u8] = if trailing.ends_with(b"\r\n") {
            b"\r\n"
        } else if trailing.ends_with(b"\n") {
            b"\n"
        } else {
            b""
        };

        if trailing.starts_with(eol) {
            return Filtered::borrowed(&input[..keep + eol.len()], prespace);
        }

        // Padding sits between the content and the terminator; rebuild.
        let len = keep + eol.len();
        buf.set_size(len, false);
        let out = buf.out_mut();
        out[..keep].copy_from_slice(&input[..keep]);
        out[keep..len].copy_from_slice(eol);
        buf.output(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_chunks, Filter};

    fn chomp(chunks: &[&[u8]]) -> Vec<u8> {
        let mut f = Filter::new(Chomp::new());
        filter_chunks(&mut f, chunks.iter().copied())
    }

    #[test]
    fn test_trailing_spaces_dropped_interior_kept() {
        assert_eq!(chomp(&[b"a  \n  b   "]), b"a  \n  b");
    }

    #[test]
    fn test_lone_trailing_newline_kept() {
        assert_eq!(chomp(&[b"x\n"]), b"x\n");
        assert_eq!(chomp(&[b"x\r\n"]), b"x\r\n");
    }

    #[test]
    fn test_padding_before_newline_dropped() {
        assert_eq!(chomp(&[b"x  \t\n"]), b"x\n");
        assert_eq!(chomp(&[b"x \r\n"]), b"x\r\n");
        assert_eq!(chomp(&[b"x\n\n\n"]), b"x\n");
    }

    #[test]
    fn test_all_whitespace_is_dropped() {
        assert_eq!(chomp(&[b"   "]), b"");
        assert_eq!(chomp(&[b""]), b"");
        assert_eq!(chomp(&[]), b"");
    }

    #[test]
    fn test_whitespace_chunk_is_backed_up() {
        let mut f = Filter::new(Chomp::new());
        assert_eq!(f.filter(b"a", 0).data, b"a");
        assert!(f.filter(b"   ", 0).is_empty());
        assert_eq!(f.backlog(), b"   ");
        assert!(f.filter(b"\t", 0).is_empty());
        assert_eq!(f.backlog(), b"   \t");
        assert_eq!(f.filter(b"b", 0).data, b"   \tb");
        assert!(f.complete(b"", 0).is_empty());
    }

    #[test]
    fn test_interior_run_split_across_chunks() {
        assert_eq!(chomp(&[b"a ", b" ", b"\nb  ", b" "]), b"a  \nb");
    }
}
