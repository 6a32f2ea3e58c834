//! mbox "From " escaping.
//!
//! Every line that starts with `From ` gets a `>` in front of it, so the
//! line can no longer be mistaken for an mbox message separator. The
//! filter remembers across chunks whether it stopped in the middle of a
//! line. A line start with fewer than five bytes left in the chunk that
//! begins with `F` is backed up until the next chunk settles it.

use memchr::memchr;

use super::{FilterBuffer, Filtered, Transform};

const FROM: &[u8] = b"From ";

/// Escapes `From ` at the start of lines with `>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromEscape {
    midline: bool,
}

impl FromEscape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last chunk ended before a newline.
    pub fn midline(&self) -> bool {
        self.midline
    }
}

impl Transform for FromEscape {
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        let mut midline = self.midline;
        let mut end = input.len();
        let mut pos = 0;
        // Offsets of every `From ` to escape, in ascending order.
        let mut matches: Vec<usize> = Vec::new();

        while pos < end {
            if midline {
                match memchr(b'\n', &input[pos..end]) {
                    Some(i) => pos += i + 1,
                    None => break,
                }
            }

            let left = end - pos;
            if left == 0 {
                // Newline was the last byte; the next chunk starts a line.
                midline = false;
                break;
            }

            midline = true;
            if left < FROM.len() {
                if input[pos] == b'F' {
                    buf.backup(&input[pos..]);
                    midline = false;
                    end = pos;
                    break;
                }
            } else if input[pos..].starts_with(FROM) {
                matches.push(pos);
                pos += FROM.len();
            }
        }

        self.midline = midline;

        if matches.is_empty() {
            return Filtered::borrowed(&input[..end], prespace);
        }

        let len = end + matches.len();
        buf.set_size(len, false);
        let out = buf.out_mut();
        let mut start = 0;
        let mut o = 0;
        for &at in &matches {
            let segment = &input[start..at];
            out[o..o + segment.len()].copy_from_slice(segment);
            o += segment.len();
            out[o] = b'>';
            o += 1;
            start = at;
        }
        let tail = &input[start..end];
        out[o..o + tail.len()].copy_from_slice(tail);
        o += tail.len();

        buf.output(o)
    }

    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        _buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        Filtered::borrowed(input, prespace)
    }

    fn reset(&mut self) {
        self.midline = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_chunks, Filter};

    fn escape(chunks: &[&[u8]]) -> Vec<u8> {
        let mut f = Filter::new(FromEscape::new());
        filter_chunks(&mut f, chunks.iter().copied())
    }

    #[test]
    fn test_escapes_every_from_line() {
        assert_eq!(
            escape(&[b"From you\nhi\nFrom me\n"]),
            b">From you\nhi\n>From me\n"
        );
    }

    #[test]
    fn test_midline_from_untouched() {
        assert_eq!(escape(&[b"xFrom foo\n"]), b"xFrom foo\n");
        assert_eq!(escape(&[b"say From me\n"]), b"say From me\n");
        assert_eq!(escape(&[b"from lower\n"]), b"from lower\n");
        assert_eq!(escape(&[b"Fromage\n"]), b"Fromage\n");
    }

    #[test]
    fn test_no_match_passes_input_through() {
        let mut f = Filter::new(FromEscape::new());
        let input = b"plain text\n";
        let out = f.filter(input, 7);
        assert_eq!(out.data.as_ptr(), input.as_ptr());
        assert_eq!(out.prespace, 7);
    }

    #[test]
    fn test_split_prefix_is_deferred() {
        let mut f = Filter::new(FromEscape::new());
        assert_eq!(f.filter(b"a\nFro", 0).data, b"a\n");
        assert_eq!(f.backlog(), b"Fro");
        assert!(!f.transform().midline());
        assert_eq!(f.filter(b"m x\n", 0).data, b">From x\n");
    }

    #[test]
    fn test_midline_carries_across_chunks() {
        assert_eq!(escape(&[b"abc", b"From x\n", b"From y\n"]), b"abcFrom x\n>From y\n");
    }

    #[test]
    fn test_chunk_ending_on_newline() {
        assert_eq!(escape(&[b"abc\n", b"From x\n"]), b"abc\n>From x\n");
    }

    #[test]
    fn test_short_tail_without_f_is_not_backed_up() {
        let mut f = Filter::new(FromEscape::new());
        assert_eq!(f.filter(b"a\nxy", 0).data, b"a\nxy");
        assert!(f.backlog().is_empty());
        assert!(f.transform().midline());
    }

    #[test]
    fn test_complete_releases_backlog_unescaped() {
        assert_eq!(escape(&[b"a\nFrom"]), b"a\nFrom");
    }

    #[test]
    fn test_reset_clears_midline() {
        let mut f = Filter::new(FromEscape::new());
        f.filter(b"no newline", 0);
        assert!(f.transform().midline());
        f.reset();
        assert!(!f.transform().midline());
        assert_eq!(f.filter(b"From x\n", 0).data, b">From x\n");
    }

    #[test]
    fn test_every_split_of_known_match() {
        let input: &[u8] = b"hi\nFrom x\nok\n";
        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            assert_eq!(
                escape(&[a, b]),
                b"hi\n>From x\nok\n",
                "split at {split}"
            );
        }
    }
}
