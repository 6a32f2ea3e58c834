//! Line ending canonicalisation.
//!
//! Encoding turns bare `\n` into `\r\n`, decoding turns `\r\n` back into
//! `\n`. With dots enabled, a `.` at the start of a line is doubled on
//! encode and undoubled on decode, as SMTP DATA requires.

use super::{FilterBuffer, Filtered, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrlfDirection {
    Encode,
    Decode,
}

/// Converts between `\n` and `\r\n` line endings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crlf {
    direction: CrlfDirection,
    dots: bool,
    saw_cr: bool,
    saw_lf: bool,
    saw_dot: bool,
}

impl Crlf {
    pub fn new(direction: CrlfDirection, dots: bool) -> Self {
        Self {
            direction,
            dots,
            saw_cr: false,
            saw_lf: true,
            saw_dot: false,
        }
    }

    pub fn direction(&self) -> CrlfDirection {
        self.direction
    }

    pub fn dots(&self) -> bool {
        self.dots
    }

    fn encode(&mut self, input: &[u8], out: &mut [u8]) -> usize {
        let mut o = 0;
        for &c in input {
            match c {
                b'\r' => {
                    self.saw_cr = true;
                    self.saw_lf = false;
                }
                b'\n' => {
                    if !self.saw_cr {
                        out[o] = b'\r';
                        o += 1;
                    }
                    self.saw_cr = false;
                    self.saw_lf = true;
                }
                _ => {
                    if self.dots && c == b'.' && self.saw_lf {
                        out[o] = b'.';
                        o += 1;
                    }
                    self.saw_cr = false;
                    self.saw_lf = false;
                }
            }
            out[o] = c;
            o += 1;
        }
        o
    }

    fn decode(&mut self, input: &[u8], out: &mut [u8]) -> usize {
        let mut o = 0;
        for &c in input {
            if self.saw_cr {
                self.saw_cr = false;
                if c == b'\n' {
                    out[o] = b'\n';
                    o += 1;
                    self.saw_lf = true;
                    continue;
                }
                out[o] = b'\r';
                o += 1;
                self.saw_lf = false;
            }

            if self.saw_dot {
                self.saw_dot = false;
                out[o] = b'.';
                o += 1;
                if c == b'.' {
                    continue;
                }
            }

            match c {
                b'\r' => self.saw_cr = true,
                b'\n' => {
                    out[o] = b'\n';
                    o += 1;
                    self.saw_lf = true;
                }
                b'.' if self.dots && self.saw_lf => {
                    self.saw_dot = true;
                    self.saw_lf = false;
                }
                _ => {
                    out[o] = c;
                    o += 1;
                    self.saw_lf = false;
                }
            }
        }
        o
    }

    fn run<'a>(&mut self, input: &[u8], buf: &'a mut FilterBuffer, flush: bool) -> Filtered<'a> {
        let len = match self.direction {
            CrlfDirection::Encode => {
                buf.set_size(input.len() * 2, false);
                self.encode(input, buf.out_mut())
            }
            CrlfDirection::Decode => {
                buf.set_size(input.len() + 2, false);
                let out = buf.out_mut();
                let mut o = self.decode(input, out);
                if flush {
                    if self.saw_cr {
                        out[o] = b'\r';
                        o += 1;
                    }
                    if self.saw_dot {
                        out[o] = b'.';
                        o += 1;
                    }
                    self.saw_cr = false;
                    self.saw_dot = false;
                }
                o
            }
        };
        buf.output(len)
    }
}

impl Transform for Crlf {
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        _prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        self.run(input, buf, false)
    }

    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        _prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        self.run(input, buf, true)
    }

    fn reset(&mut self) {
        self.saw_cr = false;
        self.saw_lf = true;
        self.saw_dot = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter_chunks, Filter};

    fn run(direction: CrlfDirection, dots: bool, chunks: &[&[u8]]) -> Vec<u8> {
        let mut f = Filter::new(Crlf::new(direction, dots));
        filter_chunks(&mut f, chunks.iter().copied())
    }

    #[test]
    fn test_encode_bare_newlines() {
        assert_eq!(
            run(CrlfDirection::Encode, false, &[b"a\nb\r\nc\n"]),
            b"a\r\nb\r\nc\r\n"
        );
    }

    #[test]
    fn test_encode_cr_split_from_lf() {
        assert_eq!(
            run(CrlfDirection::Encode, false, &[b"a\r", b"\nb"]),
            b"a\r\nb"
        );
    }

    #[test]
    fn test_encode_dots() {
        assert_eq!(
            run(CrlfDirection::Encode, true, &[b".start\nmid.dot\n..\n"]),
            b"..start\r\nmid.dot\r\n...\r\n"
        );
        assert_eq!(
            run(CrlfDirection::Encode, false, &[b".start\n"]),
            b".start\r\n"
        );
    }

    #[test]
    fn test_decode_crlf() {
        assert_eq!(
            run(CrlfDirection::Decode, false, &[b"a\r\nb\rc\n"]),
            b"a\nb\rc\n"
        );
    }

    #[test]
    fn test_decode_cr_at_chunk_end() {
        assert_eq!(
            run(CrlfDirection::Decode, false, &[b"a\r", b"\nb\r"]),
            b"a\nb\r"
        );
    }

    #[test]
    fn test_decode_dots() {
        assert_eq!(
            run(CrlfDirection::Decode, true, &[b"..start\r\n.\r\nx.y\r\n."]),
            b".start\n.\nx.y\n."
        );
    }

    #[test]
    fn test_decode_dots_split() {
        assert_eq!(
            run(CrlfDirection::Decode, true, &[b"a\r\n.", b".b\r\n"]),
            b"a\n.b\n"
        );
    }

    #[test]
    fn test_reset_returns_to_line_start() {
        let mut f = Filter::new(Crlf::new(CrlfDirection::Encode, true));
        assert_eq!(f.filter(b"x", 0).data, b"x");
        f.reset();
        assert_eq!(f.filter(b".y", 0).data, b"..y");
    }
}
