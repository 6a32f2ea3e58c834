//! Removal of one named header from a message header block.
//!
//! Every occurrence of `Name:` (exact, case-sensitive) is dropped together
//! with its folded continuation lines. Once the blank line ending the
//! header block has been seen the filter passes everything through.
//!
//! Decisions are made at line starts and need `Name:` plus one byte of
//! lookahead, so a newline with too little input after it is backed up.
//! A stream that never reaches a blank line keeps being treated as headers.

use super::{FilterBuffer, Filtered, Transform};

/// Strips every instance of one header until the end of the header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripHeader {
    header: Vec<u8>,
    seen_eoh: bool,
    in_header: bool,
    line_start: bool,
}

impl StripHeader {
    /// `name` is matched byte-for-byte, without the colon.
    pub fn new(name: &str) -> Self {
        Self {
            header: name.as_bytes().to_vec(),
            seen_eoh: false,
            in_header: false,
            line_start: true,
        }
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Whether the blank line ending the headers has gone by.
    pub fn seen_eoh(&self) -> bool {
        self.seen_eoh
    }

    /// Whether the filter is currently inside the stripped header.
    pub fn in_header(&self) -> bool {
        self.in_header
    }

    fn is_target(&self, line: &[u8]) -> bool {
        line.len() > self.header.len()
            && line.starts_with(&self.header)
            && line[self.header.len()] == b':'
    }

    fn scan<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
        flush: bool,
    ) -> Filtered<'a> {
        if self.seen_eoh {
            return Filtered::borrowed(input, prespace);
        }

        let len = input.len();
        let hlen = self.header.len();
        let mut backup_at = None;
        let mut pos = 0;
        let mut o = 0;

        buf.set_size(len, false);
        let out = buf.out_mut();

        'scan: {
            if self.line_start {
                // The stream start behaves like a line start without its newline.
                if len < hlen + 2 && !flush {
                    backup_at = Some(0);
                    break 'scan;
                }
                self.line_start = false;
                if input.first() == Some(&b'\n') {
                    self.seen_eoh = true;
                    out[..len].copy_from_slice(input);
                    o = len;
                    break 'scan;
                }
                if self.is_target(input) {
                    self.in_header = true;
                }
            }

            while pos < len {
                let c = input[pos];
                if c != b'\n' {
                    if !self.in_header {
                        out[o] = c;
                        o += 1;
                    }
                    pos += 1;
                    continue;
                }

                if len - pos < hlen + 3 && !flush {
                    backup_at = Some(pos);
                    break;
                }

                if input.get(pos + 1) == Some(&b'\n') {
                    self.seen_eoh = true;
                    if self.in_header {
                        // The stripped header's own terminator.
                        pos += 1;
                        self.in_header = false;
                    }
                    let rest = &input[pos..];
                    out[o..o + rest.len()].copy_from_slice(rest);
                    o += rest.len();
                    break;
                }

                if !self.in_header {
                    out[o] = b'\n';
                    o += 1;
                }
                pos += 1;

                let line = &input[pos..];
                if self.is_target(line) {
                    self.in_header = true;
                } else if !matches!(line.first(), Some(b' ') | Some(b'\t')) {
                    self.in_header = false;
                }
            }
        }

        if let Some(at) = backup_at {
            buf.backup(&input[at..]);
        }
        buf.output(o)
    }
}

impl Transform for StripHeader {
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        self.scan(input, prespace, buf, false)
    }

    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        self.scan(input, prespace, buf, true)
    }

    fn reset(&mut self) {
        self.seen_eoh = false;
        self.in_header = false;
        self.line_start = true;
    }
}
