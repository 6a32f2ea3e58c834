//! A writer that pushes everything through a chain of filters.
//!
//! Writes go through every filter in the order they were added, the output
//! of one being the input of the next, and the result lands in the inner
//! writer. `flush()` only flushes the inner writer. Bytes a filter is still
//! holding back stay there until [`FilterStream::close`] ends the stream.

use std::io::{self, Write};

use tracing::debug;

use crate::filter::{AnyFilter, Filtered};

/// Byte counters for a [`FilterStream`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamStats {
    /// Bytes handed to `write()`.
    pub bytes_in: u64,
    /// Bytes written to the inner writer.
    pub bytes_out: u64,
    /// Number of non-empty `write()` calls.
    pub chunks: u64,
}

/// Wraps a writer with an ordered chain of filters.
pub struct FilterStream<W: Write> {
    inner: W,
    filters: Vec<(usize, AnyFilter)>,
    next_id: usize,
    stats: StreamStats,
}

impl<W: Write> FilterStream<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            filters: Vec::new(),
            next_id: 0,
            stats: StreamStats::default(),
        }
    }

    /// Append a filter to the end of the chain. Returns an id for [`remove`](Self::remove).
    pub fn add(&mut self, filter: AnyFilter) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.filters.push((id, filter));
        id
    }

    /// Take a filter out of the chain. Returns `false` for an unknown id.
    pub fn remove(&mut self, id: usize) -> bool {
        match self.filters.iter().position(|(fid, _)| *fid == id) {
            Some(idx) => {
                self.filters.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Number of filters in the chain.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Reset every filter so a new stream can be written.
    pub fn reset(&mut self) {
        for (_, filter) in &mut self.filters {
            filter.reset();
        }
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// End the current stream.
    ///
    /// Every filter is completed on an empty chunk, the result is written
    /// and the inner writer flushed. The chain is then reset, so the next
    /// write starts a new stream.
    pub fn close(&mut self) -> io::Result<()> {
        self.push(&[], true)?;
        debug!(
            bytes_in = self.stats.bytes_in,
            bytes_out = self.stats.bytes_out,
            filters = self.filters.len(),
            "completed filter chain"
        );
        self.reset();
        self.inner.flush()
    }

    /// Close the stream and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.close()?;
        Ok(self.inner)
    }

    fn push(&mut self, input: &[u8], end: bool) -> io::Result<()> {
        let out = run_chain(&mut self.filters, input, 0, end);
        if !out.is_empty() {
            self.inner.write_all(out.data)?;
            self.stats.bytes_out += out.len() as u64;
        }
        Ok(())
    }
}

fn run_chain<'a>(
    filters: &'a mut [(usize, AnyFilter)],
    data: &'a [u8],
    prespace: usize,
    end: bool,
) -> Filtered<'a> {
    match filters.split_first_mut() {
        None => Filtered::borrowed(data, prespace),
        Some(((_, first), rest)) => {
            let out = if end {
                first.complete(data, prespace)
            } else {
                first.filter(data, prespace)
            };
            run_chain(rest, out.data, out.prespace, end)
        }
    }
}

impl<W: Write> Write for FilterStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.push(buf, false)?;
        self.stats.bytes_in += buf.len() as u64;
        self.stats.chunks += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;

    fn spec(s: &str) -> AnyFilter {
        s.parse::<FilterSpec>().unwrap().build()
    }

    #[test]
    fn test_empty_chain_is_passthrough() {
        let mut stream = FilterStream::new(Vec::new());
        stream.write_all(b"From x\n").unwrap();
        assert_eq!(stream.finish().unwrap(), b"From x\n");
    }

    #[test]
    fn test_chain_applies_in_order() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("strip-header:X-Secret"));
        stream.add(spec("from"));
        stream.add(spec("crlf-encode"));
        stream.write_all(b"Subject: hi\nX-Secret: 42\n\nFrom ").unwrap();
        stream.write_all(b"me\nbye\n").unwrap();
        let out = stream.finish().unwrap();
        assert_eq!(out, b"Subject: hi\r\n\r\n>From me\r\nbye\r\n");
    }

    #[test]
    fn test_close_completes_backlog() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("chomp"));
        stream.write_all(b"text   ").unwrap();
        assert_eq!(stream.get_ref(), b"text");
        stream.write_all(b" \n").unwrap();
        stream.close().unwrap();
        assert_eq!(stream.get_ref(), b"text\n");
    }

    #[test]
    fn test_flush_keeps_backlog() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("chomp"));
        stream.write_all(b"a ").unwrap();
        stream.flush().unwrap();
        assert_eq!(stream.get_ref(), b"a");
        stream.write_all(b"b").unwrap();
        assert_eq!(stream.finish().unwrap(), b"a b");
    }

    #[test]
    fn test_flush_mid_header_still_strips() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("strip-header:B"));
        stream.write_all(b"A: 1\nB").unwrap();
        stream.flush().unwrap();
        stream.write_all(b": 2\n\nbody").unwrap();
        assert_eq!(stream.finish().unwrap(), b"A: 1\n\nbody");
    }

    #[test]
    fn test_close_starts_new_stream() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("strip-header:Bcc"));
        stream.write_all(b"Bcc: x\n\nBcc: body\n").unwrap();
        stream.close().unwrap();
        stream.write_all(b"Bcc: y\nTo: z\n\n").unwrap();
        assert_eq!(stream.finish().unwrap(), b"\nBcc: body\nTo: z\n\n");
    }

    #[test]
    fn test_remove_filter() {
        let mut stream = FilterStream::new(Vec::new());
        let from = stream.add(spec("from"));
        assert_eq!(stream.len(), 1);
        assert!(stream.remove(from));
        assert!(!stream.remove(from));
        assert!(stream.is_empty());
        stream.write_all(b"From x\n").unwrap();
        assert_eq!(stream.finish().unwrap(), b"From x\n");
    }

    #[test]
    fn test_stats_count_bytes() {
        let mut stream = FilterStream::new(Vec::new());
        stream.add(spec("from"));
        stream.write_all(b"From a\n").unwrap();
        stream.write_all(b"From b\n").unwrap();
        stream.close().unwrap();
        let stats = stream.stats();
        assert_eq!(stats.bytes_in, 14);
        assert_eq!(stats.bytes_out, 16);
        assert_eq!(stats.chunks, 2);
    }
}
