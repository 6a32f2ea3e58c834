//! Streaming byte filters with carry-over state.
//!
//! A filter is fed successive chunks of a stream through [`Filter::filter`],
//! then exactly one [`Filter::complete`] at end-of-stream. Chunk boundaries
//! are arbitrary; a transform that cannot decide what to do with the tail of
//! a chunk backs it up with [`FilterBuffer::backup`], and [`Filter`] hands it
//! back in front of the next chunk. The caller never sees the backlog.
//!
//! The returned bytes live in the filter (or in the caller's input) and are
//! only valid until the next call on the same filter.

pub mod buffer;
pub mod chomp;
pub mod crlf;
pub mod from;
pub mod spec;
pub mod strip_header;

pub use buffer::{FilterBuffer, Filtered, OUT_PRESPACE, PRE_HEAD};
pub use chomp::Chomp;
pub use crlf::{Crlf, CrlfDirection};
pub use from::FromEscape;
pub use spec::FilterSpec;
pub use strip_header::StripHeader;

/// The per-filter part of the filter contract.
///
/// Implementations see the backlog already prepended to `input`, and may
/// write into `buf` or return a slice of `input` unchanged. They must not
/// keep `input` past the call.
pub trait Transform {
    /// Transform as much of `input` as can be decided now.
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a>;

    /// Like `filter`, but at end-of-stream: nothing may be backed up.
    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a>;

    /// Forget all per-stream state.
    fn reset(&mut self) {}
}

/// A transform plus the output/backlog machinery around it.
#[derive(Debug)]
pub struct Filter<T> {
    transform: T,
    buffer: FilterBuffer,
    staging: Vec<u8>,
}

/// A filter over any of the built-in transforms.
pub type AnyFilter = Filter<FilterKind>;

impl<T: Transform> Filter<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            buffer: FilterBuffer::new(),
            staging: vec![0; PRE_HEAD],
        }
    }

    /// Feed the next chunk of the stream.
    pub fn filter<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Filtered<'a> {
        self.run(input, prespace, false)
    }

    /// Feed the last chunk (possibly empty) and resolve everything deferred.
    pub fn complete<'a>(&'a mut self, input: &'a [u8], prespace: usize) -> Filtered<'a> {
        self.run(input, prespace, true)
    }

    /// Drop the backlog and the transform state so a new stream can start.
    pub fn reset(&mut self) {
        self.transform.reset();
        self.buffer.clear_backlog();
    }

    /// Bytes currently held back for the next call.
    pub fn backlog(&self) -> &[u8] {
        self.buffer.backlog()
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    fn run<'a>(&'a mut self, input: &'a [u8], prespace: usize, end: bool) -> Filtered<'a> {
        let Self {
            transform,
            buffer,
            staging,
        } = self;

        let (data, prespace) = if buffer.backlog().is_empty() {
            (input, prespace)
        } else {
            staging.truncate(PRE_HEAD);
            staging.extend_from_slice(buffer.backlog());
            staging.extend_from_slice(input);
            buffer.clear_backlog();
            let staged: &'a Vec<u8> = staging;
            (&staged[PRE_HEAD..], PRE_HEAD)
        };

        if end {
            transform.complete(data, prespace, buffer)
        } else {
            transform.filter(data, prespace, buffer)
        }
    }
}

impl<T: Transform + Default> Default for Filter<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// The closed set of built-in transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKind {
    Chomp(Chomp),
    From(FromEscape),
    StripHeader(StripHeader),
    Crlf(Crlf),
}

impl Transform for FilterKind {
    fn filter<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        match self {
            Self::Chomp(t) => t.filter(input, prespace, buf),
            Self::From(t) => t.filter(input, prespace, buf),
            Self::StripHeader(t) => t.filter(input, prespace, buf),
            Self::Crlf(t) => t.filter(input, prespace, buf),
        }
    }

    fn complete<'a>(
        &mut self,
        input: &'a [u8],
        prespace: usize,
        buf: &'a mut FilterBuffer,
    ) -> Filtered<'a> {
        match self {
            Self::Chomp(t) => t.complete(input, prespace, buf),
            Self::From(t) => t.complete(input, prespace, buf),
            Self::StripHeader(t) => t.complete(input, prespace, buf),
            Self::Crlf(t) => t.complete(input, prespace, buf),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Chomp(t) => t.reset(),
            Self::From(t) => t.reset(),
            Self::StripHeader(t) => t.reset(),
            Self::Crlf(t) => t.reset(),
        }
    }
}

impl From<Chomp> for FilterKind {
    fn from(t: Chomp) -> Self {
        Self::Chomp(t)
    }
}

impl From<FromEscape> for FilterKind {
    fn from(t: FromEscape) -> Self {
        Self::From(t)
    }
}

impl From<StripHeader> for FilterKind {
    fn from(t: StripHeader) -> Self {
        Self::StripHeader(t)
    }
}

impl From<Crlf> for FilterKind {
    fn from(t: Crlf) -> Self {
        Self::Crlf(t)
    }
}

/// Feed `chunks` through `filter` in order, then complete on an empty chunk.
///
/// Returns everything the filter produced, concatenated.
pub fn filter_chunks<T, I>(filter: &mut Filter<T>, chunks: I) -> Vec<u8>
where
    T: Transform,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend_from_slice(filter.filter(chunk.as_ref(), 0).data);
    }
    out.extend_from_slice(filter.complete(&[], 0).data);
    out
}
