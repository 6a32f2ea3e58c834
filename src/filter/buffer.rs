//! Growable output buffer and backup (carry-over) storage shared by every filter.
//!
//! ```text
//! real
//! v          outbuf
//! [ prespace v                                ]
//! <---------->                                  OUT_PRESPACE
//!            <-------------------------------->  size (set_size)
//!            <----------------->                 output(len)
//! ```
//!
//! The output region is only valid until the next `filter()`/`complete()`
//! call on the owning filter. Allocation failure aborts, as with any `Vec`.

use tracing::trace;

/// Leading room reserved when input has to be staged behind a backlog.
pub const PRE_HEAD: usize = 64;

/// Leading room reserved in front of the output region.
pub const OUT_PRESPACE: usize = PRE_HEAD * 4;

/// Extra room allocated with every backlog growth.
const BACK_HEAD: usize = 64;

/// The result of one `filter()` or `complete()` call.
///
/// `data` either borrows the caller's input (pass-through) or the filter's
/// own output buffer. `prespace` is the reserved leading room of whichever
/// buffer backs `data`; it is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filtered<'a> {
    pub data: &'a [u8],
    pub prespace: usize,
}

impl<'a> Filtered<'a> {
    /// Pass a slice of the input through untouched.
    pub fn borrowed(data: &'a [u8], prespace: usize) -> Self {
        Self { data, prespace }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Output and backlog storage owned by one filter instance.
#[derive(Debug)]
pub struct FilterBuffer {
    real: Vec<u8>,
    size: usize,
    back: Vec<u8>,
}

impl Default for FilterBuffer {
    fn default() -> Self {
        Self {
            real: vec![0; OUT_PRESPACE],
            size: 0,
            back: Vec::new(),
        }
    }
}

impl FilterBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the output region holds at least `size` bytes.
    ///
    /// Never shrinks. When `keep` is set the current contents survive the
    /// reallocation, otherwise the region starts out zeroed.
    pub fn set_size(&mut self, size: usize, keep: bool) {
        if self.size >= size {
            return;
        }
        if keep {
            self.real.resize(OUT_PRESPACE + size, 0);
        } else {
            self.real = vec![0; OUT_PRESPACE + size];
        }
        trace!(size, keep, "grew filter output buffer");
        self.size = size;
    }

    /// Current size of the output region.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Writable view of the output region, `size()` bytes long.
    pub fn out_mut(&mut self) -> &mut [u8] {
        let end = OUT_PRESPACE + self.size;
        &mut self.real[OUT_PRESPACE..end]
    }

    /// The first `len` bytes of the output region as a call result.
    pub fn output(&self, len: usize) -> Filtered<'_> {
        Filtered {
            data: &self.real[OUT_PRESPACE..OUT_PRESPACE + len],
            prespace: OUT_PRESPACE,
        }
    }

    /// Hold `data` back so it is presented again in front of the next input.
    ///
    /// Replaces any previous backlog; the filter machinery has already
    /// prepended that one to the current input.
    pub fn backup(&mut self, data: &[u8]) {
        if self.back.capacity() < data.len() {
            self.back = Vec::with_capacity(data.len() + BACK_HEAD);
        }
        self.back.clear();
        self.back.extend_from_slice(data);
        trace!(len = data.len(), "backed up unconsumed input");
    }

    /// Bytes currently held back for the next call.
    pub fn backlog(&self) -> &[u8] {
        &self.back
    }

    pub fn clear_backlog(&mut self) {
        self.back.clear();
    }
}
