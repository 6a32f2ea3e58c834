//! Streaming text filters for MIME parts.
//!
//! Filters take a MIME body in arbitrarily sized chunks and transform it in
//! a single pass, carrying unfinished input over to the next chunk. The
//! crate also provides the tagged argument vectors used by generic
//! property get/set calls, and the object state file format they persist to.

pub mod arg;
pub mod config;
pub mod error;
pub mod filter;
pub mod stream;
