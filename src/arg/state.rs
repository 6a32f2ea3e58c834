//! Object state files.
//!
//! Layout, all integers in the variable-length encoding below:
//!
//! ```text
//! "CLMD" version meta_count { key value }* prop_count { tag value }*
//! ```
//!
//! Integers are written in 7-bit groups, most significant group first, and
//! the final group carries the `0x80` flag. Strings are written as their
//! length plus one followed by the bytes; a length of zero means no string.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use super::{ArgType, ArgValue, PropertyMap, Tag};
use crate::error::{FilterError, Result};

pub const STATE_MAGIC: &[u8; 4] = b"CLMD";
pub const STATE_VERSION: u32 = 1;

/// Longest string accepted in a state file.
const MAX_STRING: usize = 65536;

/// Persisted metadata and properties of an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectState {
    pub meta: Vec<(String, String)>,
    pub props: Vec<(Tag, ArgValue)>,
}

impl ObjectState {
    /// Snapshot the persistable properties of a map.
    ///
    /// Fails on the first property whose type has no on-disk form.
    pub fn from_map(map: &PropertyMap) -> Result<Self> {
        let props = map
            .iter()
            .map(|(tag, value)| -> Result<(Tag, ArgValue)> {
                check_persistable(tag)?;
                Ok((tag, value.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            meta: Vec::new(),
            props,
        })
    }

    /// Copy every property into `map`, replacing existing values.
    pub fn apply_to(&self, map: &mut PropertyMap) {
        for (tag, value) in &self.props {
            map.insert(*tag, value.clone());
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(STATE_MAGIC)?;
        encode_uint32(w, STATE_VERSION)?;

        encode_uint32(w, count(self.meta.len())?)?;
        for (key, value) in &self.meta {
            encode_string(w, Some(key))?;
            encode_string(w, Some(value))?;
        }

        encode_uint32(w, count(self.props.len())?)?;
        for (tag, value) in &self.props {
            check_persistable(*tag)?;
            encode_uint32(w, tag.raw())?;
            match value {
                ArgValue::Int(v) => encode_uint32(w, *v as u32)?,
                ArgValue::Bool(v) => encode_uint32(w, u32::from(*v))?,
                ArgValue::Str(v) => encode_string(w, v.as_deref())?,
                _ => return Err(FilterError::UnsupportedStateArg(*tag)),
            }
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_exact(r, &mut magic)?;
        if &magic != STATE_MAGIC {
            return Err(FilterError::invalid_state("bad magic"));
        }
        let version = decode_uint32(r)?;
        if version != STATE_VERSION {
            return Err(FilterError::invalid_state(format!(
                "unsupported version {version}"
            )));
        }

        let meta_count = decode_uint32(r)?;
        let mut meta = Vec::new();
        for _ in 0..meta_count {
            let key = decode_string(r)?.unwrap_or_default();
            let value = decode_string(r)?.unwrap_or_default();
            meta.push((key, value));
        }

        let prop_count = decode_uint32(r)?;
        let mut props = Vec::new();
        for _ in 0..prop_count {
            let tag = Tag::from_raw(decode_uint32(r)?);
            let value = match tag.arg_type() {
                Some(ArgType::Int) => ArgValue::Int(decode_uint32(r)? as i32),
                Some(ArgType::Bool) => ArgValue::Bool(decode_uint32(r)? != 0),
                Some(ArgType::Str) => ArgValue::Str(decode_string(r)?),
                _ => {
                    warn!(%tag, "unreadable property type in state file");
                    return Err(FilterError::invalid_state(format!(
                        "property {tag} has no stored form"
                    )));
                }
            };
            props.push((tag, value));
        }
        Ok(Self { meta, props })
    }

    /// Read a state file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FilterError::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| FilterError::io(path, e))?;
        let state = Self::read_from(&mut BufReader::new(file))?;
        debug!(
            path = %path.display(),
            meta = state.meta.len(),
            props = state.props.len(),
            "loaded object state"
        );
        Ok(state)
    }

    /// Write a state file, replacing any previous one.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| FilterError::io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| FilterError::io(path, e))?;
        let mut w = BufWriter::new(file);
        self.write_to(&mut w)?;
        w.flush().map_err(|e| FilterError::io(path, e))?;
        debug!(path = %path.display(), props = self.props.len(), "saved object state");
        Ok(())
    }
}

fn check_persistable(tag: Tag) -> Result<()> {
    match tag.arg_type() {
        Some(ArgType::Int | ArgType::Bool | ArgType::Str) => Ok(()),
        _ => Err(FilterError::UnsupportedStateArg(tag)),
    }
}

fn count(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| FilterError::invalid_state("too many entries"))
}

fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => FilterError::invalid_state("truncated state"),
        _ => FilterError::from(e),
    })
}

/// Write `value` in the variable-length integer encoding.
pub fn encode_uint32<W: Write>(w: &mut W, value: u32) -> Result<()> {
    let mut buf = [0u8; 5];
    let mut len = 0;
    for shift in [28, 21, 14, 7] {
        if value >= 1 << shift {
            buf[len] = ((value >> shift) & 0x7f) as u8;
            len += 1;
        }
    }
    buf[len] = (value & 0x7f) as u8 | 0x80;
    w.write_all(&buf[..=len])?;
    Ok(())
}

pub fn decode_uint32<R: Read>(r: &mut R) -> Result<u32> {
    let mut value: u64 = 0;
    for _ in 0..5 {
        let mut byte = [0u8; 1];
        read_exact(r, &mut byte)?;
        value = (value << 7) | u64::from(byte[0] & 0x7f);
        if byte[0] & 0x80 != 0 {
            return u32::try_from(value).map_err(|_| FilterError::invalid_state("integer overflow"));
        }
    }
    Err(FilterError::invalid_state("integer too long"))
}

/// Write an optional string; `None` is stored as length zero.
pub fn encode_string<W: Write>(w: &mut W, s: Option<&str>) -> Result<()> {
    let Some(s) = s else {
        return encode_uint32(w, 0);
    };
    if s.len() > MAX_STRING {
        return Err(FilterError::invalid_state(format!(
            "string of {} bytes is too long to store",
            s.len()
        )));
    }
    encode_uint32(w, s.len() as u32 + 1)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

pub fn decode_string<R: Read>(r: &mut R) -> Result<Option<String>> {
    let len = decode_uint32(r)? as usize;
    if len == 0 {
        return Ok(None);
    }
    let len = len - 1;
    if len > MAX_STRING {
        return Err(FilterError::invalid_state(format!(
            "string length {len} out of range"
        )));
    }
    let mut buf = vec![0u8; len];
    read_exact(r, &mut buf)?;
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| FilterError::invalid_state("string is not valid UTF-8"))
}
