//! Tagged argument vectors.
//!
//! Generic property get/set calls take a list of `(tag, value)` pairs ended
//! by a zero tag. The top nibble of a tag is the value's type code, the rest
//! is an application-defined property id:
//!
//! ```text
//!  31   28 27                                   0
//! +-------+--------------------------------------+
//! | type  | property id                          |
//! +-------+--------------------------------------+
//! ```
//!
//! The layout is the one written to object state files (see [`state`]), so
//! it is kept bit-for-bit.
//!
//! [`ArgVec::build`] reads at most [`ARGV_MAX`] pairs off a [`VaList`] per
//! call. The setter flavour ([`ArgV`]) collects values; the getter flavour
//! ([`ArgGetV`]) collects storage slots and zeroes each one as it is read.

pub mod bag;
pub mod get;
pub mod state;

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

pub use bag::PropertyMap;
pub use get::{ArgGetV, ArgRef};
pub use state::ObjectState;

/// Maximum number of slots filled by one [`ArgVec::build`] call.
pub const ARGV_MAX: usize = 20;

/// Shared handle for object-typed arguments.
pub type ObjectRef = Arc<dyn Any + Send + Sync>;

/// Type codes carried in the top nibble of a [`Tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ArgType {
    Object = 0x0000_0000,
    Int = 0x1000_0000,
    Double = 0x2000_0000,
    Str = 0x3000_0000,
    Pointer = 0x4000_0000,
    Bool = 0x5000_0000,
}

impl ArgType {
    pub const MASK: u32 = 0xf000_0000;

    /// Decode the type code of a raw tag. `None` for unassigned codes.
    pub fn from_bits(raw: u32) -> Option<Self> {
        match raw & Self::MASK {
            0x0000_0000 => Some(Self::Object),
            0x1000_0000 => Some(Self::Int),
            0x2000_0000 => Some(Self::Double),
            0x3000_0000 => Some(Self::Str),
            0x4000_0000 => Some(Self::Pointer),
            0x5000_0000 => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Object => "obj",
            Self::Int => "int",
            Self::Double => "dbl",
            Self::Str => "str",
            Self::Pointer => "ptr",
            Self::Bool => "boo",
        }
    }
}

/// A packed type code and property id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

impl Tag {
    /// List terminator.
    pub const END: Tag = Tag(0);
    pub const ID_MASK: u32 = 0x0fff_ffff;
    /// Id marking a slot that has already been handled.
    pub const IGNORE: u32 = 1;
    /// First id available to applications; lower ids are reserved.
    pub const FIRST: u32 = 1024;

    pub const fn new(ty: ArgType, id: u32) -> Self {
        Tag(ty as u32 | (id & Self::ID_MASK))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Tag(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn id(self) -> u32 {
        self.0 & Self::ID_MASK
    }

    pub fn arg_type(self) -> Option<ArgType> {
        ArgType::from_bits(self.0)
    }

    pub const fn is_end(self) -> bool {
        self.0 == 0
    }

    pub const fn is_ignored(self) -> bool {
        self.id() == Self::IGNORE
    }

    /// The same type code with the id replaced by [`Tag::IGNORE`].
    pub const fn ignored(self) -> Self {
        Tag((self.0 & ArgType::MASK) | Self::IGNORE)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg_type() {
            Some(ty) => write!(f, "{}:{}", ty.name(), self.id()),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// A typed argument value.
#[derive(Clone)]
pub enum ArgValue {
    Object(Option<ObjectRef>),
    Int(i32),
    Double(f64),
    Str(Option<String>),
    /// An opaque address; 0 is null.
    Pointer(usize),
    Bool(bool),
}

impl ArgValue {
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Object(_) => ArgType::Object,
            Self::Int(_) => ArgType::Int,
            Self::Double(_) => ArgType::Double,
            Self::Str(_) => ArgType::Str,
            Self::Pointer(_) => ArgType::Pointer,
            Self::Bool(_) => ArgType::Bool,
        }
    }

    /// The value a getter slot holds before anything writes to it.
    pub fn zero(ty: ArgType) -> Self {
        match ty {
            ArgType::Object => Self::Object(None),
            ArgType::Int => Self::Int(0),
            ArgType::Double => Self::Double(0.0),
            ArgType::Str => Self::Str(None),
            ArgType::Pointer => Self::Pointer(0),
            ArgType::Bool => Self::Bool(false),
        }
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(Some(obj)) => write!(f, "Object({:p})", Arc::as_ptr(obj)),
            Self::Object(None) => f.write_str("Object(null)"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Double(v) => write!(f, "Double({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Pointer(v) => write!(f, "Pointer({v:#x})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            },
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Pointer(a), Self::Pointer(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(Some(v.to_string()))
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(Some(v))
    }
}

impl From<ObjectRef> for ArgValue {
    fn from(v: ObjectRef) -> Self {
        Self::Object(Some(v))
    }
}

/// Something that can sit in an argument slot.
pub trait ArgSlot: Sized {
    /// Check a value pulled off the list for a tag of type `ty`.
    ///
    /// Returns the value to store, or `None` if it does not fit the type.
    fn accept(self, ty: ArgType) -> Option<Self>;
}

impl ArgSlot for ArgValue {
    fn accept(self, ty: ArgType) -> Option<Self> {
        match (ty, self) {
            // Booleans travel promoted to int.
            (ArgType::Bool, Self::Int(v)) => Some(Self::Bool(v != 0)),
            (ty, v) if v.arg_type() == ty => Some(v),
            _ => None,
        }
    }
}

/// One item of an argument list: a tag or the value following it.
#[derive(Debug)]
pub enum VaArg<T> {
    Tag(u32),
    Value(T),
}

/// A cursor over a zero-terminated `(tag, value)` list.
#[derive(Debug)]
pub struct VaList<T = ArgValue> {
    items: VecDeque<VaArg<T>>,
}

impl<T> Default for VaList<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> VaList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tag and its value.
    pub fn arg(mut self, tag: Tag, value: impl Into<T>) -> Self {
        self.items.push_back(VaArg::Tag(tag.raw()));
        self.items.push_back(VaArg::Value(value.into()));
        self
    }

    /// Append the zero terminator.
    pub fn end(mut self) -> Self {
        self.items.push_back(VaArg::Tag(0));
        self
    }

    /// Append a raw item.
    pub fn push(&mut self, item: VaArg<T>) {
        self.items.push_back(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn next_tag(&mut self) -> Option<u32> {
        match self.items.pop_front()? {
            VaArg::Tag(raw) => Some(raw),
            VaArg::Value(_) => None,
        }
    }

    fn next_value(&mut self) -> Option<T> {
        match self.items.pop_front()? {
            VaArg::Value(v) => Some(v),
            VaArg::Tag(_) => None,
        }
    }

    /// Consume the terminator if it is next.
    fn take_end(&mut self) -> bool {
        if matches!(self.items.front(), Some(VaArg::Tag(0))) {
            self.items.pop_front();
            true
        } else {
            false
        }
    }
}

impl FromIterator<(Tag, ArgValue)> for VaList<ArgValue> {
    /// Build a terminated list from pairs.
    fn from_iter<I: IntoIterator<Item = (Tag, ArgValue)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(VaList::new(), |list, (tag, value)| list.arg(tag, value))
            .end()
    }
}

/// A tag and what was read for it.
#[derive(Debug)]
pub struct Arg<T = ArgValue> {
    pub tag: Tag,
    pub value: T,
}

impl<T> Arg<T> {
    /// Mark this slot as handled.
    pub fn ignore(&mut self) {
        self.tag = self.tag.ignored();
    }
}

/// Outcome of one [`ArgVec::build`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The terminator was reached; every argument has been read.
    Complete,
    /// [`ARGV_MAX`] slots were filled and more arguments follow. Building
    /// again continues with the next batch.
    Truncated,
    /// A tag with an unknown type, a value of the wrong type, or a missing
    /// terminator. The slots read before it are kept.
    Malformed,
}

impl BuildStatus {
    /// Whether the whole list has been processed.
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListState {
    Open,
    Finished,
    Broken,
}

/// A fixed-capacity vector of arguments read off a [`VaList`].
#[derive(Debug)]
pub struct ArgVec<T> {
    ap: VaList<T>,
    argv: Vec<Arg<T>>,
    state: ListState,
}

/// Setter-direction argument vector.
pub type ArgV = ArgVec<ArgValue>;

impl<T: ArgSlot> ArgVec<T> {
    pub fn new(ap: VaList<T>) -> Self {
        Self {
            ap,
            argv: Vec::with_capacity(ARGV_MAX),
            state: ListState::Open,
        }
    }

    /// Read the next batch of at most [`ARGV_MAX`] arguments.
    pub fn build(&mut self) -> BuildStatus {
        self.argv.clear();
        match self.state {
            ListState::Finished => return BuildStatus::Complete,
            ListState::Broken => return BuildStatus::Malformed,
            ListState::Open => {}
        }

        while self.argv.len() < ARGV_MAX {
            let Some(raw) = self.ap.next_tag() else {
                warn!(argc = self.argv.len(), "argument list is not terminated");
                return self.broken();
            };
            if raw == 0 {
                self.state = ListState::Finished;
                return BuildStatus::Complete;
            }

            let tag = Tag::from_raw(raw);
            let Some(ty) = tag.arg_type() else {
                warn!(tag = raw, "unknown argument type, truncating argument list");
                return self.broken();
            };
            let Some(value) = self.ap.next_value().and_then(|v| v.accept(ty)) else {
                warn!(%tag, "argument value does not match its tag");
                return self.broken();
            };
            self.argv.push(Arg { tag, value });
        }

        if self.ap.take_end() {
            self.state = ListState::Finished;
            BuildStatus::Complete
        } else {
            debug!(max = ARGV_MAX, "argument list exceeds slot limit");
            BuildStatus::Truncated
        }
    }

    fn broken(&mut self) -> BuildStatus {
        self.state = ListState::Broken;
        self.ap.items.clear();
        BuildStatus::Malformed
    }

    /// Number of slots filled by the last build.
    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn args(&self) -> &[Arg<T>] {
        &self.argv
    }

    pub fn args_mut(&mut self) -> &mut [Arg<T>] {
        &mut self.argv
    }
}
