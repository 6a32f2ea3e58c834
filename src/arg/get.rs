//! Getter-direction argument vectors.
//!
//! Instead of values, a getter list carries mutable references to caller
//! storage. Each slot is zeroed as soon as it is read off the list, so a
//! property nobody answers reads back as zero, `false` or `None`.

use super::{ArgSlot, ArgType, ArgValue, ArgVec, ObjectRef};

/// Caller storage for one getter argument.
#[derive(Debug)]
pub enum ArgRef<'a> {
    Object(&'a mut Option<ObjectRef>),
    Int(&'a mut i32),
    Double(&'a mut f64),
    Str(&'a mut Option<String>),
    Pointer(&'a mut usize),
    Bool(&'a mut bool),
}

/// Getter-direction argument vector.
pub type ArgGetV<'a> = ArgVec<ArgRef<'a>>;

impl ArgRef<'_> {
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

    /// Reset the storage to its zero value.
    pub fn clear(&mut self) {
        let zero = ArgValue::zero(self.arg_type());
        self.set(zero);
    }

    /// Store `value`. Returns `false`, leaving the storage alone, when the
    /// value's type does not match the slot.
    pub fn set(&mut self, value: ArgValue) -> bool {
        match (self, value) {
            (Self::Object(slot), ArgValue::Object(v)) => **slot = v,
            (Self::Int(slot), ArgValue::Int(v)) => **slot = v,
            (Self::Double(slot), ArgValue::Double(v)) => **slot = v,
            (Self::Str(slot), ArgValue::Str(v)) => **slot = v,
            (Self::Pointer(slot), ArgValue::Pointer(v)) => **slot = v,
            (Self::Bool(slot), ArgValue::Bool(v)) => **slot = v,
            _ => return false,
        }
        true
    }
}

impl ArgSlot for ArgRef<'_> {
    fn accept(mut self, ty: ArgType) -> Option<Self> {
        if self.arg_type() != ty {
            return None;
        }
        self.clear();
        Some(self)
    }
}

impl<'a> From<&'a mut Option<ObjectRef>> for ArgRef<'a> {
    fn from(v: &'a mut Option<ObjectRef>) -> Self {
        Self::Object(v)
    }
}

impl<'a> From<&'a mut i32> for ArgRef<'a> {
    fn from(v: &'a mut i32) -> Self {
        Self::Int(v)
    }
}

impl<'a> From<&'a mut f64> for ArgRef<'a> {
    fn from(v: &'a mut f64) -> Self {
        Self::Double(v)
    }
}

impl<'a> From<&'a mut Option<String>> for ArgRef<'a> {
    fn from(v: &'a mut Option<String>) -> Self {
        Self::Str(v)
    }
}

impl<'a> From<&'a mut usize> for ArgRef<'a> {
    fn from(v: &'a mut usize) -> Self {
        Self::Pointer(v)
    }
}

impl<'a> From<&'a mut bool> for ArgRef<'a> {
    fn from(v: &'a mut bool) -> Self {
        Self::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::{BuildStatus, Tag, VaList, ARGV_MAX};

    const NAME: Tag = Tag::new(ArgType::Str, Tag::FIRST);
    const COUNT: Tag = Tag::new(ArgType::Int, Tag::FIRST + 1);
    const FLAG: Tag = Tag::new(ArgType::Bool, Tag::FIRST + 2);

    #[test]
    fn test_storage_zeroed_on_read() {
        let mut name = Some("stale".to_string());
        let mut count: i32 = 99;
        let mut flag = true;
        {
            let ap = VaList::new()
                .arg(NAME, &mut name)
                .arg(COUNT, &mut count)
                .arg(FLAG, &mut flag)
                .end();
            let mut argv = ArgGetV::new(ap);
            assert_eq!(argv.build(), BuildStatus::Complete);
            assert_eq!(argv.argc(), 3);
        }
        assert_eq!(name, None);
        assert_eq!(count, 0);
        assert!(!flag);
    }

    #[test]
    fn test_set_writes_through() {
        let mut count: i32 = 0;
        let mut name: Option<String> = None;
        {
            let ap = VaList::new()
                .arg(COUNT, &mut count)
                .arg(NAME, &mut name)
                .end();
            let mut argv = ArgGetV::new(ap);
            argv.build();
            let args = argv.args_mut();
            assert!(args[0].value.set(ArgValue::Int(12)));
            assert!(!args[1].value.set(ArgValue::Int(1)));
            assert!(args[1].value.set(ArgValue::from("x")));
        }
        assert_eq!(count, 12);
        assert_eq!(name.as_deref(), Some("x"));
    }

    #[test]
    fn test_slot_type_must_match_tag() {
        let mut flag = false;
        let mut argv = ArgGetV::new(VaList::new().arg(COUNT, &mut flag).end());
        assert_eq!(argv.build(), BuildStatus::Malformed);
    }

    #[test]
    fn test_overflow_only_zeroes_read_slots() {
        let mut slots = [7i32; 22];
        {
            let ap = slots
                .iter_mut()
                .enumerate()
                .fold(VaList::<ArgRef<'_>>::new(), |ap, (i, slot)| {
                    ap.arg(Tag::new(ArgType::Int, Tag::FIRST + i as u32), slot)
                })
                .end();
            let mut argv = ArgGetV::new(ap);
            assert_eq!(argv.build(), BuildStatus::Truncated);
            assert_eq!(argv.argc(), ARGV_MAX);
        }
        assert!(slots[..ARGV_MAX].iter().all(|&v| v == 0));
        assert_eq!(slots[ARGV_MAX..], [7, 7]);
    }
}
