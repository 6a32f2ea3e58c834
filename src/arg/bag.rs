//! A property bag driven by tagged argument lists.

use std::collections::BTreeMap;

use tracing::debug;

use super::{ArgGetV, ArgV, ArgValue, BuildStatus, Tag};

/// Typed properties keyed by tag.
///
/// [`setv`](Self::setv) and [`getv`](Self::getv) work through a whole
/// argument list, one [`ARGV_MAX`](super::ARGV_MAX) batch at a time, and
/// mark each slot they handle as ignored.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    props: BTreeMap<Tag, ArgValue>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn get(&self, tag: Tag) -> Option<&ArgValue> {
        self.props.get(&tag)
    }

    /// Store a single property. Ignored and terminator tags are not stored.
    pub fn insert(&mut self, tag: Tag, value: ArgValue) -> Option<ArgValue> {
        if tag.is_end() || tag.is_ignored() {
            return None;
        }
        self.props.insert(tag, value)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<ArgValue> {
        self.props.remove(&tag)
    }

    /// Properties in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &ArgValue)> {
        self.props.iter().map(|(tag, value)| (*tag, value))
    }

    /// Store every argument of a setter list.
    pub fn setv(&mut self, args: &mut ArgV) -> BuildStatus {
        loop {
            let status = args.build();
            for arg in args.args_mut() {
                if arg.tag.is_ignored() {
                    continue;
                }
                self.props.insert(arg.tag, arg.value.clone());
                arg.ignore();
            }
            if status != BuildStatus::Truncated {
                debug!(count = self.props.len(), ?status, "stored properties");
                return status;
            }
        }
    }

    /// Answer every slot of a getter list this map has a value for.
    ///
    /// Slots for unknown tags keep their zero value and stay unmarked.
    pub fn getv(&self, args: &mut ArgGetV<'_>) -> BuildStatus {
        loop {
            let status = args.build();
            for arg in args.args_mut() {
                if arg.tag.is_ignored() {
                    continue;
                }
                let Some(value) = self.props.get(&arg.tag) else {
                    continue;
                };
                if arg.value.set(value.clone()) {
                    arg.ignore();
                }
            }
            if status != BuildStatus::Truncated {
                return status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::{ArgType, VaList};

    const NAME: Tag = Tag::new(ArgType::Str, Tag::FIRST);
    const COUNT: Tag = Tag::new(ArgType::Int, Tag::FIRST + 1);
    const MISSING: Tag = Tag::new(ArgType::Int, Tag::FIRST + 2);

    #[test]
    fn test_set_then_get() {
        let mut map = PropertyMap::new();
        let mut set = ArgV::new(VaList::new().arg(NAME, "inbox").arg(COUNT, 3).end());
        assert!(map.setv(&mut set).is_complete());
        assert!(set.args().iter().all(|a| a.tag.is_ignored()));
        assert_eq!(map.len(), 2);

        let mut name: Option<String> = None;
        let mut count: i32 = 0;
        let mut missing: i32 = 5;
        {
            let mut get = ArgGetV::new(
                VaList::new()
                    .arg(NAME, &mut name)
                    .arg(COUNT, &mut count)
                    .arg(MISSING, &mut missing)
                    .end(),
            );
            assert!(map.getv(&mut get).is_complete());
            let handled: Vec<bool> = get.args().iter().map(|a| a.tag.is_ignored()).collect();
            assert_eq!(handled, [true, true, false]);
        }
        assert_eq!(name.as_deref(), Some("inbox"));
        assert_eq!(count, 3);
        assert_eq!(missing, 0);
    }

    #[test]
    fn test_setv_covers_long_lists() {
        let ap: VaList = (0..45)
            .map(|i| (Tag::new(ArgType::Int, Tag::FIRST + i), ArgValue::Int(i as i32)))
            .collect();
        let mut map = PropertyMap::new();
        assert!(map.setv(&mut ArgV::new(ap)).is_complete());
        assert_eq!(map.len(), 45);
        assert_eq!(
            map.get(Tag::new(ArgType::Int, Tag::FIRST + 44)),
            Some(&ArgValue::Int(44))
        );
    }

    #[test]
    fn test_setv_keeps_prefix_of_malformed_list() {
        let ap = VaList::new().arg(COUNT, 1).arg(NAME, 2).end();
        let mut map = PropertyMap::new();
        assert_eq!(map.setv(&mut ArgV::new(ap)), BuildStatus::Malformed);
        assert_eq!(map.get(COUNT), Some(&ArgValue::Int(1)));
        assert_eq!(map.get(NAME), None);
    }

    #[test]
    fn test_insert_skips_ignored() {
        let mut map = PropertyMap::new();
        assert_eq!(map.insert(COUNT.ignored(), ArgValue::Int(1)), None);
        assert!(map.is_empty());
        map.insert(COUNT, ArgValue::Int(1));
        assert_eq!(map.insert(COUNT, ArgValue::Int(2)), Some(ArgValue::Int(1)));
        assert_eq!(map.remove(COUNT), Some(ArgValue::Int(2)));
    }
}
