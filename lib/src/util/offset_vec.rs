use std::fmt;
use std::iter::{Enumerate, Map, Zip};
use std::{slice, vec};

/// Number of slots something occupies in an [`OffsetVec`]
pub trait Width {
    fn width(&self) -> usize;
}

/// Position in an [`OffsetVec`], counted in slots rather than entries
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Sequence of entries addressed by slot offset
///
/// The constant pool (`long` and `double` constants take two indices) and the operand stack
/// (`long` and `double` values take two slots) are both indexed this way. Each entry remembers
/// the slot it starts at, so lookups by offset are a binary search.
#[derive(Clone)]
pub struct OffsetVec<T> {
    entries: Vec<T>,

    /// `starts[i]` is the slot `entries[i]` begins at (kept sorted)
    starts: Vec<usize>,

    /// Slot the next pushed entry will begin at
    end: usize,
}

impl<T: Width> OffsetVec<T> {
    pub fn new() -> OffsetVec<T> {
        OffsetVec::new_starting_at(Offset(0))
    }

    /// Empty vector whose first entry lives at `first` (the constant pool starts at 1)
    pub fn new_starting_at(first: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            starts: vec![],
            end: first.0,
        }
    }

    /// Push an entry, returning the slot it starts at
    pub fn push(&mut self, entry: T) -> Offset {
        let start = self.end;
        self.end += entry.width();
        self.starts.push(start);
        self.entries.push(entry);
        Offset(start)
    }

    pub fn pop(&mut self) -> Option<T> {
        let entry = self.entries.pop()?;
        if let Some(start) = self.starts.pop() {
            self.end = start;
        }
        Some(entry)
    }
}

impl<T> OffsetVec<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total slots used, plus the starting offset
    pub fn offset_len(&self) -> Offset {
        Offset(self.end)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    /// Entry starting at exactly this slot
    ///
    /// The second slot of a wide entry is not the start of anything, so it gives `None`.
    pub fn get_offset(&self, offset: Offset) -> Option<&T> {
        let index = self.starts.binary_search(&offset.0).ok()?;
        self.entries.get(index)
    }

    /// Entries with their starting offset and position
    pub fn iter(&self) -> Iter<'_, T> {
        self.into_iter()
    }
}

type Entry<T> = (usize, (usize, T));

fn with_offset<T>((index, (start, entry)): Entry<T>) -> (Offset, usize, T) {
    (Offset(start), index, entry)
}

pub type Iter<'a, T> = Map<
    Enumerate<Zip<std::iter::Copied<slice::Iter<'a, usize>>, slice::Iter<'a, T>>>,
    fn(Entry<&'a T>) -> (Offset, usize, &'a T),
>;

pub type IntoIter<T> =
    Map<Enumerate<Zip<vec::IntoIter<usize>, vec::IntoIter<T>>>, fn(Entry<T>) -> (Offset, usize, T)>;

impl<'a, T> IntoIterator for &'a OffsetVec<T> {
    type Item = (Offset, usize, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.starts
            .iter()
            .copied()
            .zip(self.entries.iter())
            .enumerate()
            .map(with_offset as fn(Entry<&'a T>) -> (Offset, usize, &'a T))
    }
}

impl<T> IntoIterator for OffsetVec<T> {
    type Item = (Offset, usize, T);
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        self.starts
            .into_iter()
            .zip(self.entries)
            .enumerate()
            .map(with_offset as fn(Entry<T>) -> (Offset, usize, T))
    }
}

impl<T: PartialEq> PartialEq for OffsetVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.starts == other.starts && self.entries == other.entries
    }
}

impl<T: Eq> Eq for OffsetVec<T> {}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> Self {
        OffsetVec::new()
    }
}

impl<T: Width> FromIterator<T> for OffsetVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(entries: I) -> Self {
        let mut offset_vec = OffsetVec::new();
        offset_vec.extend(entries);
        offset_vec
    }
}

impl<T: Width> Extend<T> for OffsetVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, entries: I) {
        for entry in entries {
            self.push(entry);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.starts.iter().zip(&self.entries))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Stand-in for constants or stack values
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Value {
        Int(i32),
        Long(i64),
    }

    impl Width for Value {
        fn width(&self) -> usize {
            match self {
                Value::Int(_) => 1,
                Value::Long(_) => 2,
            }
        }
    }

    #[test]
    fn stack_slots() {
        let stack: OffsetVec<Value> = [Value::Int(1), Value::Long(2), Value::Int(3)]
            .into_iter()
            .collect();
        let starts: Vec<(Offset, usize)> = stack.iter().map(|(off, idx, _)| (off, idx)).collect();
        assert_eq!(starts, vec![(Offset(0), 0), (Offset(1), 1), (Offset(3), 2)]);
        assert_eq!(stack.offset_len(), Offset(4));
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.get_offset(Offset(1)), Some(&Value::Long(2)));
        assert_eq!(stack.get_offset(Offset(2)), None);
        assert_eq!(stack.get_offset(Offset(4)), None);
        assert_eq!(format!("{:?}", stack), "{0: Int(1), 1: Long(2), 3: Int(3)}");
    }

    #[test]
    fn pool_indices() {
        let mut pool: OffsetVec<Value> = OffsetVec::new_starting_at(Offset(1));
        assert_eq!(pool.push(Value::Long(0)), Offset(1));
        assert_eq!(pool.push(Value::Int(1)), Offset(3));
        assert_eq!(pool.pop(), Some(Value::Int(1)));
        assert_eq!(pool.offset_len(), Offset(3));
        assert_eq!(pool.last(), Some(&Value::Long(0)));

        let owned: Vec<(Offset, usize, Value)> = pool.into_iter().collect();
        assert_eq!(owned, vec![(Offset(1), 0, Value::Long(0))]);
    }
}
