use super::{BlockId, FreshVariables};
use crate::term::Word;
use indexmap::IndexMap;
use log::trace;
use primitive_types::U256;
use std::fmt;

/// Canonical form of a storage key. Concrete and symbolic keys live in
/// separate variants, so a symbolic key can never alias a concrete one by
/// accident of its textual form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Concrete(U256),
    Symbolic(String),
}

impl From<&Word> for StorageKey {
    fn from(key: &Word) -> Self {
        let key = key.simplify();

        match key.as_concrete() {
            Some(value) => StorageKey::Concrete(value),
            None => StorageKey::Symbolic(key.to_string()),
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageKey::Concrete(value) => write!(f, "{:#x}", value),
            StorageKey::Symbolic(name) => write!(f, "{}", name),
        }
    }
}

/// Persistent key-value store of one account along one path.
#[derive(Clone, Debug)]
pub struct Storage {
    data: IndexMap<StorageKey, Word>,
    fresh: FreshVariables,
}

impl Storage {
    pub fn new(block: BlockId) -> Self {
        Self {
            data: IndexMap::new(),
            fresh: FreshVariables::new("storageVar", block),
        }
    }

    pub fn duplicate(&self, new_block: BlockId) -> Self {
        Self {
            data: self.data.clone(),
            fresh: self.fresh.rebased(new_block),
        }
    }

    /// Reads an unwritten slot as a fresh `storageVar` and remembers it, so
    /// repeated reads return the identical term.
    pub fn sload(&mut self, key: &Word) -> Word {
        let key = StorageKey::from(key);
        let fresh = &mut self.fresh;

        self.data
            .entry(key)
            .or_insert_with(|| {
                let value = fresh.next();
                trace!("sload of unknown slot, generated {}", value);
                value
            })
            .clone()
    }

    pub fn sstore(&mut self, key: &Word, value: Word) {
        let key = StorageKey::from(key);

        trace!("sstore [{}] := {}", key, value);

        self.data.insert(key, value);
    }

    /// Looks a slot up without minting a fresh word for it.
    pub fn get(&self, key: &Word) -> Option<&Word> {
        self.data.get(&StorageKey::from(key))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// In the order slots were first touched.
    pub fn iter(&self) -> impl Iterator<Item = (&StorageKey, &Word)> {
        self.data.iter()
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (key, value) in self.data.iter() {
            writeln!(f, "key={}, value={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_slot_reads_are_idempotent() {
        let mut s = Storage::new(2);
        let key = Word::numeral(7_u64);

        let first = s.sload(&key);
        let second = s.sload(&key);

        assert_eq!(first, Word::fresh("storageVar2-1"));
        assert!(first.ptr_eq(&second));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn sstore_then_sload_returns_the_stored_value() {
        let mut s = Storage::new(0);
        let key = Word::fresh("slot");
        let value = Word::fresh("v");

        s.sload(&key);
        s.sstore(&key, value.clone());

        assert!(s.sload(&key).ptr_eq(&value));
    }

    #[test]
    fn keys_are_canonicalized_before_lookup() {
        let mut s = Storage::new(0);

        s.sstore(&Word::numeral(3_u64), Word::numeral(42_u64));

        let same_key = Word::numeral(1_u64).add(&Word::numeral(2_u64));
        assert_eq!(s.sload(&same_key), Word::numeral(42_u64));
    }

    #[test]
    fn concrete_and_symbolic_keys_do_not_collide() {
        let mut s = Storage::new(0);
        let symbolic = Word::fresh("0x1");

        s.sstore(&Word::numeral(1_u64), Word::numeral(10_u64));

        assert_eq!(s.get(&symbolic), None);
        assert_ne!(s.sload(&symbolic), Word::numeral(10_u64));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut s = Storage::new(0);
        s.sstore(&Word::numeral(0_u64), Word::numeral(1_u64));

        let mut copy = s.duplicate(4);
        copy.sstore(&Word::numeral(0_u64), Word::numeral(2_u64));

        assert_eq!(copy.sload(&Word::numeral(1_u64)), Word::fresh("storageVar4-1"));
        assert_eq!(s.get(&Word::numeral(0_u64)), Some(&Word::numeral(1_u64)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn display_lists_slots_in_first_touch_order() {
        let mut s = Storage::new(0);
        s.sstore(&Word::numeral(2_u64), Word::numeral(1_u64));
        s.sstore(&Word::numeral(1_u64), Word::numeral(2_u64));

        assert_eq!(s.to_string(), "key=0x2, value=0x1\nkey=0x1, value=0x2\n");
    }
}
