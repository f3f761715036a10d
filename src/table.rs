//! Open-addressed intern table mapping interned string identity to `Value`.
//! The compiler uses it purely as a set (value is always `Nil`), but the
//! general-purpose `get`/`set`/`delete` operations are kept since a runtime
//! globals table would reuse the same structure.
//!
//! An empty slot is `(key: None, value: Nil)`; a tombstone is
//! `(key: None, value: Bool(true))`. This lets `find_entry`/`find_string`
//! distinguish "never occupied, stop probing" from "previously occupied,
//! keep probing" without a third enum variant.

use std::rc::Rc;

use crate::value::{ObjString, Value};

const MAX_LOAD: f64 = 0.75;
const MIN_CAPACITY: usize = 8;

struct Entry {
    key: Option<Rc<ObjString>>,
    value: Value,
}

impl Entry {
    fn empty() -> Self {
        Entry { key: None, value: Value::Nil }
    }

    fn is_tombstone(&self) -> bool {
        self.key.is_none() && matches!(self.value, Value::Bool(true))
    }

    fn is_truly_empty(&self) -> bool {
        self.key.is_none() && !self.is_tombstone()
    }
}

#[derive(Default)]
pub struct Table {
    entries: Vec<Entry>,
    count: usize,
}

impl Table {
    pub fn new() -> Self {
        Table { entries: Vec::new(), count: 0 }
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// First tombstone encountered if the key is absent, otherwise the
    /// key's own slot.
    fn find_entry(entries: &[Entry], key: &Rc<ObjString>) -> usize {
        let capacity = entries.len();
        let mut index = (key.hash as usize) % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            let entry = &entries[index];
            match &entry.key {
                None => {
                    if entry.is_truly_empty() {
                        return tombstone.unwrap_or(index);
                    } else if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Some(k) if Rc::ptr_eq(k, key) => return index,
                Some(_) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn adjust_capacity(&mut self, capacity: usize) {
        let mut new_entries: Vec<Entry> = (0..capacity).map(|_| Entry::empty()).collect();
        let mut count = 0;
        for entry in self.entries.drain(..) {
            if let Some(key) = entry.key {
                let index = Self::find_entry(&new_entries, &key);
                new_entries[index] = Entry { key: Some(key), value: entry.value };
                count += 1;
            }
        }
        self.entries = new_entries;
        self.count = count;
    }

    /// Sets `key` to `value`, overwriting if present. Returns whether the
    /// key was newly inserted (as opposed to overwritten).
    pub fn set(&mut self, key: &Rc<ObjString>, value: Value) -> bool {
        if self.count + 1 > ((self.capacity() as f64) * MAX_LOAD) as usize {
            let new_capacity = if self.capacity() == 0 { MIN_CAPACITY } else { self.capacity() * 2 };
            self.adjust_capacity(new_capacity);
        }
        let index = Self::find_entry(&self.entries, key);
        let is_new_key = self.entries[index].key.is_none();
        if is_new_key && self.entries[index].is_truly_empty() {
            self.count += 1;
        }
        self.entries[index] = Entry { key: Some(key.clone()), value };
        is_new_key
    }

    pub fn get(&self, key: &Rc<ObjString>) -> Option<&Value> {
        if self.count == 0 {
            return None;
        }
        let index = Self::find_entry(&self.entries, key);
        self.entries[index].key.as_ref().map(|_| &self.entries[index].value)
    }

    /// Removes `key`, leaving a tombstone behind so later linear-probe
    /// chains stay intact. Returns whether the key was present.
    pub fn delete(&mut self, key: &Rc<ObjString>) -> bool {
        if self.count == 0 {
            return false;
        }
        let index = Self::find_entry(&self.entries, key);
        if self.entries[index].key.is_none() {
            return false;
        }
        self.entries[index] = Entry { key: None, value: Value::Bool(true) };
        true
    }

    /// The intern lookup proper: probes from `hash mod capacity`, stopping
    /// at an empty non-tombstone slot (miss), and comparing length, hash,
    /// and bytes on occupied slots. On a hit, returns the existing object so
    /// the caller can reuse it instead of allocating.
    pub fn find_string(&self, bytes: &[u8], hash: u32) -> Option<Rc<ObjString>> {
        if self.entries.is_empty() {
            return None;
        }
        let capacity = self.entries.len();
        let mut index = (hash as usize) % capacity;
        loop {
            let entry = &self.entries[index];
            match &entry.key {
                None => {
                    if entry.is_truly_empty() {
                        return None;
                    }
                }
                Some(k) => {
                    if k.len() == bytes.len() && k.hash == hash && k.as_bytes() == bytes {
                        return Some(k.clone());
                    }
                }
            }
            index = (index + 1) % capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn load_factor(&self) -> f64 {
        if self.capacity() == 0 {
            0.0
        } else {
            self.count as f64 / self.capacity() as f64
        }
    }
}

#[cfg(test)]
mod tests;
