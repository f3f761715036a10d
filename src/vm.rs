//! Minimal VM-state collaborator surface.
//!
//! There's no instruction-dispatch loop or stack here. What the compiler
//! needs from "the VM" is somewhere to root the intern table and the object
//! arena, so that interning a string during compilation is visible across
//! the whole compile call (and, if a real VM collaborator were layered on
//! top, across the whole process lifetime). That's exactly what [`Vm`]
//! provides and nothing more.

use std::rc::Rc;

use crate::table::Table;
use crate::value::ObjString;

/// Process-wide VM state: the interned-string set and the object arena it
/// draws allocations from.
///
/// This implementation roots the object arena in a `Vec` of strong
/// references rather than an intrusive linked list, which keeps insertion
/// at allocation time O(1) amortized via `Vec::push` without unsafe
/// pointer-list bookkeeping. Objects are kept alive by the `Rc` held here
/// *and* by every `Value::Obj` that references them; dropping the `Vm`
/// drops the arena's strong references, and actual deallocation follows
/// ordinary `Rc` refcounting. There's no tracing GC here, just refcounting.
#[derive(Default)]
pub struct Vm {
    strings: Table,
    objects: Vec<Rc<ObjString>>,
}

impl Vm {
    pub fn new() -> Self {
        Vm::default()
    }

    /// Interns `bytes`, returning the canonical object for that content.
    /// Two calls with byte-equal input return the same allocation —
    /// `find_string` is consulted first, and only on a miss is a new
    /// `ObjString` allocated, threaded onto the arena, and inserted into the
    /// intern set (as its own key, with a `Nil` value).
    pub fn intern(&mut self, bytes: &[u8]) -> Rc<ObjString> {
        let hash = crate::value::fnv1a(bytes);
        if let Some(existing) = self.strings.find_string(bytes, hash) {
            return existing;
        }
        let obj = Rc::new(ObjString::new(bytes));
        self.objects.push(obj.clone());
        self.strings.set(&obj, crate::value::Value::Nil);
        obj
    }

    pub fn intern_count(&self) -> usize {
        self.strings.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
