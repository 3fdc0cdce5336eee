use std::{cell::RefCell, fmt, rc::Rc};
use thiserror::Error;
use tracing::{trace, warn};
use super::value::Value;

/// Number of slots in a default heap.
pub const DEFAULT_CAPACITY: usize = 65536;

pub type SharedHeap = Rc<RefCell<Heap>>;

/// A heap location. Holding one is the capability to read and mutate that slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeapRef(usize);

impl HeapRef {
    pub fn loc(self) -> usize {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "loc: {}", self.0)
    }
}

/// How the heap picks the slot for a new allocation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AllocPolicy {
    /// Slots are handed out by a cursor that only moves forward. Freed slots are never reused.
    #[default]
    Monotonic,
    /// Freed slots are handed out again (most recently freed first) before the cursor advances.
    ReuseFreed,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum HeapError {
    #[error("<Error: Out of memory>")]
    OutOfMemory,
    #[error("<Error: Segmentation Fault at location: {0}>")]
    SegmentationFault(HeapRef),
    #[error("<Error: Use of freed location: {0}>")]
    UseAfterFree(HeapRef),
    #[error("<Error: Double free at location: {0}>")]
    DoubleFree(HeapRef),
}

enum Slot {
    Live(Value),
    Freed,
}

pub struct Heap {
    slots: Vec<Slot>,
    capacity: usize,
    policy: AllocPolicy,
    free_list: Vec<usize>,
}

impl Heap {
    pub fn new(capacity: usize, policy: AllocPolicy) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            policy,
            free_list: Vec::new(),
        }
    }

    pub fn shared(capacity: usize, policy: AllocPolicy) -> SharedHeap {
        Rc::new(RefCell::new(Self::new(capacity, policy)))
    }

    /// Index of the next never-used slot.
    pub fn cursor(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, r: HeapRef) -> Result<&Slot, HeapError> {
        self.slots
            .get(r.0)
            .ok_or(HeapError::SegmentationFault(r))
    }

    pub fn insert(&mut self, item: Value) -> Result<HeapRef, HeapError> {
        if self.policy == AllocPolicy::ReuseFreed {
            if let Some(idx) = self.free_list.pop() {
                trace!(loc = idx, "reusing freed heap slot");
                self.slots[idx] = Slot::Live(item);
                return Ok(HeapRef(idx));
            }
        }

        if self.slots.len() >= self.capacity {
            warn!(capacity = self.capacity, "heap exhausted");
            return Err(HeapError::OutOfMemory);
        }

        self.slots.push(Slot::Live(item));
        Ok(HeapRef(self.slots.len() - 1))
    }

    pub fn get(&self, r: HeapRef) -> Result<&Value, HeapError> {
        match self.slot(r)? {
            Slot::Live(val) => Ok(val),
            Slot::Freed => Err(HeapError::UseAfterFree(r)),
        }
    }

    /// Overwrite a live slot, returning the value now stored there.
    pub fn set(&mut self, r: HeapRef, val: Value) -> Result<Value, HeapError> {
        match self.slots.get_mut(r.0) {
            Some(Slot::Live(slot)) => {
                *slot = val.clone();
                Ok(val)
            },
            Some(Slot::Freed) => Err(HeapError::UseAfterFree(r)),
            None => Err(HeapError::SegmentationFault(r)),
        }
    }

    pub fn free(&mut self, r: HeapRef) -> Result<HeapRef, HeapError> {
        match self.slots.get_mut(r.0) {
            Some(slot @ Slot::Live(_)) => {
                *slot = Slot::Freed;
                if self.policy == AllocPolicy::ReuseFreed {
                    self.free_list.push(r.0);
                }
                trace!(loc = r.0, "freed heap slot");
                Ok(r)
            },
            Some(Slot::Freed) => Err(HeapError::DoubleFree(r)),
            None => Err(HeapError::SegmentationFault(r)),
        }
    }

    /// Free every live slot that holds anything but a number. Array cells only ever hold
    /// numbers, so arrays held outside the heap keep rendering; everything that could point back
    /// at the heap or the globals is released.
    pub fn release_non_numeric(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if matches!(slot, Slot::Live(val) if !matches!(val, Value::Number(_))) {
                *slot = Slot::Freed;
                if self.policy == AllocPolicy::ReuseFreed {
                    self.free_list.push(idx);
                }
            }
        }
    }

    pub fn stats(&self) -> Stats {
        let freed = self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Freed))
            .count();
        Stats {
            cursor: self.cursor(),
            live: self.cursor() - freed,
            freed,
            capacity: self.capacity,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Stats {
    pub cursor: usize,
    pub live: usize,
    pub freed: usize,
    pub capacity: usize,
}
