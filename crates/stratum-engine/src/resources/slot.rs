/// A GPU handle that is either live or absent.
///
/// Dropping the inner value releases the underlying object, so `release` on
/// an empty slot is a no-op and teardown can run any number of times.
#[derive(Debug)]
pub enum Slot<T> {
    Unallocated,
    Allocated(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unallocated
    }
}

impl<T> Slot<T> {
    #[inline]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Slot::Allocated(_))
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Allocated(value) => Some(value),
            Slot::Unallocated => None,
        }
    }

    /// Stores `value`, releasing whatever was there.
    pub fn set(&mut self, value: T) {
        *self = Slot::Allocated(value);
    }

    /// Returns the live value, creating it first if the slot is empty.
    pub fn get_or_insert_with(&mut self, create: impl FnOnce() -> T) -> &mut T {
        if let Slot::Unallocated = self {
            *self = Slot::Allocated(create());
        }
        match self {
            Slot::Allocated(value) => value,
            Slot::Unallocated => unreachable!(),
        }
    }

    /// Empties the slot. Returns whether anything was released.
    pub fn release(&mut self) -> bool {
        std::mem::take(self).is_allocated()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Tracked(Rc<Cell<u32>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn release_is_idempotent() {
        let drops = Rc::new(Cell::new(0));
        let mut slot = Slot::Allocated(Tracked(drops.clone()));

        assert!(slot.release());
        assert!(!slot.release());
        assert!(!slot.is_allocated());
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn set_replaces_and_drops_previous() {
        let drops = Rc::new(Cell::new(0));
        let mut slot = Slot::default();
        slot.set(Tracked(drops.clone()));
        slot.set(Tracked(drops.clone()));
        assert_eq!(drops.get(), 1);
        assert!(slot.get().is_some());
    }

    #[test]
    fn get_or_insert_creates_once() {
        let mut slot = Slot::Unallocated;
        let mut calls = 0;
        for _ in 0..3 {
            *slot.get_or_insert_with(|| {
                calls += 1;
                0
            }) += 1;
        }
        assert_eq!(calls, 1);
        assert_eq!(slot.get(), Some(&3));
    }
}
