//! Ping-pong buffer pair
//!
//! Two equally shaped resources, exactly one of which is authoritative at
//! any time. Readers use `current()`, the producing pass writes `next()`,
//! then the owner calls `flip()` once that write has been submitted.

/// Identifies one member of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    A,
    B,
}

impl BufferSlot {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            BufferSlot::A => BufferSlot::B,
            BufferSlot::B => BufferSlot::A,
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            BufferSlot::A => 0,
            BufferSlot::B => 1,
        }
    }
}

#[derive(Debug)]
pub struct PingPong<T> {
    buffers: [T; 2],
    current: BufferSlot,
}

impl<T> PingPong<T> {
    /// New pair with `a` authoritative.
    pub fn new(a: T, b: T) -> Self {
        Self {
            buffers: [a, b],
            current: BufferSlot::A,
        }
    }

    #[inline]
    pub fn current_slot(&self) -> BufferSlot {
        self.current
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.buffers[self.current.index()]
    }

    #[inline]
    pub fn next(&self) -> &T {
        &self.buffers[self.current.other().index()]
    }

    /// Both members at once: `(current, next)`.
    #[inline]
    pub fn read_write(&self) -> (&T, &T) {
        (self.current(), self.next())
    }

    /// Make `next()` authoritative. Returns the new current slot.
    pub fn flip(&mut self) -> BufferSlot {
        self.current = self.current.other();
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_a() {
        let pair = PingPong::new("a", "b");
        assert_eq!(pair.current_slot(), BufferSlot::A);
        assert_eq!(*pair.current(), "a");
        assert_eq!(*pair.next(), "b");
    }

    #[test]
    fn flip_exchanges_roles() {
        let mut pair = PingPong::new(1u32, 2u32);
        for _ in 0..5 {
            let before_current = *pair.current();
            let before_next = *pair.next();
            pair.flip();
            assert_eq!(*pair.current(), before_next);
            assert_eq!(*pair.next(), before_current);
            assert_ne!(pair.current(), pair.next());
        }
        assert_eq!(pair.current_slot(), BufferSlot::B);
    }

    #[test]
    fn read_write_never_aliases() {
        let mut pair = PingPong::new(vec![0u8; 4], vec![0u8; 4]);
        for _ in 0..4 {
            let (read, write) = pair.read_write();
            assert!(!std::ptr::eq(read, write));
            pair.flip();
        }
    }

    #[test]
    fn slots_alternate() {
        assert_eq!(BufferSlot::A.other(), BufferSlot::B);
        assert_eq!(BufferSlot::B.other(), BufferSlot::A);
    }
}
