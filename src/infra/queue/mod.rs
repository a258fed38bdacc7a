//! Fixed-capacity byte rings carrying traffic between interrupt handlers
//! and the main loop.
//!
//! [`ByteQueue`] is the plain single-producer/single-consumer ring.
//! [`SharedByteQueue`] wraps it in an [`embassy_sync`] blocking mutex so it can
//! live in a `static` and be touched from several execution contexts; every
//! operation runs inside a critical section, which also makes the outbound
//! queue safe with two producers (main loop and CAN interrupt).
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

//==================================================================================BYTE_QUEUE
/// Ring buffer of `N` slots. One slot stays empty to tell "full" from "empty",
/// so at most `N - 1` bytes are stored.
pub struct ByteQueue<const N: usize> {
    buf: [u8; N],
    write: usize,
    read: usize,
}

impl<const N: usize> ByteQueue<N> {
    /// Rejects rings without room for one byte at compile time.
    const HOLDS_A_BYTE: () = assert!(N >= 2, "ByteQueue needs at least two slots");

    /// Empty queue.
    pub const fn new() -> Self {
        let () = Self::HOLDS_A_BYTE;
        Self {
            buf: [0; N],
            write: 0,
            read: 0,
        }
    }

    /// Maximum number of bytes the queue holds at once.
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    pub fn is_empty(&self) -> bool {
        self.write == self.read
    }

    pub fn is_full(&self) -> bool {
        (self.write + 1) % N == self.read
    }

    /// Number of stored bytes.
    pub fn len(&self) -> usize {
        (self.write + N - self.read) % N
    }

    /// Free slots left.
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Append `byte`. Returns `false` and drops the byte when the queue is full.
    pub fn push(&mut self, byte: u8) -> bool {
        let next = (self.write + 1) % N;
        if next == self.read {
            return false;
        }
        self.buf[self.write] = byte;
        self.write = next;
        true
    }

    /// Remove and return the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buf[self.read];
        self.read = (self.read + 1) % N;
        Some(byte)
    }

    /// Oldest byte, left in place.
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.read])
        }
    }

    pub fn clear(&mut self) {
        self.write = 0;
        self.read = 0;
    }

    /// Append every byte of `bytes` or none of them.
    pub fn push_all(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.free() {
            return false;
        }
        for &byte in bytes {
            self.push(byte);
        }
        true
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================================================SHARED_BYTE_QUEUE
/// [`ByteQueue`] usable through `&self` from any execution context.
pub struct SharedByteQueue<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<ByteQueue<N>>>,
}

impl<const N: usize> SharedByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ByteQueue::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ByteQueue<N>) -> R) -> R {
        self.inner.lock(|queue| f(&mut queue.borrow_mut()))
    }

    pub fn push(&self, byte: u8) -> bool {
        self.with(|queue| queue.push(byte))
    }

    /// All-or-nothing append; a record never lands half-written.
    pub fn push_all(&self, bytes: &[u8]) -> bool {
        self.with(|queue| queue.push_all(bytes))
    }

    /// Append as many leading bytes of `bytes` as fit. Returns the count accepted.
    pub fn push_partial(&self, bytes: &[u8]) -> usize {
        self.with(|queue| bytes.iter().take_while(|&&byte| queue.push(byte)).count())
    }

    pub fn pop(&self) -> Option<u8> {
        self.with(|queue| queue.pop())
    }

    pub fn peek(&self) -> Option<u8> {
        self.with(|queue| queue.peek())
    }

    pub fn clear(&self) {
        self.with(|queue| queue.clear())
    }

    pub fn len(&self) -> usize {
        self.with(|queue| queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|queue| queue.is_empty())
    }

    /// Copy up to `out.len()` of the oldest bytes without removing them.
    pub fn peek_into(&self, out: &mut [u8]) -> usize {
        self.with(|queue| {
            let count = queue.len().min(out.len());
            for (i, slot) in out.iter_mut().take(count).enumerate() {
                *slot = queue.buf[(queue.read + i) % N];
            }
            count
        })
    }

    /// Drop the `count` oldest bytes (bounded by the stored length).
    pub fn discard(&self, count: usize) {
        self.with(|queue| {
            let count = count.min(queue.len());
            queue.read = (queue.read + count) % N;
        })
    }
}

impl<const N: usize> Default for SharedByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
