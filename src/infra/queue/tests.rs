//! Tests for the byte rings.
use super::*;

#[test]
/// N - 1 pushes succeed and come back in FIFO order, then pop fails.
fn test_fifo_order_up_to_capacity() {
    let mut queue: ByteQueue<8> = ByteQueue::new();
    assert_eq!(queue.capacity(), 7);

    for byte in 0..7u8 {
        assert!(queue.push(byte));
    }
    assert!(queue.is_full());

    for expected in 0..7u8 {
        assert_eq!(queue.pop(), Some(expected));
    }
    assert_eq!(queue.pop(), None);
    assert!(queue.is_empty());
}

#[test]
/// Pushing into a full queue reports failure and keeps the stored bytes.
fn test_push_when_full_preserves_contents() {
    let mut queue: ByteQueue<4> = ByteQueue::new();
    assert!(queue.push(b'a'));
    assert!(queue.push(b'b'));
    assert!(queue.push(b'c'));

    assert!(!queue.push(b'x'));
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.pop(), Some(b'a'));
    assert_eq!(queue.pop(), Some(b'b'));
    assert_eq!(queue.pop(), Some(b'c'));
    assert_eq!(queue.pop(), None);
}

#[test]
/// Cursors wrap around the end of the storage without losing order.
fn test_wraparound() {
    let mut queue: ByteQueue<5> = ByteQueue::new();
    for round in 0..10u8 {
        assert!(queue.push(round));
        assert!(queue.push(round.wrapping_add(100)));
        assert_eq!(queue.pop(), Some(round));
        assert_eq!(queue.pop(), Some(round.wrapping_add(100)));
    }
    assert!(queue.is_empty());
}

#[test]
/// Peek leaves the byte in place; clear drops everything.
fn test_peek_and_clear() {
    let mut queue: ByteQueue<16> = ByteQueue::new();
    assert_eq!(queue.peek(), None);
    queue.push(0x42);
    queue.push(0x43);
    assert_eq!(queue.peek(), Some(0x42));
    assert_eq!(queue.len(), 2);

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.peek(), None);
}

#[test]
/// Records either fit entirely or are refused.
fn test_push_all_is_all_or_nothing() {
    let mut queue: ByteQueue<6> = ByteQueue::new();
    assert!(queue.push_all(b"abc"));
    assert!(!queue.push_all(b"xyz"));
    assert_eq!(queue.len(), 3);
    assert!(queue.push_all(b"de"));
    assert!(queue.is_full());
}

#[test]
/// Shared wrapper: partial push, peek window and discard.
fn test_shared_queue_window() {
    let queue: SharedByteQueue<6> = SharedByteQueue::new();
    assert_eq!(queue.push_partial(b"1234567"), 5);
    assert_eq!(queue.len(), 5);

    let mut window = [0u8; 3];
    assert_eq!(queue.peek_into(&mut window), 3);
    assert_eq!(&window, b"123");

    queue.discard(2);
    assert_eq!(queue.peek(), Some(b'3'));
    queue.discard(10);
    assert!(queue.is_empty());
}

#[test]
/// Two slots is the smallest ring: it holds exactly one byte.
fn test_smallest_queue() {
    let mut queue: ByteQueue<2> = ByteQueue::new();
    assert_eq!(queue.capacity(), 1);
    assert!(queue.push(b'a'));
    assert!(queue.is_full());
    assert!(!queue.push(b'b'));
    assert_eq!(queue.pop(), Some(b'a'));
    assert!(queue.push(b'c'));
    assert_eq!(queue.len(), 1);
}
