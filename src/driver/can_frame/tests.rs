//! Tests for frame construction and the `embedded_can::Frame` view.
use super::*;
use embedded_can::Frame;

#[test]
/// Payload length sets the DLC; more than eight bytes is refused.
fn test_new_data() {
    let id = StandardId::new(0x123).unwrap();
    let frame = CanFrame::new_data(id, &[1, 2, 3]).unwrap();
    assert_eq!(frame.dlc(), 3);
    assert_eq!(frame.data(), &[1, 2, 3]);
    assert_eq!(frame.raw_data(), &[1, 2, 3, 0, 0, 0, 0, 0]);
    assert!(CanFrame::new_data(id, &[0; 9]).is_none());
}

#[test]
/// Remote frames keep their DLC but expose no payload.
fn test_new_remote() {
    let frame = CanFrame::new_remote(ExtendedId::new(0x1FFF_FFFF).unwrap(), 8).unwrap();
    assert!(frame.is_remote());
    assert!(frame.is_extended());
    assert_eq!(frame.dlc(), 8);
    assert!(frame.data().is_empty());
    assert!(CanFrame::new_remote(ExtendedId::ZERO, 9).is_none());
}

#[test]
/// Raw parts are range checked against the identifier width.
fn test_from_raw() {
    let data = [0xAA, 0xBB, 0, 0, 0, 0, 0, 0];
    let frame = CanFrame::from_raw(0x7FF, false, false, 2, data).unwrap();
    assert_eq!(frame.raw_id(), 0x7FF);
    assert_eq!(frame.data(), &[0xAA, 0xBB]);

    assert!(CanFrame::from_raw(0x800, false, false, 0, data).is_none());
    assert!(CanFrame::from_raw(0x800, true, false, 0, data).is_some());
    assert!(CanFrame::from_raw(0x2000_0000, true, false, 0, data).is_none());
    assert!(CanFrame::from_raw(0x1, false, false, 9, data).is_none());
}

#[test]
/// Generic code sees the same frame through the trait.
fn test_frame_trait() {
    fn describe<F: Frame>(frame: &F) -> (bool, bool, usize, usize) {
        (frame.is_extended(), frame.is_remote_frame(), frame.dlc(), frame.data().len())
    }

    let data = <CanFrame as Frame>::new(StandardId::new(0x10).unwrap(), &[9, 8]).unwrap();
    assert_eq!(describe(&data), (false, false, 2, 2));
    assert_eq!(Frame::id(&data), Id::Standard(StandardId::new(0x10).unwrap()));

    let remote = <CanFrame as Frame>::new_remote(ExtendedId::new(0x10).unwrap(), 4).unwrap();
    assert_eq!(describe(&remote), (true, true, 4, 0));
    assert!(<CanFrame as Frame>::new_remote(ExtendedId::new(0x10).unwrap(), 300).is_none());
}
