//! `slcan-bridge` library: the core of a USB-to-CAN adapter firmware in a
//! `no_std` environment. The crate exposes the bxCAN controller driver, the
//! inter-context byte queues and text codec, the activity indicator, and the
//! slcan protocol engine with its persisted settings.
#![cfg_attr(not(test), no_std)]
//==================================================================================
/// Boot-time configuration (reported versions, blink length, handshake bounds).
pub mod config;
/// CAN controller driver: frames, bit timing, register seam, state machine
/// and interrupt pipeline.
pub mod driver;
/// Failure types of the driver, the codec, the settings store and commands.
pub mod error;
/// Activity LEDs and timestamp source sharing one compare timer.
pub mod indicator;
/// Byte queues and the slcan text codec.
pub mod infra;
/// slcan command set, settings persistence and the command loop.
pub mod protocol;
//==================================================================================
