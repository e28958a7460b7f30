#[macro_use]
extern crate bitfield;

pub mod audio;
pub mod capture;
pub mod cdc;
pub mod class;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod hid;
pub mod render;
pub mod report;
pub mod settings;
pub mod stream;
pub mod usb;
