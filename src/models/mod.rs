//! Data models for prospekt.

mod flyer;

pub use flyer::{FlyerDescriptor, FlyerRecord, FlyerType, Month};
