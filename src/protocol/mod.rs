//! # Mercury Wire Protocols
//!
//! Frame codec plus the typed operation sets of the two protocol families.

pub mod frame;
pub mod mercury206;
pub mod mercury236;

pub use mercury206::{Mercury206Codec, Mercury206Handle};
pub use mercury236::{AccessLevel, Mercury236Codec, Mercury236Handle};
