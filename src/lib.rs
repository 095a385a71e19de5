#![allow(
    clippy::upper_case_acronyms,
    non_camel_case_types,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

pub mod addrdec;
pub mod cache;
pub mod config;
pub mod controller;
pub mod dram;
pub mod requester;
pub mod system;
pub mod tag_array;

pub mod testing;

pub use config::Config;
pub use controller::{CacheController, Request, RequestKind, RequesterInputs, RequesterOutputs};
pub use dram::{BackingStore, MainMemory, SeedPattern};
pub use requester::{Command, Requester};
pub use system::{CacheSystem, Completion};

/// A physical address.
///
/// Only the low `address_width` bits are meaningful.
pub type address = u64;

/// A data word.
///
/// Only the low `data_width` bits are meaningful.
pub type word = u64;

/// Returns a mask with the low `width` bits set.
#[inline]
#[must_use]
pub fn mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
