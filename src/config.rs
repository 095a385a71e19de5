use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad cache config: {0} must be a power of two (got {1})")]
    NotPowerOfTwo(&'static str, usize),
    #[error("bad cache config: data width must be one of 8, 16, 32 or 64 bits (got {0})")]
    DataWidth(u32),
    #[error("bad cache config: address width must be between 1 and 32 bits (got {0})")]
    AddressWidth(u32),
    #[error("bad cache config: no bits left for the tag ({address_width} bit address, {set_index_width} index bits, {offset_width} offset bits)")]
    NoTagBits {
        address_width: u32,
        set_index_width: u32,
        offset_width: u32,
    },
    #[error("bad cache config: at most {max} ways are supported (got {got})")]
    TooManyWays { max: usize, got: usize },
    #[error("bad cache config: max cycles per request must be non-zero")]
    ZeroTimeout,
    #[error(transparent)]
    Open(#[from] utils::fs::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// How requests with addresses wider than `address_width` are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Refuse the request.
    #[default]
    Reject,
    /// Drop the excess high-order bits.
    Wrap,
}

/// Cache system configuration.
///
/// The reference configuration is a 16 bit address, 32 bit word,
/// 64 set, 4 way cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width of a physical address in bits.
    pub address_width: u32,
    /// Width of a data word (and cache line) in bits.
    pub data_width: u32,
    /// Number of sets.
    pub num_sets: usize,
    /// Associativity.
    pub num_ways: usize,
    /// Treatment of out-of-range addresses.
    pub address_policy: AddressPolicy,
    /// Simulation timeout for a single request.
    pub max_cycles_per_request: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address_width: 16,
            data_width: 32,
            num_sets: 64,
            num_ways: 4,
            address_policy: AddressPolicy::Reject,
            max_cycles_per_request: 64,
        }
    }
}

impl Config {
    /// LRU counters are stored as `u8`.
    pub const MAX_WAYS: usize = u8::MAX as usize + 1;

    /// Widest supported physical address.
    pub const MAX_ADDRESS_WIDTH: u32 = 32;

    /// Loads and validates a YAML config file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, Error> {
        let reader = utils::fs::open_readable(path.as_ref())?;
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.num_sets.is_power_of_two() {
            return Err(Error::NotPowerOfTwo("number of sets", self.num_sets));
        }
        if !self.num_ways.is_power_of_two() {
            return Err(Error::NotPowerOfTwo("number of ways", self.num_ways));
        }
        if self.num_ways > Self::MAX_WAYS {
            return Err(Error::TooManyWays {
                max: Self::MAX_WAYS,
                got: self.num_ways,
            });
        }
        if !matches!(self.data_width, 8 | 16 | 32 | 64) {
            return Err(Error::DataWidth(self.data_width));
        }
        if !(1..=Self::MAX_ADDRESS_WIDTH).contains(&self.address_width) {
            return Err(Error::AddressWidth(self.address_width));
        }
        if self.set_index_width() + self.offset_width() >= self.address_width {
            return Err(Error::NoTagBits {
                address_width: self.address_width,
                set_index_width: self.set_index_width(),
                offset_width: self.offset_width(),
            });
        }
        if self.max_cycles_per_request == 0 {
            return Err(Error::ZeroTimeout);
        }
        Ok(())
    }

    /// Number of intra-word offset bits.
    #[inline]
    #[must_use]
    pub fn offset_width(&self) -> u32 {
        (self.data_width / 8).ilog2()
    }

    #[inline]
    #[must_use]
    pub fn set_index_width(&self) -> u32 {
        self.num_sets.ilog2()
    }

    #[inline]
    #[must_use]
    pub fn tag_width(&self) -> u32 {
        self.address_width - self.set_index_width() - self.offset_width()
    }

    /// Value a way's LRU counter takes when it becomes most recently used.
    #[inline]
    #[must_use]
    pub fn lru_max(&self) -> u8 {
        (self.num_ways - 1) as u8
    }

    #[inline]
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.num_sets * self.num_ways
    }

    /// Number of words in the backing store.
    #[inline]
    #[must_use]
    pub fn memory_words(&self) -> u64 {
        1u64 << self.address_width
    }

    #[inline]
    #[must_use]
    pub fn address_mask(&self) -> u64 {
        crate::mask(self.address_width)
    }

    #[inline]
    #[must_use]
    pub fn data_mask(&self) -> u64 {
        crate::mask(self.data_width)
    }
}
