use crate::{address, config::Config, word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request presented to the backing store for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRequest {
    Read { addr: address },
    Write { addr: address, data: word },
}

impl StoreRequest {
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }
}

impl std::fmt::Display for StoreRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { addr } => write!(f, "READ({addr:#06x})"),
            Self::Write { addr, data } => write!(f, "WRITE({addr:#06x}, {data:#x})"),
        }
    }
}

/// Registered outputs of the backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StoreResponse {
    pub ready: bool,
    /// Only meaningful when `ready` follows a read.
    pub read_data: word,
}

/// Backing store interface consumed by the cache controller.
///
/// A request sampled on a tick is answered in the response registered on that
/// same tick, which the controller observes on the following tick.
pub trait BackingStore: std::fmt::Debug + Send + Sync + 'static {
    /// Advance the store by one clock tick.
    fn cycle(&mut self, request: Option<&StoreRequest>) -> StoreResponse;

    /// Read a word without going through the clocked interface.
    #[must_use]
    fn peek(&self, addr: address) -> word;
}

/// Initial contents of main memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedPattern {
    /// All words zero.
    #[default]
    Zero,
    /// `memory[i] = i * k`, truncated to the data width.
    Scaled(u64),
}

impl SeedPattern {
    /// The pattern the cache system is tested against: `memory[i] = i * 10`.
    #[must_use]
    pub fn reference() -> Self {
        Self::Scaled(10)
    }

    #[inline]
    #[must_use]
    pub fn value(&self, addr: address) -> word {
        match *self {
            Self::Zero => 0,
            Self::Scaled(k) => addr.wrapping_mul(k),
        }
    }
}

/// Main memory.
///
/// Single-port synchronous memory addressed by the full physical address,
/// one word per address. Only written words are stored; every other
/// address reads its seed value.
#[derive(Clone, PartialEq, Eq)]
pub struct MainMemory {
    written: HashMap<address, word>,
    pattern: SeedPattern,
    address_mask: u64,
    data_mask: u64,
}

impl std::fmt::Debug for MainMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainMemory")
            .field("pattern", &self.pattern)
            .field("written", &self.written.len())
            .field("address_mask", &format_args!("{:#x}", self.address_mask))
            .finish_non_exhaustive()
    }
}

impl MainMemory {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::seeded(config, SeedPattern::Zero)
    }

    #[must_use]
    pub fn seeded(config: &Config, pattern: SeedPattern) -> Self {
        log::debug!(
            "main memory: {} words seeded with {:?}",
            config.memory_words(),
            pattern
        );
        Self {
            written: HashMap::new(),
            pattern,
            address_mask: config.address_mask(),
            data_mask: config.data_mask(),
        }
    }

    #[inline]
    fn idx(&self, addr: address) -> address {
        addr & self.address_mask
    }

    #[inline]
    fn load(&self, addr: address) -> word {
        let idx = self.idx(addr);
        match self.written.get(&idx) {
            Some(&data) => data,
            None => self.pattern.value(idx) & self.data_mask,
        }
    }

    /// Write a word without going through the clocked interface.
    pub fn poke(&mut self, addr: address, data: word) {
        let idx = self.idx(addr);
        self.written.insert(idx, data & self.data_mask);
    }

    /// Number of addressable words.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.address_mask + 1
    }

    /// Number of words written since construction.
    #[must_use]
    pub fn num_written(&self) -> usize {
        self.written.len()
    }
}

impl BackingStore for MainMemory {
    fn cycle(&mut self, request: Option<&StoreRequest>) -> StoreResponse {
        match request {
            None => StoreResponse::default(),
            Some(StoreRequest::Read { addr }) => {
                let read_data = self.load(*addr);
                log::trace!("main memory: read {:#06x} => {:#x}", addr, read_data);
                StoreResponse {
                    ready: true,
                    read_data,
                }
            }
            Some(StoreRequest::Write { addr, data }) => {
                log::trace!("main memory: write {:#06x} <= {:#x}", addr, data);
                self.poke(*addr, *data);
                StoreResponse {
                    ready: true,
                    read_data: 0,
                }
            }
        }
    }

    #[inline]
    fn peek(&self, addr: address) -> word {
        self.load(addr)
    }
}
