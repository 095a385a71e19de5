use crate::{address, config::Config};

/// An address split into its cache fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: usize,
    /// Intra-word offset. Ignored by the cache, which works on whole words.
    pub offset: u64,
}

impl std::fmt::Display for DecodedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tag={:#x} set={} offset={}",
            self.tag, self.set_index, self.offset
        )
    }
}

/// Address translation.
///
/// The controller divides the address of a request into three fields:
/// the tag field, the set index field and the offset field.
/// The set index locates the set that might hold the requested word,
/// the tag disambiguates which block a way of that set currently holds.
pub trait AddressTranslation: std::fmt::Debug + Send + Sync + 'static {
    /// Compute cache line tag for an address.
    #[must_use]
    fn tag(&self, addr: address) -> u64;

    /// Compute set index for an address.
    #[must_use]
    fn set_index(&self, addr: address) -> usize;

    /// Compute intra-word offset for an address.
    #[must_use]
    fn offset(&self, addr: address) -> u64;

    #[must_use]
    fn decode(&self, addr: address) -> DecodedAddress {
        DecodedAddress {
            tag: self.tag(addr),
            set_index: self.set_index(addr),
            offset: self.offset(addr),
        }
    }
}

/// Plain bit slicing: `| tag | set index | offset |`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Linear {
    offset_width: u32,
    set_index_width: u32,
    tag_width: u32,
}

impl Linear {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            offset_width: config.offset_width(),
            set_index_width: config.set_index_width(),
            tag_width: config.tag_width(),
        }
    }
}

impl AddressTranslation for Linear {
    #[inline]
    fn tag(&self, addr: address) -> u64 {
        (addr >> (self.offset_width + self.set_index_width)) & crate::mask(self.tag_width)
    }

    #[inline]
    fn set_index(&self, addr: address) -> usize {
        ((addr >> self.offset_width) & crate::mask(self.set_index_width)) as usize
    }

    #[inline]
    fn offset(&self, addr: address) -> u64 {
        addr & crate::mask(self.offset_width)
    }
}
