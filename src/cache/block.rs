use crate::word;

#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub enum Status {
    #[default]
    INVALID = 0,
    VALID,
}

/// A cache line holding a single word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Line {
    pub tag: u64,
    pub status: Status,
    pub data: word,
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("tag", &format_args!("{:#x}", self.tag))
            .field("status", &self.status)
            .field("data", &format_args!("{:#x}", self.data))
            .finish()
    }
}

impl Line {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.status == Status::VALID
    }

    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.status == Status::INVALID
    }

    /// Returns `true` if this line is valid and holds `tag`.
    #[inline]
    #[must_use]
    pub fn matches(&self, tag: u64) -> bool {
        self.is_valid() && self.tag == tag
    }

    pub fn allocate(&mut self, tag: u64, data: word) {
        self.tag = tag;
        self.data = data;
        self.status = Status::VALID;
    }

    pub fn invalidate(&mut self) {
        self.status = Status::INVALID;
    }
}
