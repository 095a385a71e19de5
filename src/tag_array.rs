use crate::{cache, config::Config, word};
use itertools::Itertools;

/// Tag array.
///
/// Holds `num_sets x num_ways` lines in total, stored set by set,
/// together with one approximate LRU counter per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagArray {
    lines: Vec<cache::Line>,
    lru: Vec<u8>,
    num_sets: usize,
    num_ways: usize,
    lru_max: u8,
}

impl TagArray {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let num_lines = config.total_lines();
        let mut tag_array = Self {
            lines: vec![cache::Line::default(); num_lines],
            lru: vec![0; num_lines],
            num_sets: config.num_sets,
            num_ways: config.num_ways,
            lru_max: config.lru_max(),
        };
        tag_array.reset_lru();
        tag_array
    }

    #[inline]
    fn idx(&self, set_index: usize, way: usize) -> usize {
        debug_assert!(set_index < self.num_sets, "set index out of bounds");
        debug_assert!(way < self.num_ways, "way out of bounds");
        set_index * self.num_ways + way
    }

    /// Startup LRU pattern: way `i` starts with counter `i`.
    fn reset_lru(&mut self) {
        for (i, counter) in self.lru.iter_mut().enumerate() {
            *counter = (i % self.num_ways) as u8;
        }
    }

    /// Invalidates all lines and restores the startup LRU pattern.
    ///
    /// Line contents are left in place.
    pub fn invalidate(&mut self) {
        for line in &mut self.lines {
            line.invalidate();
        }
        self.reset_lru();
    }

    /// Probes a set for a valid line holding `tag`.
    ///
    /// Ways are scanned in order and the last matching way wins.
    #[must_use]
    pub fn probe(&self, set_index: usize, tag: u64) -> Option<usize> {
        let mut hit = None;
        for way in 0..self.num_ways {
            let line = &self.lines[self.idx(set_index, way)];
            log::trace!(
                "tag_array::probe(set={}, tag={:#x}) => checking way {} ({})",
                set_index,
                tag,
                way,
                line
            );
            if line.matches(tag) {
                hit = Some(way);
            }
        }
        hit
    }

    /// Selects the way to replace on a fill.
    ///
    /// The last invalid way wins. If every way is valid, the last way whose
    /// LRU counter is zero is chosen. If no counter is zero, way 0 is chosen.
    #[must_use]
    pub fn victim(&self, set_index: usize) -> usize {
        let mut invalid_way = None;
        let mut lru_way = None;
        for way in 0..self.num_ways {
            let idx = self.idx(set_index, way);
            if self.lines[idx].is_invalid() {
                invalid_way = Some(way);
            } else if self.lru[idx] == 0 {
                lru_way = Some(way);
            }
        }
        let victim = invalid_way.or(lru_way).unwrap_or(0);
        log::trace!(
            "tag_array::victim(set={}) => invalid={:?} lru={:?} victim={}",
            set_index,
            invalid_way,
            lru_way,
            victim
        );
        victim
    }

    /// Marks `way` as most recently used.
    ///
    /// Every other way of the set with a non-zero counter ages by one.
    pub fn touch(&mut self, set_index: usize, way: usize) {
        for other in 0..self.num_ways {
            let idx = self.idx(set_index, other);
            if other == way {
                self.lru[idx] = self.lru_max;
            } else if self.lru[idx] > 0 {
                self.lru[idx] -= 1;
            }
        }
    }

    /// Overwrites the data of a resident line in place.
    pub fn write(&mut self, set_index: usize, way: usize, data: word) {
        let idx = self.idx(set_index, way);
        debug_assert!(self.lines[idx].is_valid(), "write to invalid line");
        self.lines[idx].data = data;
    }

    /// Installs a line into `way` and marks it most recently used.
    ///
    /// # Returns
    /// The line that was replaced, if it was valid.
    pub fn fill(&mut self, set_index: usize, way: usize, tag: u64, data: word) -> Option<cache::Line> {
        let idx = self.idx(set_index, way);
        let evicted = self.lines[idx].is_valid().then(|| self.lines[idx].clone());
        self.lines[idx].allocate(tag, data);
        self.touch(set_index, way);
        evicted
    }

    #[must_use]
    pub fn line(&self, set_index: usize, way: usize) -> &cache::Line {
        &self.lines[self.idx(set_index, way)]
    }

    #[must_use]
    pub fn set(&self, set_index: usize) -> &[cache::Line] {
        let start = self.idx(set_index, 0);
        &self.lines[start..start + self.num_ways]
    }

    #[must_use]
    pub fn lru(&self, set_index: usize) -> &[u8] {
        let start = self.idx(set_index, 0);
        &self.lru[start..start + self.num_ways]
    }

    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    #[must_use]
    pub fn num_ways(&self) -> usize {
        self.num_ways
    }

    /// Number of valid lines in the whole array.
    #[must_use]
    pub fn num_valid(&self) -> usize {
        self.lines.iter().filter(|line| line.is_valid()).count()
    }

    /// Formats a single set for logging.
    #[must_use]
    pub fn describe_set(&self, set_index: usize) -> String {
        self.set(set_index)
            .iter()
            .zip(self.lru(set_index))
            .enumerate()
            .map(|(way, (line, lru))| {
                if line.is_valid() {
                    format!("{way}:[tag={:#x} lru={lru}]", line.tag)
                } else {
                    format!("{way}:[- lru={lru}]")
                }
            })
            .join(" ")
    }
}
