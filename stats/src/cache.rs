use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum AccessKind {
    READ,
    WRITE,
}

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
}

pub type CacheCsvRow = ((AccessKind, RequestStatus), usize);

/// Cache access statistics.
///
/// Serialized as a sorted list of rows since JSON maps need string keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "CacheRows", from = "CacheRows")]
pub struct Cache {
    pub accesses: HashMap<(AccessKind, RequestStatus), usize>,
    /// Fills that replaced a valid line.
    pub evictions: usize,
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRows {
    pub accesses: Vec<CacheCsvRow>,
    pub evictions: usize,
}

impl From<Cache> for CacheRows {
    fn from(cache: Cache) -> Self {
        let evictions = cache.evictions;
        Self {
            accesses: cache.flatten(),
            evictions,
        }
    }
}

impl From<CacheRows> for Cache {
    fn from(rows: CacheRows) -> Self {
        let mut cache = Self::default();
        for (key, count) in rows.accesses {
            *cache.accesses.entry(key).or_insert(0) += count;
        }
        cache.evictions = rows.evictions;
        cache
    }
}

impl Cache {
    #[must_use]
    pub fn flatten(self) -> Vec<CacheCsvRow> {
        let mut flattened: Vec<_> = self.accesses.into_iter().collect();
        flattened.sort_by_key(|(access, _)| *access);
        flattened
    }
}

impl std::ops::AddAssign for Cache {
    fn add_assign(&mut self, other: Self) {
        for (k, v) in other.accesses {
            *self.accesses.entry(k).or_insert(0) += v;
        }
        self.evictions += other.evictions;
    }
}

impl Default for Cache {
    fn default() -> Self {
        let mut accesses = HashMap::new();
        for access_kind in AccessKind::iter() {
            for status in RequestStatus::iter() {
                accesses.insert((access_kind, status), 0);
            }
        }
        Self {
            accesses,
            evictions: 0,
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut accesses: Vec<_> = self
            .accesses
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|((access_kind, status), count)| {
                (format!("{access_kind:?}[{status:?}]"), count)
            })
            .collect();
        accesses.sort_by_key(|(key, _)| key.clone());

        let mut out = f.debug_struct("CacheStats");
        for (key, count) in accesses {
            out.field(&key, count);
        }
        out.field("evictions", &self.evictions);
        out.finish_non_exhaustive()
    }
}

impl Cache {
    #[must_use]
    pub fn total_accesses(&self) -> usize {
        self.accesses.values().sum()
    }

    #[must_use]
    pub fn count(&self, kind: AccessKind, status: RequestStatus) -> usize {
        self.accesses.get(&(kind, status)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        AccessKind::iter()
            .map(|kind| self.count(kind, RequestStatus::HIT))
            .sum()
    }

    #[must_use]
    pub fn misses(&self) -> usize {
        AccessKind::iter()
            .map(|kind| self.count(kind, RequestStatus::MISS))
            .sum()
    }

    /// Fraction of accesses that hit, or `None` if there were no accesses.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.total_accesses();
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.hits() as f64 / total as f64)
    }

    #[inline]
    pub fn inc(
        &mut self,
        kind: impl Into<AccessKind>,
        status: impl Into<RequestStatus>,
        count: usize,
    ) {
        *self
            .accesses
            .entry((kind.into(), status.into()))
            .or_insert(0) += count;
    }
}
