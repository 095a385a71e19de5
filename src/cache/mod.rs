pub mod block;

pub use block::{Line, Status};

use serde::{Deserialize, Serialize};

#[derive(Debug, strum::EnumIter, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
}

impl From<RequestStatus> for stats::cache::RequestStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::HIT => Self::HIT,
            RequestStatus::MISS => Self::MISS,
        }
    }
}

#[derive(Debug, strum::EnumIter, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKind {
    READ = 0,
    WRITE,
}

impl From<AccessKind> for stats::cache::AccessKind {
    fn from(kind: AccessKind) -> Self {
        match kind {
            AccessKind::READ => Self::READ,
            AccessKind::WRITE => Self::WRITE,
        }
    }
}
