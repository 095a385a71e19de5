use crate::{
    address,
    addrdec::{AddressTranslation, DecodedAddress, Linear},
    cache::{AccessKind, RequestStatus},
    config::Config,
    dram::{StoreRequest, StoreResponse},
    tag_array::TagArray,
    word,
};
use serde::{Deserialize, Serialize};

/// Cache controller state.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, strum::EnumIter, strum::Display)]
pub enum State {
    /// Waiting for a request.
    #[default]
    IDLE,
    /// One-tick staging state.
    DECODE,
    /// Hit detection and victim selection.
    CHECK_CACHE,
    /// Waiting for the backing store to return a line.
    RAM_READ,
    /// Installing the fetched line.
    UPDATE_CACHE,
    /// Waiting for the backing store to accept a write.
    ///
    /// A write hit enters this state with its write already posted, so it
    /// leaves on the first tick.
    RAM_WRITE,
    /// Ready is asserted for this single tick.
    COMPLETE,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Read,
    Write(word),
}

/// A request issued by the requester.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub addr: address,
    pub kind: RequestKind,
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            RequestKind::Read => write!(f, "READ({:#06x})", self.addr),
            RequestKind::Write(data) => write!(f, "WRITE({:#06x}, {:#x})", self.addr, data),
        }
    }
}

impl Request {
    #[must_use]
    pub fn read(addr: address) -> Self {
        Self {
            addr,
            kind: RequestKind::Read,
        }
    }

    #[must_use]
    pub fn write(addr: address, data: word) -> Self {
        Self {
            addr,
            kind: RequestKind::Write(data),
        }
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self.kind, RequestKind::Write(_))
    }

    #[must_use]
    pub fn access_kind(&self) -> AccessKind {
        match self.kind {
            RequestKind::Read => AccessKind::READ,
            RequestKind::Write(_) => AccessKind::WRITE,
        }
    }
}

/// Requester-facing inputs sampled on a tick.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub struct RequesterInputs {
    pub address: address,
    pub write_data: word,
    pub read_enable: bool,
    pub write_enable: bool,
}

impl RequesterInputs {
    /// Interprets the enable signals.
    ///
    /// # Errors
    /// If read and write enable are asserted together.
    pub fn request(&self) -> Result<Option<Request>, crate::system::Error> {
        match (self.read_enable, self.write_enable) {
            (false, false) => Ok(None),
            (true, false) => Ok(Some(Request::read(self.address))),
            (false, true) => Ok(Some(Request::write(self.address, self.write_data))),
            (true, true) => Err(crate::system::Error::ConflictingEnables {
                addr: self.address,
            }),
        }
    }
}

impl From<Request> for RequesterInputs {
    fn from(request: Request) -> Self {
        match request.kind {
            RequestKind::Read => Self {
                address: request.addr,
                read_enable: true,
                ..Self::default()
            },
            RequestKind::Write(data) => Self {
                address: request.addr,
                write_data: data,
                write_enable: true,
                ..Self::default()
            },
        }
    }
}

/// Requester-facing outputs registered on a tick.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq)]
pub struct RequesterOutputs {
    /// Pulses for exactly one tick per completed request.
    pub ready: bool,
    /// Only meaningful while `ready` is asserted following a read.
    pub read_data: word,
}

/// The request owning the state machine until `COMPLETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Latched {
    request: Request,
    decoded: DecodedAddress,
    /// Way chosen for a fill on a read miss.
    victim: usize,
    status: Option<RequestStatus>,
    fetched: word,
}

/// Cache controller.
///
/// Owns the tag array and drives the backing store protocol. The state
/// register and all outputs update once per call to [`CacheController::cycle`].
#[derive(Debug)]
pub struct CacheController<T = Linear> {
    config: Config,
    translation: T,
    tag_array: TagArray,
    state: State,
    latched: Option<Latched>,
    store_request: Option<StoreRequest>,
    /// Set on the edge a write hit registers its store write.
    posted: bool,
    outputs: RequesterOutputs,
    last_status: Option<RequestStatus>,
    stats: stats::Stats,
}

impl CacheController<Linear> {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let translation = Linear::new(&config);
        Self::with_translation(config, translation)
    }
}

impl<T> CacheController<T>
where
    T: AddressTranslation,
{
    #[must_use]
    pub fn with_translation(config: Config, translation: T) -> Self {
        Self {
            tag_array: TagArray::new(&config),
            config,
            translation,
            state: State::IDLE,
            latched: None,
            store_request: None,
            posted: false,
            outputs: RequesterOutputs::default(),
            last_status: None,
            stats: stats::Stats::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn tag_array(&self) -> &TagArray {
        &self.tag_array
    }

    #[must_use]
    pub fn translation(&self) -> &T {
        &self.translation
    }

    /// Registered store-facing outputs.
    #[must_use]
    pub fn store_request(&self) -> Option<&StoreRequest> {
        self.store_request.as_ref()
    }

    /// Store write registered on the current edge by a write hit.
    ///
    /// The line already holds the new data, so the write is driven to the
    /// store on the same tick the hit is decided instead of one tick later.
    #[must_use]
    pub fn posted_write(&self) -> Option<&StoreRequest> {
        self.store_request.as_ref().filter(|_| self.posted)
    }

    /// Store request driven to the backing store on the current tick.
    ///
    /// `registered` is the store request registered before the edge.
    #[must_use]
    pub fn drive(&self, registered: Option<StoreRequest>) -> Option<StoreRequest> {
        registered.or_else(|| self.posted_write().copied())
    }

    /// Hit or miss of the most recently completed request.
    #[must_use]
    pub fn last_status(&self) -> Option<RequestStatus> {
        self.last_status
    }

    #[must_use]
    pub fn stats(&self) -> &stats::Stats {
        &self.stats
    }

    /// Returns `true` if the address is currently resident in the cache.
    #[must_use]
    pub fn is_cached(&self, addr: address) -> bool {
        let decoded = self.translation.decode(addr);
        self.tag_array
            .probe(decoded.set_index, decoded.tag)
            .is_some()
    }

    /// Advance the controller by one clock tick.
    ///
    /// `store` are the backing store outputs registered on the previous tick.
    /// `request` is only sampled while the controller is `IDLE`.
    /// Reset takes priority over everything else and abandons the latched request.
    pub fn cycle(
        &mut self,
        reset: bool,
        request: Option<Request>,
        store: StoreResponse,
    ) -> RequesterOutputs {
        self.stats.sim.cycles += 1;
        self.posted = false;
        if reset {
            self.reset();
            return self.outputs;
        }

        let prev = self.state;
        self.state = match self.state {
            State::IDLE => match request {
                Some(request) => {
                    self.latch(request);
                    State::DECODE
                }
                None => State::IDLE,
            },
            State::DECODE => State::CHECK_CACHE,
            State::CHECK_CACHE => self.check_cache(),
            State::RAM_READ => {
                if store.ready {
                    let latched = self.latched_mut();
                    latched.fetched = store.read_data;
                    self.store_request = None;
                    State::UPDATE_CACHE
                } else {
                    State::RAM_READ
                }
            }
            State::UPDATE_CACHE => self.update_cache(),
            State::RAM_WRITE => {
                if store.ready {
                    self.store_request = None;
                    self.complete(None)
                } else {
                    State::RAM_WRITE
                }
            }
            State::COMPLETE => {
                self.outputs.ready = false;
                State::IDLE
            }
        };

        if prev != self.state {
            log::trace!("cache controller: {} => {}", prev, self.state);
        }
        self.outputs
    }

    fn reset(&mut self) {
        if let Some(latched) = self.latched.take() {
            log::debug!(
                "cache controller: reset in {} abandons {}",
                self.state,
                latched.request
            );
            self.stats.sim.abandoned += 1;
        }
        log::trace!("cache controller: {} => {} (reset)", self.state, State::IDLE);
        self.stats.sim.resets += 1;
        self.state = State::IDLE;
        self.store_request = None;
        self.outputs = RequesterOutputs::default();
        self.tag_array.invalidate();
    }

    fn latched_mut(&mut self) -> &mut Latched {
        self.latched
            .as_mut()
            .expect("controller outside IDLE has a latched request")
    }

    fn latch(&mut self, request: Request) {
        let decoded = self.translation.decode(request.addr);
        log::debug!("cache controller: accepted {} ({})", request, decoded);
        self.latched = Some(Latched {
            request,
            decoded,
            victim: 0,
            status: None,
            fetched: 0,
        });
    }

    fn check_cache(&mut self) -> State {
        let mut latched = *self.latched_mut();
        let DecodedAddress { tag, set_index, .. } = latched.decoded;

        let hit_way = self.tag_array.probe(set_index, tag);
        latched.victim = self.tag_array.victim(set_index);
        let status = if hit_way.is_some() {
            RequestStatus::HIT
        } else {
            RequestStatus::MISS
        };
        latched.status = Some(status);

        log::debug!(
            "cache controller: {} => {:?} (way={:?}, victim={}) set {} [{}]",
            latched.request,
            status,
            hit_way,
            latched.victim,
            set_index,
            self.tag_array.describe_set(set_index),
        );

        let addr = latched.request.addr;
        let next = match (latched.request.kind, hit_way) {
            (RequestKind::Read, Some(way)) => {
                self.tag_array.touch(set_index, way);
                let data = self.tag_array.line(set_index, way).data;
                self.latched = Some(latched);
                return self.complete(Some(data));
            }
            (RequestKind::Write(data), Some(way)) => {
                self.tag_array.write(set_index, way, data);
                self.tag_array.touch(set_index, way);
                self.issue(StoreRequest::Write { addr, data });
                self.posted = true;
                State::RAM_WRITE
            }
            (RequestKind::Read, None) => {
                self.issue(StoreRequest::Read { addr });
                State::RAM_READ
            }
            // no write allocate
            (RequestKind::Write(data), None) => {
                self.issue(StoreRequest::Write { addr, data });
                State::RAM_WRITE
            }
        };
        self.latched = Some(latched);
        next
    }

    fn issue(&mut self, request: StoreRequest) {
        log::trace!("cache controller: issue {}", request);
        if request.is_write() {
            self.stats.memory.writes += 1;
        } else {
            self.stats.memory.reads += 1;
        }
        self.store_request = Some(request);
    }

    fn update_cache(&mut self) -> State {
        let latched = *self.latched_mut();
        let DecodedAddress { tag, set_index, .. } = latched.decoded;
        if let Some(evicted) = self
            .tag_array
            .fill(set_index, latched.victim, tag, latched.fetched)
        {
            log::debug!(
                "cache controller: set {} way {} evicts tag {:#x}",
                set_index,
                latched.victim,
                evicted.tag
            );
            self.stats.cache.evictions += 1;
        }
        self.complete(Some(latched.fetched))
    }

    /// Registers ready (and read data) and releases the latched request.
    fn complete(&mut self, read_data: Option<word>) -> State {
        let latched = self
            .latched
            .take()
            .expect("completed request was latched");
        let status = latched.status.unwrap_or(RequestStatus::MISS);
        self.stats
            .cache
            .inc(latched.request.access_kind(), status, 1);
        self.stats.sim.completed += 1;
        self.last_status = Some(status);

        self.outputs.ready = true;
        if let Some(data) = read_data {
            self.outputs.read_data = data;
        }
        State::COMPLETE
    }
}
