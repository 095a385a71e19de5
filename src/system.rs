use crate::{
    address,
    cache::RequestStatus,
    config::{self, AddressPolicy, Config},
    controller::{CacheController, Request, RequestKind, RequesterInputs, RequesterOutputs, State},
    dram::{BackingStore, MainMemory, SeedPattern, StoreResponse},
    word,
};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("address {addr:#x} does not fit into {width} bits")]
    AddressOutOfRange { addr: address, width: u32 },
    #[error("read and write enable asserted together (address {addr:#x})")]
    ConflictingEnables { addr: address },
    #[error("{request} did not complete within {cycles} cycles")]
    Timeout { request: Request, cycles: u64 },
    #[error("cache controller is busy ({state})")]
    Busy { state: State },
    #[error(transparent)]
    Config(#[from] config::Error),
}

/// Outcome of a request driven to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Completion {
    /// Data returned by a read.
    pub read_data: Option<word>,
    /// Ticks from acceptance of the request until ready was asserted, inclusive.
    pub cycles: u64,
    pub status: RequestStatus,
}

/// A cache controller wired to a backing store.
///
/// Only the requester-facing interface is exposed for driving the system.
#[derive(Debug)]
pub struct CacheSystem<M = MainMemory> {
    controller: CacheController,
    store: M,
    /// Store outputs registered on the previous tick.
    store_response: StoreResponse,
    cycle: u64,
}

impl CacheSystem<MainMemory> {
    pub fn new(config: Config) -> Result<Self, Error> {
        Self::seeded(config, SeedPattern::Zero)
    }

    pub fn seeded(config: Config, pattern: SeedPattern) -> Result<Self, Error> {
        config.validate()?;
        let store = MainMemory::seeded(&config, pattern);
        Self::with_store(config, store)
    }
}

impl<M> CacheSystem<M>
where
    M: BackingStore,
{
    pub fn with_store(config: Config, store: M) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            controller: CacheController::new(config),
            store,
            store_response: StoreResponse::default(),
            cycle: 0,
        })
    }

    #[must_use]
    pub fn controller(&self) -> &CacheController {
        &self.controller
    }

    #[must_use]
    pub fn store(&self) -> &M {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut M {
        &mut self.store
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        self.controller.config()
    }

    #[must_use]
    pub fn stats(&self) -> &stats::Stats {
        self.controller.stats()
    }

    /// Number of ticks simulated so far.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Applies the address policy and truncates write data to the data width.
    pub fn sanitize(&self, request: Request) -> Result<Request, Error> {
        let config = self.config();
        let mut addr = request.addr;
        if addr & !config.address_mask() != 0 {
            match config.address_policy {
                AddressPolicy::Reject => {
                    return Err(Error::AddressOutOfRange {
                        addr,
                        width: config.address_width,
                    });
                }
                AddressPolicy::Wrap => {
                    log::warn!(
                        "address {:#x} wrapped to {} bits",
                        addr,
                        config.address_width
                    );
                    addr &= config.address_mask();
                }
            }
        }
        let kind = match request.kind {
            RequestKind::Read => RequestKind::Read,
            RequestKind::Write(data) => RequestKind::Write(data & config.data_mask()),
        };
        Ok(Request { addr, kind })
    }

    /// Advance the whole system by one clock tick.
    ///
    /// # Errors
    /// A request presented while the controller is idle is validated first.
    /// If it is rejected, the tick is not simulated.
    pub fn cycle(&mut self, inputs: &RequesterInputs) -> Result<RequesterOutputs, Error> {
        let request = inputs.request()?;
        self.tick(false, request)
    }

    /// Advance the whole system by one clock tick with reset asserted or not.
    pub fn tick(
        &mut self,
        reset: bool,
        request: Option<Request>,
    ) -> Result<RequesterOutputs, Error> {
        let request = match request {
            Some(request) if !reset && self.controller.state() == State::IDLE => {
                Some(self.sanitize(request)?)
            }
            _ => None,
        };
        Ok(self.step(reset, request))
    }

    fn step(&mut self, reset: bool, request: Option<Request>) -> RequesterOutputs {
        // both sides sample the values registered on the previous tick
        let registered = self.controller.store_request().copied();
        let outputs = self.controller.cycle(reset, request, self.store_response);
        let store_request = self.controller.drive(registered);
        self.store_response = self.store.cycle(store_request.as_ref());
        self.cycle += 1;
        outputs
    }

    /// Assert reset for a single tick.
    ///
    /// Any request in flight is abandoned without asserting ready.
    /// A store write already presented to the backing store still lands.
    pub fn reset(&mut self) {
        log::debug!("cache system: reset at cycle {}", self.cycle);
        self.step(true, None);
    }

    /// Idle for the given number of ticks.
    pub fn idle(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.step(false, None);
        }
    }

    pub fn read(&mut self, addr: address) -> Result<Completion, Error> {
        self.execute(Request::read(addr))
    }

    pub fn write(&mut self, addr: address, data: word) -> Result<Completion, Error> {
        self.execute(Request::write(addr, data))
    }

    /// Issues a request and ticks until ready is asserted.
    ///
    /// The request is held until the controller accepts it, so it may be
    /// issued while the previous request is still in `COMPLETE`.
    pub fn execute(&mut self, request: Request) -> Result<Completion, Error> {
        let state = self.controller.state();
        if !matches!(state, State::IDLE | State::COMPLETE) {
            return Err(Error::Busy { state });
        }
        let request = self.sanitize(request)?;
        let max_cycles = self.config().max_cycles_per_request;

        let mut accepted = false;
        let mut cycles = 0;
        loop {
            let was_idle = self.controller.state() == State::IDLE;
            let outputs = self.step(false, (!accepted).then_some(request));
            accepted |= was_idle;
            if accepted {
                cycles += 1;
            }
            if accepted && outputs.ready {
                let status = self
                    .controller
                    .last_status()
                    .expect("completed request has a status");
                log::debug!(
                    "cache system: {} completed after {} cycles ({:?})",
                    request,
                    cycles,
                    status
                );
                return Ok(Completion {
                    read_data: (!request.is_write()).then_some(outputs.read_data),
                    cycles,
                    status,
                });
            }
            if cycles >= max_cycles {
                return Err(Error::Timeout { request, cycles });
            }
        }
    }
}
