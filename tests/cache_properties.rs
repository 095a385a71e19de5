use cachesim::{
    addrdec::AddressTranslation,
    cache::RequestStatus,
    controller::{Request, RequesterInputs, State},
    dram::BackingStore,
    testing, CacheSystem, Config, SeedPattern,
};
use color_eyre::eyre;
use pretty_assertions_sorted as diff;

fn system() -> CacheSystem {
    testing::reference_system()
}

/// Four addresses mapping to set 4 with tags 0 to 3, plus a fifth tag.
const A: u64 = 0x0010;
const B: u64 = 0x0110;
const C: u64 = 0x0210;
const D: u64 = 0x0310;
const E: u64 = 0x0410;

#[test]
fn miss_then_hit_timing() -> eyre::Result<()> {
    let mut system = system();
    let miss = system.read(0x1234)?;
    assert_eq!(miss.status, RequestStatus::MISS);
    assert_eq!(miss.cycles, 6);
    assert_eq!(miss.read_data, Some(0x1234 * 10));
    assert!(system.controller().is_cached(0x1234));

    let hit = system.read(0x1234)?;
    assert_eq!(hit.status, RequestStatus::HIT);
    assert_eq!(hit.cycles, 3);
    assert_eq!(hit.read_data, miss.read_data);
    Ok(())
}

#[test]
fn write_timing() -> eyre::Result<()> {
    let mut system = system();
    let write_miss = system.write(0x0040, 1)?;
    assert_eq!(write_miss.status, RequestStatus::MISS);
    assert_eq!(write_miss.cycles, 5);
    assert_eq!(write_miss.read_data, None);

    system.read(0x0040)?;
    let write_hit = system.write(0x0040, 2)?;
    assert_eq!(write_hit.status, RequestStatus::HIT);
    assert_eq!(write_hit.cycles, 4);
    assert_eq!(system.store().peek(0x0040), 2);

    // the write hit leaves the store idle for the next request
    let read = system.read(0x0040)?;
    assert_eq!((read.status, read.cycles), (RequestStatus::HIT, 3));
    assert_eq!(read.read_data, Some(2));
    let write_miss = system.write(0x0044, 3)?;
    assert_eq!((write_miss.status, write_miss.cycles), (RequestStatus::MISS, 5));
    assert_eq!(system.stats().memory.writes, 3);
    Ok(())
}

#[test]
fn write_through_consistency() -> eyre::Result<()> {
    let mut system = system();
    // make half of the addresses resident first
    for addr in (0..0x200).step_by(8) {
        system.read(addr)?;
    }
    for (i, addr) in (0..0x200).step_by(4).enumerate() {
        let value = 0xC0DE_0000 + i as u64;
        system.write(addr, value)?;
        let read = system.read(addr)?;
        assert_eq!(read.read_data, Some(value), "read after write of {addr:#x}");
        assert_eq!(system.store().peek(addr), value, "store at {addr:#x}");
    }
    Ok(())
}

#[test]
fn write_hit_serves_new_value_from_cache() -> eyre::Result<()> {
    let mut system = system();
    system.read(0x0100)?;
    system.write(0x0100, 0xABCD)?;
    let read = system.read(0x0100)?;
    assert_eq!(read.status, RequestStatus::HIT);
    assert_eq!(read.cycles, 3);
    assert_eq!(read.read_data, Some(0xABCD));
    assert_eq!(system.store().peek(0x0100), 0xABCD);
    Ok(())
}

#[test]
fn four_way_associativity() -> eyre::Result<()> {
    let mut system = system();
    let set = system.controller().translation().set_index(A);
    for addr in [A, B, C, D] {
        assert_eq!(system.controller().translation().set_index(addr), set);
        assert_eq!(system.read(addr)?.status, RequestStatus::MISS);
    }
    for addr in [A, B, C, D] {
        let read = system.read(addr)?;
        assert_eq!(read.status, RequestStatus::HIT, "{addr:#x}");
        assert_eq!(read.read_data, Some(addr * 10));
    }
    assert_eq!(system.stats().cache.evictions, 0);
    Ok(())
}

#[test]
fn lru_eviction() -> eyre::Result<()> {
    let mut system = system();
    for addr in [A, B, C, D] {
        system.read(addr)?;
    }
    assert_eq!(system.read(E)?.status, RequestStatus::MISS);
    assert_eq!(system.stats().cache.evictions, 1);
    assert!(!system.controller().is_cached(A));
    for addr in [B, C, D, E] {
        assert!(system.controller().is_cached(addr), "{addr:#x}");
    }

    for addr in [B, C, D] {
        assert_eq!(system.read(addr)?.status, RequestStatus::HIT, "{addr:#x}");
    }
    assert_eq!(system.read(A)?.status, RequestStatus::MISS);
    // E is now the least recently used
    assert!(!system.controller().is_cached(E));
    Ok(())
}

#[test]
fn hit_refreshes_recency() -> eyre::Result<()> {
    let mut system = system();
    for addr in [A, B, C, D] {
        system.read(addr)?;
    }
    // touching A makes B the oldest
    assert_eq!(system.read(A)?.status, RequestStatus::HIT);
    system.read(E)?;
    assert!(system.controller().is_cached(A));
    assert!(!system.controller().is_cached(B));
    Ok(())
}

#[test]
fn write_miss_does_not_allocate() -> eyre::Result<()> {
    let mut system = system();
    system.read(A)?;
    let set = system.controller().translation().set_index(B);
    let lines_before = system.controller().tag_array().set(set).to_vec();
    let lru_before = system.controller().tag_array().lru(set).to_vec();

    let write = system.write(B, 0x55)?;
    assert_eq!(write.status, RequestStatus::MISS);

    diff::assert_eq!(system.controller().tag_array().set(set), lines_before.as_slice());
    diff::assert_eq!(system.controller().tag_array().lru(set), lru_before.as_slice());
    assert!(!system.controller().is_cached(B));
    assert_eq!(system.store().peek(B), 0x55);
    assert_eq!(system.stats().memory.writes, 1);
    Ok(())
}

#[test]
fn reset_clears_cache() -> eyre::Result<()> {
    let mut system = system();
    let addrs = [0x0000, 0x0004, A, B, 0xFFFC];
    for addr in addrs {
        system.read(addr)?;
    }
    system.reset();
    assert_eq!(system.controller().tag_array().num_valid(), 0);
    for addr in addrs {
        let read = system.read(addr)?;
        assert_eq!(read.status, RequestStatus::MISS, "{addr:#x}");
        assert_eq!(read.cycles, 6);
    }
    Ok(())
}

#[test]
fn reset_abandons_in_flight_request() -> eyre::Result<()> {
    let mut system = system();
    let read = RequesterInputs::from(Request::read(0x0200));
    let idle = RequesterInputs::default();

    assert!(!system.cycle(&read)?.ready);
    assert!(!system.cycle(&idle)?.ready);
    assert!(!system.cycle(&idle)?.ready);
    assert!(!system.cycle(&idle)?.ready);
    assert_eq!(system.controller().state(), State::RAM_READ);

    system.reset();
    assert_eq!(system.controller().state(), State::IDLE);
    for _ in 0..16 {
        assert!(!system.cycle(&idle)?.ready);
    }
    assert!(!system.controller().is_cached(0x0200));
    assert_eq!(system.stats().sim.abandoned, 1);
    assert_eq!(system.stats().sim.completed, 0);

    // the system is usable again right away
    let read = system.read(0x0200)?;
    assert_eq!(read.cycles, 6);
    assert_eq!(read.read_data, Some(0x0200 * 10));
    Ok(())
}

/// Drives a read miss until the controller enters `target`.
///
/// Returns whether ready was observed on the way.
fn drive_until(system: &mut CacheSystem, addr: u64, target: State) -> eyre::Result<bool> {
    let request = RequesterInputs::from(Request::read(addr));
    let mut accepted = false;
    let mut ready = false;
    for _ in 0..16 {
        let idle = system.controller().state() == State::IDLE;
        // held until sampled in IDLE
        let inputs = if accepted {
            RequesterInputs::default()
        } else {
            request
        };
        let outputs = system.cycle(&inputs)?;
        if accepted {
            ready |= outputs.ready;
        }
        accepted |= idle;
        if accepted && system.controller().state() == target {
            return Ok(ready);
        }
    }
    eyre::bail!("controller never entered {target}")
}

#[test]
fn reset_in_every_busy_state() -> eyre::Result<()> {
    for target in [
        State::DECODE,
        State::CHECK_CACHE,
        State::UPDATE_CACHE,
        State::COMPLETE,
    ] {
        let mut system = system();
        system.read(0x0004)?;
        system.read(0x0104)?;
        let ready_before_reset = drive_until(&mut system, 0x0200, target)?;
        // ready is registered on the edge into COMPLETE
        assert_eq!(ready_before_reset, target == State::COMPLETE, "{target}");

        let outputs = system.tick(true, None)?;
        assert!(!outputs.ready, "{target}");
        assert_eq!(system.controller().state(), State::IDLE);
        for _ in 0..8 {
            assert!(!system.cycle(&RequesterInputs::default())?.ready, "{target}");
        }

        let tags = system.controller().tag_array();
        assert_eq!(tags.num_valid(), 0, "{target}");
        for set in 0..tags.num_sets() {
            diff::assert_eq!(tags.lru(set), &[0, 1, 2, 3]);
        }

        let stats = system.stats();
        assert_eq!(stats.sim.resets, 1);
        if target == State::COMPLETE {
            assert_eq!(stats.sim.completed, 3, "{target}");
            assert_eq!(stats.sim.abandoned, 0, "{target}");
        } else {
            assert_eq!(stats.sim.completed, 2, "{target}");
            assert_eq!(stats.sim.abandoned, 1, "{target}");
        }
    }
    Ok(())
}

#[test]
fn reset_lands_presented_store_write() -> eyre::Result<()> {
    let mut system = system();
    let write = RequesterInputs::from(Request::write(0x0300, 7));
    system.cycle(&write)?;
    system.cycle(&RequesterInputs::default())?;
    system.cycle(&RequesterInputs::default())?;
    assert_eq!(system.controller().state(), State::RAM_WRITE);
    // the write is registered towards the store but not yet sampled
    assert_eq!(system.store().peek(0x0300), 0x0300 * 10);

    system.reset();
    assert_eq!(system.store().peek(0x0300), 7);
    Ok(())
}

#[test]
fn reference_read_sequence() -> eyre::Result<()> {
    let mut system = system();
    for addr in [0x0000, 0x0004, 0x0008, 0x000C] {
        let read = system.read(addr)?;
        assert_eq!((read.status, read.cycles), (RequestStatus::MISS, 6));
        assert_eq!(read.read_data, Some(addr * 10));
    }
    for addr in [0x0000, 0x0004, 0x0008] {
        let read = system.read(addr)?;
        assert_eq!((read.status, read.cycles), (RequestStatus::HIT, 3));
        assert_eq!(read.read_data, Some(addr * 10));
    }
    Ok(())
}

#[test]
fn offset_bits_are_ignored() -> eyre::Result<()> {
    let mut system = system();
    system.read(0x0020)?;
    // 0x0021 shares tag and set with 0x0020, so the resident word is returned
    let read = system.read(0x0021)?;
    assert_eq!(read.status, RequestStatus::HIT);
    assert_eq!(read.read_data, Some(0x0020 * 10));
    Ok(())
}

#[test]
fn smaller_geometry() -> eyre::Result<()> {
    let config = Config {
        num_sets: 4,
        num_ways: 2,
        ..Config::default()
    };
    let mut system = CacheSystem::seeded(config, SeedPattern::reference())?;
    // set 0 with tags 0, 1, 2
    let (x, y, z) = (0x0000, 0x0010, 0x0020);
    system.read(x)?;
    system.read(y)?;
    system.read(z)?;
    assert!(!system.controller().is_cached(x));
    assert!(system.controller().is_cached(y));
    assert!(system.controller().is_cached(z));
    // x was replaced in way 1, which is now the most recently used
    diff::assert_eq!(system.controller().tag_array().lru(0), &[0, 1]);
    Ok(())
}

#[test]
fn widest_address_space() -> eyre::Result<()> {
    let config = Config {
        address_width: Config::MAX_ADDRESS_WIDTH,
        ..Config::default()
    };
    let mut system = CacheSystem::seeded(config, SeedPattern::reference())?;
    let addr = 0xFFFF_FF00;
    let read = system.read(addr)?;
    assert_eq!((read.status, read.cycles), (RequestStatus::MISS, 6));
    assert_eq!(read.read_data, Some((addr * 10) & 0xFFFF_FFFF));

    system.write(addr, 0x1234)?;
    assert_eq!(system.read(addr)?.read_data, Some(0x1234));
    assert_eq!(system.store().peek(addr), 0x1234);
    assert_eq!(system.store().num_written(), 1);
    Ok(())
}

#[test]
fn preloaded_store_contents() -> eyre::Result<()> {
    let mut system = system();
    system.store_mut().poke(0x0500, 0xFEED);
    let read = system.read(0x0500)?;
    assert_eq!(read.status, RequestStatus::MISS);
    assert_eq!(read.read_data, Some(0xFEED));
    // the cache serves the preloaded word from now on
    system.store_mut().poke(0x0500, 0);
    assert_eq!(system.read(0x0500)?.read_data, Some(0xFEED));
    Ok(())
}

#[test]
fn demo_inputs() -> eyre::Result<()> {
    use cachesim::{requester::Command, Requester};

    let demos = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos");
    let config = Config::from_yaml(demos.join("reference.yaml"))?;
    diff::assert_eq!(config, Config::default());

    let mut system = CacheSystem::seeded(config.clone(), SeedPattern::reference())?;
    let records = Requester::from_path(demos.join("lru.json"))?.run(&mut system)?;
    let last = records.last().unwrap();
    assert_eq!(last.command, Command::Read { addr: 272 });
    let completion = last.completion.unwrap();
    assert_eq!(completion.status, RequestStatus::MISS);
    assert_eq!(completion.read_data, Some(12345));
    assert_eq!(system.stats().sim.resets, 1);

    let mut system = CacheSystem::new(config)?;
    let records = Requester::from_path(demos.join("write_through.yaml"))?.run(&mut system)?;
    let reads: Vec<_> = records
        .iter()
        .filter_map(|record| record.completion?.read_data)
        .collect();
    diff::assert_eq!(reads, vec![7, 8]);
    Ok(())
}
