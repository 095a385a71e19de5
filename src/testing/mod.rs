use crate::{config::Config, dram::SeedPattern, system::CacheSystem};

static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        env_logger::builder().is_test(true).init();
    });
}

/// Reference configuration with `memory[i] = i * 10`.
#[must_use]
pub fn reference_system() -> CacheSystem {
    init_logging();
    CacheSystem::seeded(Config::default(), SeedPattern::reference())
        .expect("reference config is valid")
}
