use cachesim::{config::AddressPolicy, requester, CacheSystem, Config, Requester, SeedPattern};
use clap::Parser;
use color_eyre::eyre;
use console::style;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// Request trace (JSON or YAML). Runs the reference scenario if omitted.
    #[arg(short = 't', long = "trace", value_name = "TRACE")]
    trace: Option<PathBuf>,
    /// Cache config (YAML)
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Override the number of sets
    #[arg(long = "sets")]
    num_sets: Option<usize>,
    /// Override the associativity
    #[arg(long = "ways")]
    num_ways: Option<usize>,
    /// Wrap out-of-range addresses instead of rejecting them
    #[arg(long = "wrap-addresses")]
    wrap_addresses: bool,
    /// Seed memory with `memory[i] = i * SCALE` (0 leaves memory zeroed)
    #[arg(long = "seed-scale", value_name = "SCALE", default_value_t = 10)]
    seed_scale: u64,
    /// Write per-request records and statistics as JSON
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, serde::Serialize)]
struct Output<'a> {
    config: &'a Config,
    records: &'a [requester::Record],
    stats: &'a stats::Stats,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();

    let level = match options.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut config = match options.config {
        Some(ref path) => Config::from_yaml(path)?,
        None => Config::default(),
    };
    if let Some(num_sets) = options.num_sets {
        config.num_sets = num_sets;
    }
    if let Some(num_ways) = options.num_ways {
        config.num_ways = num_ways;
    }
    if options.wrap_addresses {
        config.address_policy = AddressPolicy::Wrap;
    }
    log::debug!("config: {:#?}", config);

    let pattern = match options.seed_scale {
        0 => SeedPattern::Zero,
        scale => SeedPattern::Scaled(scale),
    };
    let mut system = CacheSystem::seeded(config.clone(), pattern)?;

    let requester = match options.trace {
        Some(ref path) => Requester::from_path(path)?,
        None => Requester::new(requester::reference_scenario()),
    };
    let records = requester.run(&mut system)?;

    for record in &records {
        let Some(completion) = record.completion else {
            println!("[{:>6}] {:?}", record.cycle, record.command);
            continue;
        };
        let status = match completion.status {
            cachesim::cache::RequestStatus::HIT => style("HIT ").green(),
            cachesim::cache::RequestStatus::MISS => style("MISS").yellow(),
        };
        let data = completion
            .read_data
            .map(|data| format!(" => {data:#x}"))
            .unwrap_or_default();
        println!(
            "[{:>6}] {} {:?} ({} cycles){}",
            record.cycle, status, record.command, completion.cycles, data
        );
    }

    let stats = system.stats();
    println!(
        "\n{} {} requests in {} cycles: {} hits, {} misses, {} evictions",
        style("DONE").bold(),
        stats.sim.completed,
        system.cycle_count(),
        stats.cache.hits(),
        stats.cache.misses(),
        stats.cache.evictions,
    );
    println!(
        "store traffic: {} requests ({} reads, {} writes)",
        stats.memory.total(),
        stats.memory.reads,
        stats.memory.writes,
    );
    if let Some(hit_rate) = stats.cache.hit_rate() {
        println!("hit rate: {:.2}%", hit_rate * 100.0);
    }

    if let Some(ref path) = options.output {
        let writer = utils::fs::open_writable(path)?;
        serde_json::to_writer_pretty(
            writer,
            &Output {
                config: &config,
                records: &records,
                stats,
            },
        )?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
