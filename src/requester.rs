use crate::{
    address,
    controller::Request,
    dram::BackingStore,
    system::{self, CacheSystem, Completion},
    word,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Open(#[from] utils::fs::Error),
    #[error("failed to parse json commands: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse yaml commands: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("command {index} ({command:?}) failed")]
    Command {
        index: usize,
        command: Command,
        source: system::Error,
    },
}

/// A single step of a request trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Command {
    Read { addr: address },
    Write { addr: address, data: word },
    /// Assert reset for one tick.
    Reset,
    /// Leave the inputs idle for a number of ticks.
    Idle { cycles: u64 },
}

impl Command {
    #[must_use]
    pub fn request(&self) -> Option<Request> {
        match *self {
            Self::Read { addr } => Some(Request::read(addr)),
            Self::Write { addr, data } => Some(Request::write(addr, data)),
            Self::Reset | Self::Idle { .. } => None,
        }
    }
}

/// Parses a JSON or YAML (by file extension) list of commands.
pub fn parse_commands(path: impl AsRef<Path>) -> Result<Vec<Command>, Error> {
    let path = path.as_ref();
    let reader = utils::fs::open_readable(path)?;
    let commands = if utils::fs::is_yaml(path) {
        serde_yaml::from_reader(reader)?
    } else {
        serde_json::from_reader(reader)?
    };
    Ok(commands)
}

/// Reads of `0x0000`, `0x0004`, `0x0008` and `0x000C`, followed by
/// the first three of them again.
#[must_use]
pub fn reference_scenario() -> Vec<Command> {
    let addrs = [0x0000, 0x0004, 0x0008, 0x000C];
    addrs
        .iter()
        .chain(&addrs[..3])
        .map(|&addr| Command::Read { addr })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub command: Command,
    /// Start cycle of the command.
    pub cycle: u64,
    pub completion: Option<Completion>,
}

/// Issues one request at a time and waits for its completion
/// before issuing the next.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    commands: Vec<Command>,
}

impl Requester {
    #[must_use]
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Ok(Self::new(parse_commands(path)?))
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn run<M>(&self, system: &mut CacheSystem<M>) -> Result<Vec<Record>, Error>
    where
        M: BackingStore,
    {
        let mut records = Vec::with_capacity(self.commands.len());
        for (index, command) in self.commands.iter().copied().enumerate() {
            let cycle = system.cycle_count();
            let completion = match command {
                Command::Reset => {
                    system.reset();
                    None
                }
                Command::Idle { cycles } => {
                    system.idle(cycles);
                    None
                }
                Command::Read { .. } | Command::Write { .. } => {
                    let request = command.request().expect("read or write");
                    let completion = system.execute(request).map_err(|source| Error::Command {
                        index,
                        command,
                        source,
                    })?;
                    Some(completion)
                }
            };
            log::info!("[{:>6}] {:?} => {:?}", cycle, command, completion);
            records.push(Record {
                command,
                cycle,
                completion,
            });
        }
        Ok(records)
    }
}
