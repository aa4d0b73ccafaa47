//! Error types for the tactical layer.
//!
//! Missing or stale data is never an error here; these cover explicit API misuse only.

use std::path::PathBuf;

use thiserror::Error;

use crate::coordination::AmbushId;
use crate::squad::SquadId;

#[derive(Debug, Error, PartialEq)]
pub enum TacticsError {
    #[error("squad {squad} is full ({capacity} members)")]
    SquadFull { squad: SquadId, capacity: usize },
    #[error("squad {0} does not exist")]
    UnknownSquad(SquadId),
    #[error("ambush {0} does not exist")]
    UnknownAmbush(AmbushId),
    #[error("squad {squad} already takes part in ambush {ambush}")]
    AlreadyInAmbush { squad: SquadId, ambush: AmbushId },
    #[error("squad {0} has no live members")]
    InertSquad(SquadId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
