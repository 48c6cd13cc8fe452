use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Whether a migration is currently applied to the database.
///
/// Persisted in the tracking table as an integer: `0` for [Status::Inactive], `1` for [Status::Active].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not yet applied, or rolled back.
    Inactive = 0,
    /// Currently applied.
    Active = 1,
}

impl Status {
    /// The value stored in the tracking table's `status` column.
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for Status {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Inactive),
            1 => Ok(Status::Active),
            other => Err(Error::InvalidStatus(other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Inactive => f.write_str("Inactive"),
            Status::Active => f.write_str("Active"),
        }
    }
}

/// Which half of a migration pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// One numbered, named, reversible schema change backed by an up file and a down file.
///
/// The number comes from the file system and is the ordering key; it is not the
/// tracking table's surrogate `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub(crate) number: u64,
    pub(crate) name: String,
    pub(crate) up_path: Option<PathBuf>,
    pub(crate) down_path: Option<PathBuf>,
    pub(crate) status: Status,
}

impl Migration {
    pub(crate) fn new(number: u64, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            up_path: None,
            down_path: None,
            status: Status::Inactive,
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of the forward SQL body. `None` only while the catalog is still scanning.
    pub fn up_path(&self) -> Option<&Path> {
        self.up_path.as_deref()
    }

    /// Location of the backward SQL body. `None` only while the catalog is still scanning.
    pub fn down_path(&self) -> Option<&Path> {
        self.down_path.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// A migration is valid when it has a non-zero number, a name, and both halves of its pair.
    pub fn is_valid(&self) -> bool {
        self.number != 0 && !self.name.is_empty() && self.up_path.is_some() && self.down_path.is_some()
    }

    /// Like [Migration::is_valid], but reports which rule was broken.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        let path = self
            .up_path
            .clone()
            .or_else(|| self.down_path.clone())
            .unwrap_or_default();
        if self.number == 0 {
            return Err(Error::ZeroMigrationNumber(path));
        }
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidMigrationPair(path))
        }
    }

    pub(crate) fn path(&self, direction: Direction) -> Option<&Path> {
        match direction {
            Direction::Up => self.up_path(),
            Direction::Down => self.down_path(),
        }
    }
}
