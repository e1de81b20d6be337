//! Protocol forks and the signal sets block producers put in headers.

use {
    crate::{
        codec::{SimpleDecoder, SimpleEncoder},
        error::{CodecError, Result},
    },
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Most forks a single header may signal.
pub const MAX_PENDING_FORKS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fork {
    UniformDistribution,
    VirtualMachine,
    VotingPrecompiledUpgrade,
}

impl Fork {
    pub const ALL: [Fork; 3] = [
        Fork::UniformDistribution,
        Fork::VirtualMachine,
        Fork::VotingPrecompiledUpgrade,
    ];

    pub const fn id(self) -> u16 {
        match self {
            Fork::UniformDistribution => 1,
            Fork::VirtualMachine => 2,
            Fork::VotingPrecompiledUpgrade => 3,
        }
    }

    pub fn from_id(id: u16) -> Option<Fork> {
        Self::ALL.into_iter().find(|f| f.id() == id)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Fork::UniformDistribution => "UNIFORM_DISTRIBUTION",
            Fork::VirtualMachine => "VIRTUAL_MACHINE",
            Fork::VotingPrecompiledUpgrade => "VOTING_PRECOMPILED_UPGRADE",
        }
    }

    /// Default number of signaling blocks needed within the window.
    pub const fn blocks_required(self) -> u64 {
        1_500
    }

    /// Default window size.
    pub const fn blocks_to_check(self) -> u64 {
        2_000
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fork that became effective at a given height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkActivation {
    pub fork: Fork,
    pub effective_from: u64,
}

/// The set of fork ids signaled by one block header.
///
/// Ids unknown to this node are kept so that re-encoding is lossless.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForkSignalSet {
    ids: Vec<u16>,
}

impl ForkSignalSet {
    pub fn of(forks: &[Fork]) -> Result<Self> {
        Self::from_ids(forks.iter().map(|f| f.id()).collect())
    }

    pub fn from_ids(ids: Vec<u16>) -> Result<Self> {
        if ids.len() > MAX_PENDING_FORKS {
            return Err(CodecError::TooManyForks(ids.len()));
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, fork: Fork) -> bool {
        self.ids.contains(&fork.id())
    }

    pub fn ids(&self) -> &[u16] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = SimpleEncoder::with_capacity(self.ids.len().saturating_mul(2).saturating_add(1));
        // from_ids caps the length at MAX_PENDING_FORKS
        enc.write_u8(self.ids.len() as u8);
        for id in &self.ids {
            enc.write_u16(*id);
        }
        enc.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut dec = SimpleDecoder::new(bytes);
        let count = usize::from(dec.read_u8()?);
        if count > MAX_PENDING_FORKS {
            return Err(CodecError::TooManyForks(count));
        }
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(dec.read_u16()?);
        }
        dec.finish()?;
        Ok(Self { ids })
    }
}
