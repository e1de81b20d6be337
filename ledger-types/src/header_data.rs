//! The free-form `data` field of a block header.
//!
//! Version `0x01` carries a size-prefixed [`ForkSignalSet`]. Anything else is
//! opaque and signals nothing.

use {
    crate::{
        codec::{SimpleDecoder, SimpleEncoder},
        error::{CodecError, Result},
        fork::ForkSignalSet,
    },
    log::debug,
};

pub const MAX_HEADER_DATA_SIZE: usize = 32;

const FORK_SIGNALS_VERSION: u8 = 0x01;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockHeaderData {
    raw: Vec<u8>,
}

impl BlockHeaderData {
    pub fn new(raw: Vec<u8>) -> Result<Self> {
        if raw.len() > MAX_HEADER_DATA_SIZE {
            return Err(CodecError::HeaderDataTooLarge(raw.len()));
        }
        Ok(Self { raw })
    }

    pub fn from_fork_signals(signals: &ForkSignalSet) -> Result<Self> {
        let mut enc = SimpleEncoder::new();
        enc.write_u8(FORK_SIGNALS_VERSION);
        enc.write_bytes(&signals.to_bytes())?;
        Self::new(enc.into_bytes())
    }

    /// Parses the fork signals. Malformed data yields an empty set.
    pub fn parse_fork_signals(&self) -> ForkSignalSet {
        if self.raw.first() != Some(&FORK_SIGNALS_VERSION) {
            return ForkSignalSet::default();
        }
        let parsed = (|| -> Result<ForkSignalSet> {
            let mut dec = SimpleDecoder::new(&self.raw);
            dec.read_u8()?;
            ForkSignalSet::from_bytes(&dec.read_bytes()?)
        })();
        parsed.unwrap_or_else(|e| {
            debug!("ignoring malformed fork signals in header data: {e}");
            ForkSignalSet::default()
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }
}
