//! Sync requests sent to peers and the messages they answer with.

use {
    crate::error::{Result, SyncError},
    tessera_ledger_types::{Block, BlockHeader, BlockPart, CodecError},
};

/// Requests issued by the download loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    /// Legacy protocol: the whole block.
    GetBlock { number: u64 },
    /// Fast-sync protocol: selected parts, as a [`BlockPart`] bit mask.
    GetBlockParts { number: u64, parts: u32 },
}

impl SyncRequest {
    pub fn number(&self) -> u64 {
        match self {
            Self::GetBlock { number } | Self::GetBlockParts { number, .. } => *number,
        }
    }

    /// Parts a peer should answer with.
    pub fn requested_parts(&self) -> Vec<BlockPart> {
        match self {
            Self::GetBlock { .. } => BlockPart::ALL.to_vec(),
            Self::GetBlockParts { parts, .. } => BlockPart::decode(*parts),
        }
    }
}

/// Inbound sync traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMessage {
    Block(Block),
    /// `data[i]` is the encoding of `BlockPart::decode(parts)[i]`.
    BlockParts {
        number: u64,
        parts: u32,
        data: Vec<Vec<u8>>,
    },
    /// Deprecated; ignored.
    BlockHeader(BlockHeader),
}

impl SyncMessage {
    /// Encodes the parts of `block` that `parts` selects.
    pub fn block_parts(block: &Block, parts: &[BlockPart]) -> std::result::Result<Self, CodecError> {
        let mask = BlockPart::encode(parts);
        Ok(Self::BlockParts {
            number: block.number(),
            parts: mask,
            data: block.encode_parts(&BlockPart::decode(mask))?,
        })
    }

    /// Bytes carried by a block parts payload.
    pub fn payload_size(&self) -> usize {
        match self {
            Self::BlockParts { data, .. } => data
                .iter()
                .fold(0usize, |total, part| total.saturating_add(part.len())),
            Self::Block(_) | Self::BlockHeader(_) => 0,
        }
    }
}

/// Rebuilds a block from a block parts payload.
pub(crate) fn assemble_block_parts(number: u64, parts: u32, data: &[Vec<u8>]) -> Result<Block> {
    let parts = BlockPart::decode(parts);
    if parts.len() != data.len() {
        return Err(SyncError::MalformedParts(format!(
            "{} parts but {} data items",
            parts.len(),
            data.len()
        )));
    }

    let mut header = None;
    let mut transactions = None;
    let mut results = None;
    let mut votes = None;
    for (part, bytes) in parts.iter().zip(data) {
        let slot = match part {
            BlockPart::Header => &mut header,
            BlockPart::Transactions => &mut transactions,
            BlockPart::Results => &mut results,
            BlockPart::Votes => &mut votes,
        };
        *slot = Some(bytes.as_slice());
    }

    let block = Block::from_components(header, transactions, results, votes)
        .map_err(|err| SyncError::MalformedParts(err.to_string()))?;
    if block.number() != number {
        return Err(SyncError::MalformedParts(format!(
            "header number {} does not match message number {number}",
            block.number()
        )));
    }
    Ok(block)
}
