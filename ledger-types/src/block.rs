//! Blocks, headers, votes and block parts.

use {
    crate::{
        address::Address,
        codec::{SimpleDecoder, SimpleEncoder},
        error::{CodecError, Result},
        header_data::BlockHeaderData,
        result::TransactionResult,
        transaction::Transaction,
    },
    solana_hash::Hash,
    solana_pubkey::Pubkey,
    solana_signature::Signature,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub coinbase: Address,
    pub parent_hash: Hash,
    pub timestamp: u64,
    pub transactions_root: Hash,
    pub results_root: Hash,
    pub state_root: Hash,
    pub data: Vec<u8>,
}

impl BlockHeader {
    pub fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_u64(self.number);
        enc.write_bytes(self.coinbase.as_ref())?;
        enc.write_bytes(self.parent_hash.as_ref())?;
        enc.write_u64(self.timestamp);
        enc.write_bytes(self.transactions_root.as_ref())?;
        enc.write_bytes(self.results_root.as_ref())?;
        enc.write_bytes(self.state_root.as_ref())?;
        enc.write_bytes(&self.data)
    }

    pub fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        Ok(Self {
            number: dec.read_u64()?,
            coinbase: Address::new(dec.read_fixed("coinbase")?),
            parent_hash: Hash::new_from_array(dec.read_fixed("parent hash")?),
            timestamp: dec.read_u64()?,
            transactions_root: Hash::new_from_array(dec.read_fixed("transactions root")?),
            results_root: Hash::new_from_array(dec.read_fixed("results root")?),
            state_root: Hash::new_from_array(dec.read_fixed("state root")?),
            data: dec.read_bytes()?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::with_capacity(self.data.len().saturating_add(192));
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut dec = SimpleDecoder::new(bytes);
        let header = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(header)
    }

    /// Identity of the block: hash of the encoded header.
    pub fn hash(&self) -> Result<Hash> {
        Ok(solana_sha256_hasher::hash(&self.to_bytes()?))
    }

    /// Header data as written by the producer. Oversized data decodes as empty.
    pub fn decoded_data(&self) -> BlockHeaderData {
        BlockHeaderData::new(self.data.clone()).unwrap_or_default()
    }
}

/// A validator's signature over a block hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockVote {
    pub validator: Pubkey,
    pub signature: Signature,
}

impl BlockVote {
    pub fn verify(&self, block_hash: &Hash) -> bool {
        self.signature
            .verify(self.validator.as_ref(), block_hash.as_ref())
    }

    fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_bytes(self.validator.as_ref())?;
        enc.write_bytes(self.signature.as_ref())
    }

    fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        Ok(Self {
            validator: Pubkey::new_from_array(dec.read_fixed("validator")?),
            signature: Signature::from(dec.read_fixed::<64>("vote signature")?),
        })
    }
}

/// A separately transferable section of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BlockPart {
    Header = 1 << 0,
    Transactions = 1 << 1,
    Results = 1 << 2,
    Votes = 1 << 3,
}

impl BlockPart {
    pub const ALL: [BlockPart; 4] = [
        BlockPart::Header,
        BlockPart::Transactions,
        BlockPart::Results,
        BlockPart::Votes,
    ];

    /// Bit mask of a part list, as carried by part requests.
    pub fn encode(parts: &[BlockPart]) -> u32 {
        parts.iter().fold(0u32, |mask, p| mask | u32::from(*p as u8))
    }

    /// Parts present in a bit mask, in canonical order.
    pub fn decode(mask: u32) -> Vec<BlockPart> {
        Self::ALL
            .into_iter()
            .filter(|p| mask & u32::from(*p as u8) != 0)
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub results: Vec<TransactionResult>,
    pub votes: Vec<BlockVote>,
}

impl Block {
    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn parent_hash(&self) -> &Hash {
        &self.header.parent_hash
    }

    pub fn hash(&self) -> Result<Hash> {
        self.header.hash()
    }

    pub fn encode_transactions(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        enc.write_size(self.transactions.len())?;
        for tx in &self.transactions {
            tx.encode(&mut enc)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_transactions(bytes: &[u8]) -> Result<Vec<Transaction>> {
        let mut dec = SimpleDecoder::new(bytes);
        let count = dec.read_size()?;
        let mut txs = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            txs.push(Transaction::decode(&mut dec)?);
        }
        dec.finish()?;
        Ok(txs)
    }

    pub fn encode_results(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        enc.write_size(self.results.len())?;
        for result in &self.results {
            result.encode(&mut enc)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_results(bytes: &[u8]) -> Result<Vec<TransactionResult>> {
        let mut dec = SimpleDecoder::new(bytes);
        let count = dec.read_size()?;
        let mut results = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            results.push(TransactionResult::decode(&mut dec)?);
        }
        dec.finish()?;
        Ok(results)
    }

    pub fn encode_votes(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        enc.write_size(self.votes.len())?;
        for vote in &self.votes {
            vote.encode(&mut enc)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn decode_votes(bytes: &[u8]) -> Result<Vec<BlockVote>> {
        let mut dec = SimpleDecoder::new(bytes);
        let count = dec.read_size()?;
        let mut votes = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            votes.push(BlockVote::decode(&mut dec)?);
        }
        dec.finish()?;
        Ok(votes)
    }

    /// Encodes the requested parts, one buffer per part in the given order.
    pub fn encode_parts(&self, parts: &[BlockPart]) -> Result<Vec<Vec<u8>>> {
        parts
            .iter()
            .map(|part| match part {
                BlockPart::Header => self.header.to_bytes(),
                BlockPart::Transactions => self.encode_transactions(),
                BlockPart::Results => self.encode_results(),
                BlockPart::Votes => self.encode_votes(),
            })
            .collect()
    }

    /// Reassembles a block from its encoded parts. Missing optional parts
    /// become empty lists; the header is mandatory.
    pub fn from_components(
        header: Option<&[u8]>,
        transactions: Option<&[u8]>,
        results: Option<&[u8]>,
        votes: Option<&[u8]>,
    ) -> Result<Self> {
        let header = header.ok_or(CodecError::MissingComponent("header"))?;
        Ok(Self {
            header: BlockHeader::from_bytes(header)?,
            transactions: transactions
                .map(Self::decode_transactions)
                .transpose()?
                .unwrap_or_default(),
            results: results
                .map(Self::decode_results)
                .transpose()?
                .unwrap_or_default(),
            votes: votes
                .map(Self::decode_votes)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        for part in self.encode_parts(&BlockPart::ALL)? {
            enc.write_bytes(&part)?;
        }
        Ok(enc.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut dec = SimpleDecoder::new(bytes);
        let header = dec.read_bytes()?;
        let transactions = dec.read_bytes()?;
        let results = dec.read_bytes()?;
        let votes = dec.read_bytes()?;
        dec.finish()?;
        Self::from_components(
            Some(&header),
            Some(&transactions),
            Some(&results),
            Some(&votes),
        )
    }
}

/// Root committing to an ordered list of transactions.
pub fn transactions_root(transactions: &[Transaction]) -> Result<Hash> {
    let hashes = transactions
        .iter()
        .map(Transaction::hash)
        .collect::<Result<Vec<_>>>()?;
    Ok(root_of(&hashes))
}

/// Root committing to an ordered list of results.
pub fn results_root(results: &[TransactionResult]) -> Result<Hash> {
    let hashes = results
        .iter()
        .map(|r| r.to_bytes().map(|b| solana_sha256_hasher::hash(&b)))
        .collect::<Result<Vec<_>>>()?;
    Ok(root_of(&hashes))
}

fn root_of(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::default();
    }
    let leaves: Vec<&[u8]> = hashes.iter().map(|h| h.as_ref()).collect();
    solana_sha256_hasher::hashv(&leaves)
}
