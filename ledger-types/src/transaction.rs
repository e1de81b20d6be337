//! Signed transactions.

use {
    crate::{
        address::Address,
        amount::Amount,
        codec::{SimpleDecoder, SimpleEncoder},
        error::{CodecError, Result},
    },
    solana_hash::Hash,
    solana_signature::Signature,
    std::fmt,
};

/// The kind of a transaction. Wire tags follow the ledger format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TransactionType {
    #[default]
    Transfer = 0x01,
    Delegate = 0x02,
    Vote = 0x03,
    Unvote = 0x04,
    Create = 0x05,
    Call = 0x06,
}

impl TransactionType {
    pub const ALL: [TransactionType; 6] = [
        TransactionType::Transfer,
        TransactionType::Delegate,
        TransactionType::Vote,
        TransactionType::Unvote,
        TransactionType::Create,
        TransactionType::Call,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::UnknownTransactionType(tag))
    }

    /// CALL and CREATE are executed by the VM and pay with gas instead of a fee.
    pub const fn is_vm(self) -> bool {
        matches!(self, TransactionType::Call | TransactionType::Create)
    }

    pub const fn name(self) -> &'static str {
        match self {
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Delegate => "DELEGATE",
            TransactionType::Vote => "VOTE",
            TransactionType::Unvote => "UNVOTE",
            TransactionType::Create => "CREATE",
            TransactionType::Call => "CALL",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transaction as carried in a block.
///
/// Signature verification happens before a transaction reaches the ledger, so
/// `from` is trusted here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub fee: Amount,
    pub nonce: u64,
    pub timestamp: u64,
    pub data: Vec<u8>,
    pub gas: u64,
    pub gas_price: Amount,
    pub signature: Signature,
}

impl Transaction {
    pub fn is_vm_transaction(&self) -> bool {
        self.tx_type.is_vm()
    }

    /// Encodes every field except the signature.
    pub fn encode_unsigned(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::with_capacity(self.data.len().saturating_add(96));
        enc.write_u8(self.tx_type.tag());
        enc.write_bytes(self.from.as_ref())?;
        enc.write_bytes(self.to.as_ref())?;
        enc.write_u64(self.value.nano());
        enc.write_u64(self.fee.nano());
        enc.write_u64(self.nonce);
        enc.write_u64(self.timestamp);
        enc.write_bytes(&self.data)?;
        enc.write_u64(self.gas);
        enc.write_u64(self.gas_price.nano());
        Ok(enc.into_bytes())
    }

    /// Hash of the unsigned encoding; this is what signers sign.
    pub fn hash(&self) -> Result<Hash> {
        Ok(solana_sha256_hasher::hash(&self.encode_unsigned()?))
    }

    pub fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_bytes(&self.encode_unsigned()?)?;
        enc.write_bytes(self.signature.as_ref())
    }

    pub fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        let unsigned = dec.read_bytes()?;
        let signature = Signature::from(dec.read_fixed::<64>("signature")?);

        let mut body = SimpleDecoder::new(&unsigned);
        let tx = Transaction {
            tx_type: TransactionType::from_tag(body.read_u8()?)?,
            from: Address::new(body.read_fixed("from")?),
            to: Address::new(body.read_fixed("to")?),
            value: Amount::from_nano(body.read_u64()?),
            fee: Amount::from_nano(body.read_u64()?),
            nonce: body.read_u64()?,
            timestamp: body.read_u64()?,
            data: body.read_bytes()?,
            gas: body.read_u64()?,
            gas_price: Amount::from_nano(body.read_u64()?),
            signature,
        };
        body.finish()?;
        Ok(tx)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut dec = SimpleDecoder::new(bytes);
        let tx = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(tx)
    }
}
