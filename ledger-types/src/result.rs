//! Transaction execution results.

use {
    crate::{
        address::Address,
        amount::Amount,
        codec::{SimpleDecoder, SimpleEncoder},
        error::{CodecError, Result},
    },
    std::fmt,
};

/// Outcome of executing one transaction.
///
/// Only [`ResultCode::Success`] and [`ResultCode::Failure`] are acceptable:
/// the transaction is kept in the block, the nonce advances and gas is charged.
/// Every other code rejects the transaction outright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    #[default]
    Success = 0x00,
    Failure = 0x01,
    Invalid = 0x20,
    InsufficientAvailable = 0x21,
    InsufficientLocked = 0x22,
    InvalidNonce = 0x23,
    InvalidType = 0x24,
    InvalidFee = 0x25,
    InvalidDelegateName = 0x26,
    InvalidDelegateBurnAddress = 0x27,
    InvalidDelegateBurnAmount = 0x28,
    InvalidDelegating = 0x29,
    InvalidVoting = 0x2a,
    InvalidUnvoting = 0x2b,
    InvalidData = 0x2c,
}

impl ResultCode {
    pub const ALL: [ResultCode; 15] = [
        ResultCode::Success,
        ResultCode::Failure,
        ResultCode::Invalid,
        ResultCode::InsufficientAvailable,
        ResultCode::InsufficientLocked,
        ResultCode::InvalidNonce,
        ResultCode::InvalidType,
        ResultCode::InvalidFee,
        ResultCode::InvalidDelegateName,
        ResultCode::InvalidDelegateBurnAddress,
        ResultCode::InvalidDelegateBurnAmount,
        ResultCode::InvalidDelegating,
        ResultCode::InvalidVoting,
        ResultCode::InvalidUnvoting,
        ResultCode::InvalidData,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.tag() == tag)
            .ok_or(CodecError::UnknownResultCode(tag))
    }

    pub const fn is_success(self) -> bool {
        matches!(self, ResultCode::Success)
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, ResultCode::Failure)
    }

    pub const fn is_acceptable(self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub const fn is_rejected(self) -> bool {
        !self.is_acceptable()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::Failure => "FAILURE",
            ResultCode::Invalid => "INVALID",
            ResultCode::InsufficientAvailable => "INSUFFICIENT_AVAILABLE",
            ResultCode::InsufficientLocked => "INSUFFICIENT_LOCKED",
            ResultCode::InvalidNonce => "INVALID_NONCE",
            ResultCode::InvalidType => "INVALID_TYPE",
            ResultCode::InvalidFee => "INVALID_FEE",
            ResultCode::InvalidDelegateName => "INVALID_DELEGATE_NAME",
            ResultCode::InvalidDelegateBurnAddress => "INVALID_DELEGATE_BURN_ADDRESS",
            ResultCode::InvalidDelegateBurnAmount => "INVALID_DELEGATE_BURN_AMOUNT",
            ResultCode::InvalidDelegating => "INVALID_DELEGATING",
            ResultCode::InvalidVoting => "INVALID_VOTING",
            ResultCode::InvalidUnvoting => "INVALID_UNVOTING",
            ResultCode::InvalidData => "INVALID_DATA",
        };
        f.write_str(name)
    }
}

/// An event emitted by contract code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogInfo {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

impl LogInfo {
    fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_bytes(self.address.as_ref())?;
        enc.write_size(self.topics.len())?;
        for topic in &self.topics {
            enc.write_bytes(topic)?;
        }
        enc.write_bytes(&self.data)
    }

    fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        let address = Address::new(dec.read_fixed("log address")?);
        let count = dec.read_size()?;
        let mut topics = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            topics.push(dec.read_fixed("log topic")?);
        }
        Ok(Self {
            address,
            topics,
            data: dec.read_bytes()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum InternalTransactionKind {
    #[default]
    Call = 0,
    Create = 1,
}

/// A value transfer or call made by contract code rather than signed by a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InternalTransaction {
    pub rejected: bool,
    pub depth: u32,
    pub index: u32,
    pub kind: InternalTransactionKind,
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub value: Amount,
    pub data: Vec<u8>,
    pub gas: u64,
    pub gas_price: Amount,
}

impl InternalTransaction {
    fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_bool(self.rejected);
        enc.write_u32(self.depth);
        enc.write_u32(self.index);
        enc.write_u8(self.kind as u8);
        enc.write_bytes(self.from.as_ref())?;
        enc.write_bytes(self.to.as_ref())?;
        enc.write_u64(self.nonce);
        enc.write_u64(self.value.nano());
        enc.write_bytes(&self.data)?;
        enc.write_u64(self.gas);
        enc.write_u64(self.gas_price.nano());
        Ok(())
    }

    fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        let rejected = dec.read_bool()?;
        let depth = dec.read_u32()?;
        let index = dec.read_u32()?;
        let kind = match dec.read_u8()? {
            0 => InternalTransactionKind::Call,
            1 => InternalTransactionKind::Create,
            other => return Err(CodecError::UnknownInternalKind(other)),
        };
        Ok(Self {
            rejected,
            depth,
            index,
            kind,
            from: Address::new(dec.read_fixed("internal from")?),
            to: Address::new(dec.read_fixed("internal to")?),
            nonce: dec.read_u64()?,
            value: Amount::from_nano(dec.read_u64()?),
            data: dec.read_bytes()?,
            gas: dec.read_u64()?,
            gas_price: Amount::from_nano(dec.read_u64()?),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionResult {
    pub code: ResultCode,
    pub gas: u64,
    pub gas_price: Amount,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    pub logs: Vec<LogInfo>,
    pub internal_transactions: Vec<InternalTransaction>,
    pub block_number: u64,
}

impl TransactionResult {
    pub fn with_code(code: ResultCode) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.code.is_acceptable()
    }

    pub fn encode(&self, enc: &mut SimpleEncoder) -> Result<()> {
        enc.write_u8(self.code.tag());
        enc.write_bytes(&self.return_data)?;
        enc.write_size(self.logs.len())?;
        for log in &self.logs {
            log.encode(enc)?;
        }
        enc.write_u64(self.gas);
        enc.write_u64(self.gas_price.nano());
        enc.write_u64(self.gas_used);
        enc.write_u64(self.block_number);
        enc.write_size(self.internal_transactions.len())?;
        for itx in &self.internal_transactions {
            itx.encode(enc)?;
        }
        Ok(())
    }

    pub fn decode(dec: &mut SimpleDecoder<'_>) -> Result<Self> {
        let code = ResultCode::from_tag(dec.read_u8()?)?;
        let return_data = dec.read_bytes()?;
        let log_count = dec.read_size()?;
        let mut logs = Vec::with_capacity(log_count.min(64));
        for _ in 0..log_count {
            logs.push(LogInfo::decode(dec)?);
        }
        let gas = dec.read_u64()?;
        let gas_price = Amount::from_nano(dec.read_u64()?);
        let gas_used = dec.read_u64()?;
        let block_number = dec.read_u64()?;
        let itx_count = dec.read_size()?;
        let mut internal_transactions = Vec::with_capacity(itx_count.min(64));
        for _ in 0..itx_count {
            internal_transactions.push(InternalTransaction::decode(dec)?);
        }
        Ok(Self {
            code,
            gas,
            gas_price,
            gas_used,
            return_data,
            logs,
            internal_transactions,
            block_number,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = SimpleEncoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes())
    }
}
