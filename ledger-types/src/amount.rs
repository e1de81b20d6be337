//! Token amounts in nano units.

use {
    crate::error::ArithmeticError,
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Nano units per whole token.
pub const NANO_PER_UNIT: u64 = 1_000_000_000;

/// A non-negative token amount.
///
/// All arithmetic is checked; callers decide how an overflow surfaces.
#[derive(
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const ONE: Amount = Amount(1);

    pub const fn from_nano(nano: u64) -> Self {
        Self(nano)
    }

    /// Whole tokens, saturating at the representable maximum.
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(NANO_PER_UNIT))
    }

    pub const fn nano(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(ArithmeticError::Underflow)
    }

    pub fn checked_mul(self, factor: u64) -> Result<Amount, ArithmeticError> {
        self.0
            .checked_mul(factor)
            .map(Amount)
            .ok_or(ArithmeticError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nano", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}
