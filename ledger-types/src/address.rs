//! 20-byte account addresses.

use {
    crate::error::CodecError,
    borsh::{BorshDeserialize, BorshSerialize},
    serde::{de, Deserialize, Deserializer, Serialize, Serializer},
    std::{fmt, str::FromStr},
};

/// An account address.
///
/// Precompiled contracts live at small addresses (the value stored in the low
/// eight bytes with all other bytes zero), see [`Address::from_low_u64`].
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Address([u8; Address::LEN]);

impl Address {
    pub const LEN: usize = 20;

    /// The burn address delegate registrations must target.
    pub const ZERO: Address = Address([0u8; Address::LEN]);

    pub const fn new(bytes: [u8; Address::LEN]) -> Self {
        Self(bytes)
    }

    pub const fn from_low_u64(value: u64) -> Self {
        let b = value.to_be_bytes();
        Self([
            0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])
    }

    /// Returns the numeric value when the address is a small address.
    pub fn to_low_u64(&self) -> Option<u64> {
        let (high, low) = self.0.split_at(Address::LEN - 8);
        if high.iter().any(|b| *b != 0) {
            return None;
        }
        let mut be = [0u8; 8];
        be.copy_from_slice(low);
        Some(u64::from_be_bytes(be))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; Address::LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; Address::LEN] {
        self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; Address::LEN]> for Address {
    fn from(bytes: [u8; Address::LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = CodecError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; Address::LEN] =
            bytes.try_into().map_err(|_| CodecError::InvalidLength {
                field: "address",
                expected: Address::LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
