//! identifiers shared by every component

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// seconds since the unix epoch, supplied by the host
pub type Timestamp = u64;

/// principal identifier (32 bytes)
///
/// users, system components and position slots all live in the same
/// namespace. system addresses are derived from a domain label so they can
/// never collide with a key someone holds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// the null address
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// address of a system component
    pub fn system(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballast.system.v1");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// address of the ledger slot backing a managed position
    pub fn position_slot(id: PositionId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballast.position.v1");
        hasher.update(&id.0.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// address of the collateral adapter for a pool
    pub fn collateral_adapter(pool: CollateralPoolId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballast.adapter.v1");
        hasher.update(&pool.0);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough for logs
        write!(f, "0x{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str).map_err(|e| Error::Config(format!("bad address {s}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Config(format!("address {s} is not 32 bytes")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// collateral type identifier, a right-padded 32 byte name
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollateralPoolId(pub [u8; 32]);

impl CollateralPoolId {
    /// names longer than 32 bytes are truncated
    pub fn from_name(name: &str) -> Self {
        let mut bytes = [0u8; 32];
        let len = name.len().min(32);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(bytes)
    }

    pub fn name(&self) -> String {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl fmt::Display for CollateralPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for CollateralPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollateralPoolId({})", self.name())
    }
}

impl Serialize for CollateralPoolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for CollateralPoolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_name(&s))
    }
}

/// position id issued by the position manager, starting at 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_id_name_roundtrip() {
        let id = CollateralPoolId::from_name("WXDC");
        assert_eq!(id.name(), "WXDC");
        assert_eq!(id.to_string(), "WXDC");
        assert_ne!(id, CollateralPoolId::from_name("USDT"));
    }

    #[test]
    fn test_derived_addresses_are_distinct() {
        let a = Address::position_slot(PositionId(1));
        let b = Address::position_slot(PositionId(2));
        assert_ne!(a, b);
        assert_ne!(a, Address::system("show-stopper"));
        assert!(!a.is_zero());
    }

    #[test]
    fn test_address_hex_parse() {
        let addr = Address::system("owner");
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);
        assert!("0x1234".parse::<Address>().is_err());
    }
}
