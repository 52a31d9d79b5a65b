//! Data models for CIDR expansion.
//!
//! This module contains the address, mask and CIDR types the enumerator
//! works on, plus the small policy types shared with the configuration.

use crate::error::{CidrFormatError, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// A fixed-width IP address, ordered numerically.
///
/// The octets are read as a big-endian unsigned integer, so the derived
/// ordering within one family is numeric ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Address {
    /// Address width in bits.
    pub fn width(&self) -> u8 {
        match self {
            Address::V4(_) => 32,
            Address::V6(_) => 128,
        }
    }

    /// Returns the next address, carrying across octet boundaries.
    ///
    /// Returns `None` past the all-ones address instead of wrapping to zero.
    pub fn increment(&self) -> Option<Self> {
        match *self {
            Address::V4(octets) => increment_octets(octets).map(Address::V4),
            Address::V6(octets) => increment_octets(octets).map(Address::V6),
        }
    }

    /// Applies `mask` with a bitwise AND, giving the network address.
    pub fn masked(&self, mask: &NetworkMask) -> Self {
        match *self {
            Address::V4(octets) => Address::V4(map_octets(octets, |i, o| o & mask.octet(i))),
            Address::V6(octets) => Address::V6(map_octets(octets, |i, o| o & mask.octet(i))),
        }
    }

    /// Sets every host bit, giving the broadcast address.
    fn with_host_bits(&self, mask: &NetworkMask) -> Self {
        match *self {
            Address::V4(octets) => Address::V4(map_octets(octets, |i, o| o | !mask.octet(i))),
            Address::V6(octets) => Address::V6(map_octets(octets, |i, o| o | !mask.octet(i))),
        }
    }
}

fn increment_octets<const N: usize>(mut octets: [u8; N]) -> Option<[u8; N]> {
    for octet in octets.iter_mut().rev() {
        let (next, carry) = octet.overflowing_add(1);
        *octet = next;
        if !carry {
            return Some(octets);
        }
    }
    None
}

fn map_octets<const N: usize>(mut octets: [u8; N], f: impl Fn(usize, u8) -> u8) -> [u8; N] {
    for (i, octet) in octets.iter_mut().enumerate() {
        *octet = f(i, *octet);
    }
    octets
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::V4(v4.octets()),
            IpAddr::V6(v6) => Address::V6(v6.octets()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Address::V4(octets) => write!(f, "{}", Ipv4Addr::from(octets)),
            Address::V6(octets) => write!(f, "{}", Ipv6Addr::from(octets)),
        }
    }
}

/// Network mask derived from a prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkMask {
    prefix: u8,
    width: u8,
}

impl NetworkMask {
    /// Create a mask; `prefix` must not exceed `width`.
    pub fn new(prefix: u8, width: u8) -> Self {
        debug_assert!(prefix <= width);
        Self { prefix, width }
    }

    /// Number of host bits left after the prefix.
    pub fn host_bits(&self) -> u8 {
        self.width - self.prefix
    }

    /// Mask bits of octet `index` (0 is the most significant octet).
    pub fn octet(&self, index: usize) -> u8 {
        let start = index * 8;
        let prefix = self.prefix as usize;
        if prefix >= start + 8 {
            0xFF
        } else if prefix <= start {
            0x00
        } else {
            0xFFu8 << (8 - (prefix - start))
        }
    }
}

/// A parsed `address/prefix-length` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr {
    base: Address,
    mask: NetworkMask,
}

impl Cidr {
    /// Network (first) address of the block.
    pub fn base(&self) -> Address {
        self.base
    }

    /// Broadcast (last) address of the block.
    pub fn last(&self) -> Address {
        self.base.with_host_bits(&self.mask)
    }

    pub fn prefix(&self) -> u8 {
        self.mask.prefix
    }

    /// Number of addresses in the block, or `None` when it exceeds `u128`
    /// (only `::/0`).
    pub fn size(&self) -> Option<u128> {
        1u128.checked_shl(u32::from(self.mask.host_bits()))
    }

    /// Whether `address` lies inside this block.
    pub fn contains(&self, address: &Address) -> bool {
        address.width() == self.base.width() && address.masked(&self.mask) == self.base
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidCidrFormat {
            input: s.to_string(),
            reason,
        };

        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| invalid(CidrFormatError::MissingPrefix))?;
        let ip: IpAddr = addr
            .parse()
            .map_err(|e| invalid(CidrFormatError::BadAddress(e)))?;
        let address = Address::from(ip);
        let prefix = parse_prefix(prefix, address.width()).map_err(invalid)?;

        let mask = NetworkMask::new(prefix, address.width());
        Ok(Cidr {
            base: address.masked(&mask),
            mask,
        })
    }
}

/// Parse a decimal prefix length. Signs and whitespace are rejected;
/// leading zeros are accepted (`/08` is `/8`).
fn parse_prefix(text: &str, max: u8) -> std::result::Result<u8, CidrFormatError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CidrFormatError::BadPrefix(text.to_string()));
    }

    let prefix: u32 = text
        .parse()
        .map_err(|_| CidrFormatError::BadPrefix(text.to_string()))?;
    if prefix > u32::from(max) {
        return Err(CidrFormatError::PrefixOutOfRange { prefix, max });
    }

    Ok(prefix as u8)
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix())
    }
}

/// What to do with the successful blocks when some blocks failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Discard everything and fail the run.
    #[default]
    Strict,
    /// Keep the successful blocks and report a partial result.
    BestEffort,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Strict => write!(f, "strict"),
            ErrorPolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// Upper bound on the number of addresses a single block may expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLimit(pub u64);

impl BlockLimit {
    /// No limit.
    pub const UNLIMITED: BlockLimit = BlockLimit(0);

    /// Whether a block of `size` addresses may be expanded.
    pub fn allows(&self, size: Option<u128>) -> bool {
        match (self.0, size) {
            (0, _) => true,
            (limit, Some(size)) => size <= u128::from(limit),
            (_, None) => false,
        }
    }
}
