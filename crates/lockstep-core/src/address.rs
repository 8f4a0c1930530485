//! Address encoding for Lockstep.
//!
//! Addresses use Bech32m encoding ([BIP-350]) over a 20-byte payload with
//! one of two human-readable prefixes:
//! - Accounts: `lock1...`
//! - Validator operators: `lockvaloper1...`
//!
//! [BIP-350]: https://github.com/bitcoin/bips/blob/master/bip-0350.mediawiki

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{ACCOUNT_HRP, ADDRESS_LEN, VALIDATOR_HRP};
use crate::error::AddressError;

/// Generator coefficients of the BCH code behind Bech32 (BIP-173).
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];

/// Residue a valid Bech32m string leaves in the checksum (BIP-350).
const BECH32M_RESIDUE: u32 = 0x2bc8_30a3;

/// Symbol alphabet; index = 5-bit value.
const ALPHABET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

const CHECKSUM_LEN: usize = 6;

/// Which prefix an address carries.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub enum AddressKind {
    Account,
    Validator,
}

impl AddressKind {
    pub fn hrp(&self) -> &'static str {
        match self {
            AddressKind::Account => ACCOUNT_HRP,
            AddressKind::Validator => VALIDATOR_HRP,
        }
    }

    pub fn from_hrp(hrp: &str) -> Result<Self, AddressError> {
        match hrp {
            ACCOUNT_HRP => Ok(AddressKind::Account),
            VALIDATOR_HRP => Ok(AddressKind::Validator),
            _ => Err(AddressError::UnknownPrefix(hrp.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AddressKind::Account => "account",
            AddressKind::Validator => "validator",
        }
    }
}

/// A 20-byte address tagged with its kind.
///
/// Ordering is by kind, then bytes, which gives maps keyed by address a
/// deterministic iteration order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct Address {
    kind: AddressKind,
    bytes: [u8; ADDRESS_LEN],
}

impl Address {
    pub fn account(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self { kind: AddressKind::Account, bytes }
    }

    pub fn validator(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self { kind: AddressKind::Validator, bytes }
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.bytes
    }

    /// Bech32m string form, e.g. `lock1...`.
    pub fn encode(&self) -> String {
        let hrp = self.kind.hrp();
        let data = bytes_to_symbols(&self.bytes);
        let mut sum = Checksum::for_hrp(hrp);
        data.iter().for_each(|&sym| sum.feed(sym));

        let mut out = format!("{hrp}1");
        out.extend(
            data.iter()
                .chain(sum.finish().iter())
                .map(|&sym| char::from(ALPHABET[usize::from(sym)])),
        );
        out
    }

    /// Decode a Bech32m address string of either kind. Upper-case input is
    /// accepted; mixed case is not.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.bytes().any(|b| b.is_ascii_lowercase()) && s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(AddressError::MixedCase);
        }

        let lower = s.to_ascii_lowercase();
        let (hrp, data) = lower.rsplit_once('1').ok_or(AddressError::MissingSeparator)?;
        if hrp.is_empty() {
            return Err(AddressError::InvalidHrp);
        }
        if data.len() < CHECKSUM_LEN {
            return Err(AddressError::InvalidLength);
        }
        let kind = AddressKind::from_hrp(hrp)?;

        let symbols = data
            .chars()
            .map(|c| symbol_of(c).ok_or(AddressError::InvalidCharacter(c)))
            .collect::<Result<Vec<u8>, _>>()?;
        let mut sum = Checksum::for_hrp(hrp);
        symbols.iter().for_each(|&sym| sum.feed(sym));
        if !sum.is_valid() {
            return Err(AddressError::InvalidChecksum);
        }

        let payload = symbols_to_bytes(&symbols[..symbols.len() - CHECKSUM_LEN])
            .ok_or(AddressError::InvalidPadding)?;
        let bytes: [u8; ADDRESS_LEN] =
            payload.try_into().map_err(|_| AddressError::InvalidLength)?;
        Ok(Self { kind, bytes })
    }

    /// Decode and require an account address.
    pub fn parse_account(s: &str) -> Result<Self, AddressError> {
        Self::decode(s)?.expect_kind(AddressKind::Account)
    }

    /// Decode and require a validator operator address.
    pub fn parse_validator(s: &str) -> Result<Self, AddressError> {
        Self::decode(s)?.expect_kind(AddressKind::Validator)
    }

    fn expect_kind(self, expected: AddressKind) -> Result<Self, AddressError> {
        if self.kind != expected {
            return Err(AddressError::WrongKind {
                expected: expected.name(),
                got: self.kind.name(),
            });
        }
        Ok(self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

// --- Bech32m codec ---

fn symbol_of(c: char) -> Option<u8> {
    let byte = u8::try_from(c).ok()?;
    ALPHABET.iter().position(|&a| a == byte).and_then(|i| u8::try_from(i).ok())
}

/// Running BCH checksum over 5-bit symbols.
struct Checksum(u32);

impl Checksum {
    /// Checksum state after the expanded human-readable part.
    fn for_hrp(hrp: &str) -> Self {
        let mut sum = Checksum(1);
        hrp.bytes().for_each(|b| sum.feed(b >> 5));
        sum.feed(0);
        hrp.bytes().for_each(|b| sum.feed(b & 0x1f));
        sum
    }

    fn feed(&mut self, symbol: u8) {
        let top = self.0 >> 25;
        self.0 = ((self.0 & 0x01ff_ffff) << 5) ^ u32::from(symbol);
        for (bit, g) in GENERATOR.iter().enumerate() {
            if (top >> bit) & 1 == 1 {
                self.0 ^= g;
            }
        }
    }

    /// The six checksum symbols that make the fed data valid.
    fn finish(mut self) -> [u8; CHECKSUM_LEN] {
        for _ in 0..CHECKSUM_LEN {
            self.feed(0);
        }
        let residue = self.0 ^ BECH32M_RESIDUE;
        std::array::from_fn(|i| ((residue >> (5 * (CHECKSUM_LEN - 1 - i))) & 0x1f) as u8)
    }

    fn is_valid(&self) -> bool {
        self.0 == BECH32M_RESIDUE
    }
}

/// Split bytes into 5-bit symbols, zero-padding the last one.
fn bytes_to_symbols(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity((bytes.len() * 8).div_ceil(5));
    let (mut buf, mut held) = (0u32, 0u32);
    for &b in bytes {
        buf = ((buf << 8) | u32::from(b)) & 0xfff;
        held += 8;
        while held >= 5 {
            held -= 5;
            out.push(((buf >> held) & 0x1f) as u8);
        }
    }
    if held > 0 {
        out.push(((buf << (5 - held)) & 0x1f) as u8);
    }
    out
}

/// Join 5-bit symbols back into bytes. Fails unless the leftover bits are
/// fewer than five and all zero.
fn symbols_to_bytes(symbols: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(symbols.len() * 5 / 8);
    let (mut buf, mut held) = (0u32, 0u32);
    for &sym in symbols {
        buf = ((buf << 5) | u32::from(sym)) & 0xfff;
        held += 5;
        if held >= 8 {
            held -= 8;
            out.push(((buf >> held) & 0xff) as u8);
        }
    }
    (held < 5 && buf & ((1 << held) - 1) == 0).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Address {
        Address::account([0xAA; ADDRESS_LEN])
    }

    #[test]
    fn account_prefix() {
        assert!(sample().encode().starts_with("lock1"));
    }

    #[test]
    fn validator_prefix() {
        let v = Address::validator([0xAA; ADDRESS_LEN]);
        assert!(v.encode().starts_with("lockvaloper1"));
        assert_ne!(v.encode(), sample().encode());
    }

    #[test]
    fn encode_length() {
        // "lock" + "1" + 32 data chars + 6 checksum
        assert_eq!(sample().encode().len(), 43);
    }

    #[test]
    fn decode_roundtrip_both_kinds() {
        for addr in [sample(), Address::validator([0x01; ADDRESS_LEN])] {
            assert_eq!(Address::decode(&addr.encode()).unwrap(), addr);
        }
    }

    #[test]
    fn decode_accepts_uppercase() {
        let upper = sample().encode().to_ascii_uppercase();
        assert_eq!(Address::decode(&upper).unwrap(), sample());
    }

    #[test]
    fn decode_rejects_mixed_case() {
        let mut s = sample().encode();
        s.replace_range(0..1, "L");
        assert_eq!(Address::decode(&s).unwrap_err(), AddressError::MixedCase);
    }

    #[test]
    fn decode_rejects_bad_checksum() {
        let mut s = sample().encode();
        let last = s.pop().unwrap();
        s.push(if last == 'q' { 'p' } else { 'q' });
        assert_eq!(Address::decode(&s).unwrap_err(), AddressError::InvalidChecksum);
    }

    #[test]
    fn decode_rejects_unknown_prefix() {
        assert!(matches!(
            Address::decode("cosmos1qqqqqqqqqqqqqq"),
            Err(AddressError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_separator_and_empty() {
        assert_eq!(Address::decode("lockqqqq").unwrap_err(), AddressError::MissingSeparator);
        assert_eq!(Address::decode("").unwrap_err(), AddressError::Empty);
    }

    #[test]
    fn decode_rejects_invalid_character() {
        let s = format!("lock1{}", "b".repeat(38));
        assert_eq!(Address::decode(&s).unwrap_err(), AddressError::InvalidCharacter('b'));
    }

    #[test]
    fn parse_account_rejects_validator() {
        let v = Address::validator([0x02; ADDRESS_LEN]).encode();
        assert_eq!(
            Address::parse_account(&v).unwrap_err(),
            AddressError::WrongKind { expected: "account", got: "validator" }
        );
        assert!(Address::parse_validator(&v).is_ok());
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, format!("\"{}\"", sample().encode()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn ordering_is_deterministic() {
        let a = Address::account([1; ADDRESS_LEN]);
        let b = Address::account([2; ADDRESS_LEN]);
        let v = Address::validator([0; ADDRESS_LEN]);
        assert!(a < b);
        assert!(b < v);
    }
}
