#![warn(missing_docs)]

//! This module defines the identifier space of the ring.
//! A [Did] is a 160 bits unsigned integer living on a circle modulo 2^160, so it is a
//! finite ring R(P) where P = 2^160.
//!
//! ## Ordering on a circle
//!
//! A raw comparison between two Dids does not respect wraparound: the successor of
//! `0xff..ff` is `0x00..00`. Whenever "x comes after a" is meant, use
//! [Did::is_between] (or [Did::is_strictly_between]), or compare distances
//! `x - origin`, which measure the walk forward from a chosen zero point.
//!
//! ## Arithmetic
//!
//! Addition and subtraction work byte by byte on the big-endian representation with a
//! carry (borrow), so every operation has the same width and cost. [Did::successor]
//! and [Did::predecessor] add and subtract powers of two, which is how the canonical
//! finger targets `self + 2^i` are produced.

use std::ops::Add;
use std::ops::Deref;
use std::ops::Sub;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use num_bigint::RandBigInt;
use rand::Rng;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use sha1::Digest;
use sha1::Sha1;

use crate::error::Error;
use crate::error::Result;

/// Bytes in a Did.
pub const DID_LEN: usize = 20;

/// Did is a finite Ring R(P) where P = 2^160, wrap H160.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Hash, Default)]
pub struct Did(H160);

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = &self.0;
        write!(f, "0x{inner:x}")
    }
}

impl From<u32> for Did {
    fn from(id: u32) -> Did {
        let mut bytes = [0u8; DID_LEN];
        bytes[DID_LEN - 4..].copy_from_slice(&id.to_be_bytes());
        Self(H160(bytes))
    }
}

impl Did {
    /// The additive identity.
    pub const ZERO: Did = Did(H160([0u8; DID_LEN]));

    /// Sha1 of arbitrary content, used for peer addresses and application keys.
    pub fn hash(data: &[u8]) -> Did {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self(H160::from_slice(&hasher.finalize()))
    }

    /// Raw big-endian bytes.
    pub fn to_bytes(&self) -> [u8; DID_LEN] {
        self.0.to_fixed_bytes()
    }

    /// 2^n. `n` is taken modulo 160.
    pub fn pow2(n: usize) -> Did {
        let n = n % (DID_LEN * 8);
        let mut bytes = [0u8; DID_LEN];
        bytes[DID_LEN - 1 - n / 8] = 1 << (n % 8);
        Self(H160(bytes))
    }

    /// `self + 2^n`, the canonical target of finger `n`.
    pub fn successor(&self, n: usize) -> Did {
        *self + Did::pow2(n)
    }

    /// `self - 2^n`.
    pub fn predecessor(&self, n: usize) -> Did {
        *self - Did::pow2(n)
    }

    /// Test x <- (a, b], walking forward from a.
    /// When `a == b` the arc is the whole ring except a itself.
    pub fn is_between(&self, a: Did, b: Did) -> bool {
        if a == b {
            return *self != a;
        }
        let (dx, db) = (*self - a, b - a);
        dx != Did::ZERO && dx <= db
    }

    /// Test x <- (a, b), walking forward from a.
    /// When `a == b` the arc is the whole ring except a itself.
    pub fn is_strictly_between(&self, a: Did, b: Did) -> bool {
        if a == b {
            return *self != a;
        }
        let (dx, db) = (*self - a, b - a);
        dx != Did::ZERO && dx < db
    }

    /// Pick a uniformly random Did in `[a, b)`. If `a == b` the whole ring is used.
    pub fn random_between<R: Rng + ?Sized>(rng: &mut R, a: Did, b: Did) -> Did {
        let span = if a == b {
            BigUint::from(1u8) << (DID_LEN * 8)
        } else {
            BigUint::from(b - a)
        };
        a + Did::from(rng.gen_biguint_below(&span))
    }
}

impl Deref for Did {
    type Target = H160;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Did> for H160 {
    fn from(a: Did) -> Self {
        a.0.to_owned()
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(did.as_bytes())
    }
}

impl From<BigUint> for Did {
    fn from(a: BigUint) -> Self {
        let ff = a % (BigUint::from(1u8) << (DID_LEN * 8));
        let va: Vec<u8> = ff.to_bytes_be();
        let mut res = [0u8; DID_LEN];
        res[DID_LEN - va.len()..].copy_from_slice(&va);
        Self(H160(res))
    }
}

impl From<H160> for Did {
    fn from(addr: H160) -> Self {
        Self(addr)
    }
}

impl From<[u8; DID_LEN]> for Did {
    fn from(bytes: [u8; DID_LEN]) -> Self {
        Self(H160(bytes))
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| Error::BadHexInDid)?;
        let bytes: [u8; DID_LEN] = bytes.try_into().map_err(|_| Error::BadHexInDid)?;
        Ok(Self(H160(bytes)))
    }
}

impl Serialize for Did {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where S: Serializer {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.to_bytes().serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where D: Deserializer<'de> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Did::from_str(&s).map_err(serde::de::Error::custom)
        } else {
            <[u8; DID_LEN]>::deserialize(deserializer).map(Did::from)
        }
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let (a, b) = (self.to_bytes(), rhs.to_bytes());
        let mut out = [0u8; DID_LEN];
        let mut carry = 0u16;
        for i in (0..DID_LEN).rev() {
            let sum = a[i] as u16 + b[i] as u16 + carry;
            out[i] = sum as u8;
            carry = sum >> 8;
        }
        Self(H160(out))
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let (a, b) = (self.to_bytes(), rhs.to_bytes());
        let mut out = [0u8; DID_LEN];
        let mut borrow = 0u16;
        for i in (0..DID_LEN).rev() {
            let diff = (a[i] as u16).wrapping_sub(b[i] as u16).wrapping_sub(borrow);
            out[i] = diff as u8;
            borrow = (diff >> 15) & 1;
        }
        Self(H160(out))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn max() -> Did {
        Did::from([0xffu8; DID_LEN])
    }

    #[test]
    fn test_did() {
        let a = Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab0").unwrap();
        let b = Did::from_str("0x999999cf1046e68e36E1aA2E0E07105eDDD1f08E").unwrap();
        let c = Did::from_str("0xc0ffee254729296a45a3885639AC7E10F9d54979").unwrap();
        assert!(c > b && b > a);
    }

    #[test]
    fn test_add_sub_wrap() {
        assert_eq!(max() + Did::from(1u32), Did::ZERO);
        assert_eq!(Did::ZERO - Did::from(1u32), max());
        assert_eq!(Did::from(300u32) + Did::from(212u32), Did::from(512u32));
        assert_eq!(Did::from(512u32) - Did::from(213u32), Did::from(299u32));
    }

    #[test]
    fn test_add_sub_against_biguint() {
        let mut rng = StdRng::seed_from_u64(7);
        let modulus = BigUint::from(1u8) << 160;
        for _ in 0..200 {
            let a = Did::from(rng.gen::<[u8; DID_LEN]>());
            let b = Did::from(rng.gen::<[u8; DID_LEN]>());
            let (ba, bb) = (BigUint::from(a), BigUint::from(b));
            assert_eq!(BigUint::from(a + b), (&ba + &bb) % &modulus);
            assert_eq!(BigUint::from(a - b), (&ba + &modulus - &bb) % &modulus);
        }
    }

    #[test]
    fn test_successor_predecessor_round_trip() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..10 {
            let a = Did::from(rng.gen::<[u8; DID_LEN]>());
            for n in 0..160 {
                assert_eq!(a.successor(n).predecessor(n), a);
            }
        }
        assert_eq!(max().successor(0), Did::ZERO);
        assert_eq!(Did::ZERO.successor(159), Did::pow2(159));
        assert_eq!(Did::pow2(8), Did::from(256u32));
    }

    #[test]
    fn test_is_between() {
        let (a, b) = (Did::from(10u32), Did::from(20u32));
        assert!(!Did::from(10u32).is_between(a, b));
        assert!(Did::from(11u32).is_between(a, b));
        assert!(Did::from(20u32).is_between(a, b));
        assert!(!Did::from(21u32).is_between(a, b));

        // wrap around: (20, 10] contains 0 and max but not 15
        assert!(Did::ZERO.is_between(b, a));
        assert!(max().is_between(b, a));
        assert!(Did::from(10u32).is_between(b, a));
        assert!(!Did::from(15u32).is_between(b, a));
        assert!(!Did::from(20u32).is_between(b, a));
    }

    #[test]
    fn test_is_between_degenerate_arc() {
        let a = Did::from(42u32);
        assert!(!a.is_between(a, a));
        assert!(!a.is_strictly_between(a, a));
        for x in [Did::ZERO, Did::from(41u32), Did::from(43u32), max()] {
            assert!(x.is_between(a, a));
            assert!(x.is_strictly_between(a, a));
        }
    }

    #[test]
    fn test_is_between_matches_forward_walk() {
        // 16 consecutive ids straddling zero, walked by index so every arc stays inside.
        const N: usize = 16;
        let base = max() - Did::from(8u32);
        let ids: Vec<Did> = (0..N as u32).map(|i| base + Did::from(i)).collect();
        for ia in 0..N {
            for ib in 0..N {
                if ia == ib {
                    continue;
                }
                let (a, b) = (ids[ia], ids[ib]);
                let mut walk = vec![];
                let mut k = (ia + 1) % N;
                loop {
                    walk.push(ids[k]);
                    if k == ib {
                        break;
                    }
                    k = (k + 1) % N;
                }
                for &x in &ids {
                    assert_eq!(x.is_between(a, b), walk.contains(&x), "{x} ({a}, {b}]");
                    assert_eq!(
                        x.is_strictly_between(a, b),
                        walk.contains(&x) && x != b,
                        "{x} ({a}, {b})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_random_between() {
        let mut rng = StdRng::seed_from_u64(3);
        let (a, b) = (max() - Did::from(5u32), Did::from(5u32));
        for _ in 0..100 {
            let x = Did::random_between(&mut rng, a, b);
            assert!(x == a || x.is_strictly_between(a, b), "{x}");
        }
        // a == b covers the whole ring, it must not panic.
        let _ = Did::random_between(&mut rng, a, a);
    }

    #[test]
    fn test_sort() {
        let a = Did::from_str("0xaaE807fcc88dD319270493fB2e822e388Fe36ab0").unwrap();
        let b = Did::from_str("0xbb9999cf1046e68e36E1aA2E0E07105eDDD1f08E").unwrap();
        let c = Did::from_str("0xccffee254729296a45a3885639AC7E10F9d54979").unwrap();
        let d = Did::from_str("0xdddfee254729296a45a3885639AC7E10F9d54979").unwrap();
        let mut v = vec![c, b, a, d];
        v.sort_by_key(|x| *x - a);
        assert_eq!(v, vec![a, b, c, d]);
        v.sort_by_key(|x| *x - b);
        assert_eq!(v, vec![b, c, d, a]);
        v.sort_by_key(|x| *x - c);
        assert_eq!(v, vec![c, d, a, b]);
        v.sort_by_key(|x| *x - d);
        assert_eq!(v, vec![d, a, b, c]);
    }

    #[test]
    fn test_dump_and_load() {
        // The length must be 40.
        assert!(Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab").is_err());
        assert!(Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab00").is_err());

        // Allow omit 0x prefix
        assert_eq!(
            Did::from_str("11E807fcc88dD319270493fB2e822e388Fe36ab0").unwrap(),
            Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab0").unwrap(),
        );

        let did = Did::from_str("0x11E807fcc88dD319270493fB2e822e388Fe36ab0").unwrap();
        assert_eq!(
            did.to_string(),
            "0x11e807fcc88dd319270493fb2e822e388fe36ab0"
        );

        // Human readable formats use the hex string.
        assert_eq!(
            serde_json::to_string(&did).unwrap(),
            "\"0x11e807fcc88dd319270493fb2e822e388fe36ab0\""
        );
        let back =
            serde_json::from_str::<Did>("\"0x11e807fcc88dd319270493fb2e822e388fe36ab0\"").unwrap();
        assert_eq!(back, did);

        // Binary formats use the 20 raw bytes.
        let bytes = bincode::serialize(&did).unwrap();
        assert_eq!(bytes.len(), DID_LEN);
        assert_eq!(bincode::deserialize::<Did>(&bytes).unwrap(), did);
    }

    #[test]
    fn test_distance_order_wraps() {
        let origin = max() - Did::from(1u32);
        let near = Did::from(3u32);
        let far = max() - Did::from(2u32);
        assert!(near - origin < far - origin);
        assert_eq!(near - origin, Did::from(5u32));
        assert_eq!(Did::ZERO - origin + origin, Did::ZERO);
    }
}
