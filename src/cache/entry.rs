//! Resolution cache entry
//!
//! An [`AddressRecord`] is either positive (one or more addresses) or
//! negative (no addresses: the name is known not to resolve). Records are
//! replaced, never mutated.

use std::time::Instant;

use crate::addr::IpAddress;

/// Absolute expiry of a cache record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Valid until this instant (exclusive)
    At(Instant),
    /// Never expires
    Never,
}

impl Expiry {
    /// Check whether the record is stale at `now`
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Self::At(deadline) => now >= *deadline,
            Self::Never => false,
        }
    }
}

/// A cached resolution result
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use rust_inet::cache::{AddressRecord, Expiry};
///
/// let now = Instant::now();
/// let record = AddressRecord::new(Vec::new(), Expiry::At(now + Duration::from_secs(10)));
/// assert!(record.is_negative());
/// assert!(!record.is_expired(now));
/// assert!(record.is_expired(now + Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone)]
pub struct AddressRecord {
    addresses: Vec<IpAddress>,
    expiry: Expiry,
}

impl AddressRecord {
    #[must_use]
    pub fn new(addresses: Vec<IpAddress>, expiry: Expiry) -> Self {
        Self { addresses, expiry }
    }

    #[must_use]
    pub fn addresses(&self) -> &[IpAddress] {
        &self.addresses
    }

    #[must_use]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// A negative record caches a failed lookup
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.addresses.is_empty()
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_never_expires() {
        let record = AddressRecord::new(vec![IpAddress::loopback_v4()], Expiry::Never);
        let far = Instant::now() + Duration::from_secs(100 * 365 * 24 * 3600);
        assert!(!record.is_expired(far));
        assert!(!record.is_negative());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Instant::now();
        let expiry = Expiry::At(now + Duration::from_secs(1));
        assert!(!expiry.is_expired(now + Duration::from_millis(999)));
        assert!(expiry.is_expired(now + Duration::from_secs(1)));
    }
}
