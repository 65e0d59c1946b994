//! Bounded-capacity address tables: the MAC filter, the IPv4 filter, and the
//! ARP cache.
//!
//! All three share the same shape: a fixed-size array of entries, each
//! carrying a validity flag and an expiration timestamp. A `Populate` call
//! never discards existing entries -- it fails with the table's `TableFull`
//! status if there are fewer free slots than values given, and otherwise
//! fills the first free slots it finds, so repeated calls accumulate until
//! the table is full. Lookup is a linear scan; these tables are sized for a
//! few dozen entries, not a routing table.
//!
//! Expiration is recorded but not enforced here -- nothing ages an entry out
//! on its own. A host that wants eviction re-populates the table.

use crate::error::Status;
use crate::metadata::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry<T> {
    addr: T,
    expires_at: Timestamp,
}

/// A bounded table of up to `N` addresses of type `T`, used for the MAC and
/// IPv4 filters.
#[derive(Clone, Copy, Debug)]
pub struct FilterTable<T, const N: usize> {
    entries: [Option<Entry<T>>; N],
}

impl<T, const N: usize> Default for FilterTable<T, N>
where
    T: Copy,
{
    fn default() -> Self {
        FilterTable {
            entries: [None; N],
        }
    }
}

impl<T, const N: usize> FilterTable<T, N>
where
    T: Copy + PartialEq,
{
    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// `true` if no entries are populated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `addrs` into the first free slots, each stamped with
    /// `now + lifetime` as its expiration. Existing entries are left
    /// untouched. Fails with `table_full` if there are fewer free slots than
    /// `addrs.len()`; on failure the table is left unchanged.
    pub fn populate(
        &mut self,
        addrs: &[T],
        now: Timestamp,
        lifetime: i64,
        table_full: Status,
    ) -> Status {
        let free = self.entries.iter().filter(|e| e.is_none()).count();
        if addrs.len() > free {
            return table_full;
        }
        let mut addrs = addrs.iter();
        for slot in self.entries.iter_mut() {
            if slot.is_some() {
                continue;
            }
            let Some(addr) = addrs.next() else {
                break;
            };
            *slot = Some(Entry {
                addr: *addr,
                expires_at: now.saturating_add(lifetime),
            });
        }
        Status::Ok
    }

    /// `true` if `addr` is present in the table, ignoring expiration.
    pub fn contains(&self, addr: &T) -> bool {
        self.entries
            .iter()
            .flatten()
            .any(|entry| entry.addr == *addr)
    }
}

/// A bounded table mapping IPv4 addresses to MAC addresses, used as the ARP
/// cache. Lookup works in both directions: by IP to find a MAC, and by MAC
/// to find an IP.
#[derive(Clone, Copy, Debug)]
pub struct ArpCache<const N: usize> {
    entries: [Option<ArpEntry>; N],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArpEntry {
    ip: crate::IpV4Addr,
    mac: crate::MacAddr,
    expires_at: Timestamp,
}

impl<const N: usize> Default for ArpCache<N> {
    fn default() -> Self {
        ArpCache {
            entries: [None; N],
        }
    }
}

impl<const N: usize> ArpCache<N> {
    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// `true` if no entries are populated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert the given `(ip, mac)` pairs into the first free slots, each
    /// stamped with `now + lifetime` as its expiration. Existing entries are
    /// left untouched. Fails with `Status::ArpTableFull` if there are fewer
    /// free slots than `pairs.len()`; on failure the cache is left unchanged.
    /// Returns the number of pairs actually inserted on success, for counter
    /// bookkeeping.
    pub fn populate(
        &mut self,
        pairs: &[(crate::IpV4Addr, crate::MacAddr)],
        now: Timestamp,
        lifetime: i64,
    ) -> Result<usize, Status> {
        let free = self.entries.iter().filter(|e| e.is_none()).count();
        if pairs.len() > free {
            return Err(Status::ArpTableFull);
        }
        let mut pairs_iter = pairs.iter();
        for slot in self.entries.iter_mut() {
            if slot.is_some() {
                continue;
            }
            let Some((ip, mac)) = pairs_iter.next() else {
                break;
            };
            *slot = Some(ArpEntry {
                ip: *ip,
                mac: *mac,
                expires_at: now.saturating_add(lifetime),
            });
        }
        Ok(pairs.len())
    }

    /// Find the MAC address associated with `ip`, ignoring expiration.
    pub fn find_mac(&self, ip: &crate::IpV4Addr) -> Option<crate::MacAddr> {
        self.entries
            .iter()
            .flatten()
            .find(|entry| entry.ip == *ip)
            .map(|entry| entry.mac)
    }

    /// Find the IPv4 address associated with `mac`, ignoring expiration.
    pub fn find_ip(&self, mac: &crate::MacAddr) -> Option<crate::IpV4Addr> {
        self.entries
            .iter()
            .flatten()
            .find(|entry| entry.mac == *mac)
            .map(|entry| entry.ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IpV4Addr, MacAddr};

    #[test]
    fn populate_over_capacity_fails_and_leaves_table_unchanged() {
        let mut table: FilterTable<IpV4Addr, 2> = FilterTable::default();
        let addrs = [
            IpV4Addr::new([10, 0, 0, 1]),
            IpV4Addr::new([10, 0, 0, 2]),
            IpV4Addr::new([10, 0, 0, 3]),
        ];
        let status = table.populate(&addrs, 0, 100, Status::IPv4FilterTableFull);
        assert_eq!(status, Status::IPv4FilterTableFull);
        assert!(table.is_empty());
    }

    #[test]
    fn populate_then_contains() {
        let mut table: FilterTable<MacAddr, 4> = FilterTable::default();
        let addr = MacAddr::new([1, 2, 3, 4, 5, 6]);
        let status = table.populate(&[addr], 0, 100, Status::EthernetFilterTableFull);
        assert_eq!(status, Status::Ok);
        assert!(table.contains(&addr));
        assert!(!table.contains(&MacAddr::new([9, 9, 9, 9, 9, 9])));
    }

    #[test]
    fn populate_accumulates_across_calls_into_free_slots() {
        let mut table: FilterTable<IpV4Addr, 2> = FilterTable::default();
        let a = IpV4Addr::new([10, 0, 0, 1]);
        let b = IpV4Addr::new([10, 0, 0, 2]);
        assert_eq!(table.populate(&[a], 0, 100, Status::IPv4FilterTableFull), Status::Ok);
        assert_eq!(table.len(), 1);
        assert_eq!(table.populate(&[b], 0, 100, Status::IPv4FilterTableFull), Status::Ok);
        assert_eq!(table.len(), 2);
        assert!(table.contains(&a));
        assert!(table.contains(&b));

        // No free slots left: populating even one more must fail and leave
        // the two existing entries untouched.
        let c = IpV4Addr::new([10, 0, 0, 3]);
        assert_eq!(
            table.populate(&[c], 0, 100, Status::IPv4FilterTableFull),
            Status::IPv4FilterTableFull
        );
        assert!(table.contains(&a));
        assert!(table.contains(&b));
        assert!(!table.contains(&c));
    }

    #[test]
    fn populate_exactly_n_into_n_free_slots_succeeds_n_plus_one_fails() {
        let mut table: FilterTable<MacAddr, 3> = FilterTable::default();
        let addrs = [
            MacAddr::new([1; 6]),
            MacAddr::new([2; 6]),
            MacAddr::new([3; 6]),
        ];
        assert_eq!(
            table.populate(&addrs, 0, 100, Status::EthernetFilterTableFull),
            Status::Ok
        );
        assert_eq!(table.len(), 3);

        let mut table: FilterTable<MacAddr, 3> = FilterTable::default();
        let addrs = [
            MacAddr::new([1; 6]),
            MacAddr::new([2; 6]),
            MacAddr::new([3; 6]),
            MacAddr::new([4; 6]),
        ];
        assert_eq!(
            table.populate(&addrs, 0, 100, Status::EthernetFilterTableFull),
            Status::EthernetFilterTableFull
        );
        assert!(table.is_empty());
    }

    #[test]
    fn arp_cache_bidirectional_lookup() {
        let mut cache: ArpCache<4> = ArpCache::default();
        let ip = IpV4Addr::new([10, 0, 0, 5]);
        let mac = MacAddr::new([0xAA, 0xBB, 0xCC, 0, 0, 1]);
        assert_eq!(cache.populate(&[(ip, mac)], 0, 100), Ok(1));
        assert_eq!(cache.find_mac(&ip), Some(mac));
        assert_eq!(cache.find_ip(&mac), Some(ip));
    }

    #[test]
    fn arp_cache_populate_accumulates_and_fails_without_mutation_when_full() {
        let mut cache: ArpCache<2> = ArpCache::default();
        let a = (IpV4Addr::new([10, 0, 0, 1]), MacAddr::new([1; 6]));
        let b = (IpV4Addr::new([10, 0, 0, 2]), MacAddr::new([2; 6]));
        assert_eq!(cache.populate(&[a], 0, 100), Ok(1));
        assert_eq!(cache.populate(&[b], 0, 100), Ok(1));
        assert_eq!(cache.len(), 2);

        let c = (IpV4Addr::new([10, 0, 0, 3]), MacAddr::new([3; 6]));
        assert_eq!(cache.populate(&[c], 0, 100), Err(Status::ArpTableFull));
        assert_eq!(cache.find_mac(&a.0), Some(a.1));
        assert_eq!(cache.find_mac(&b.0), Some(b.1));
        assert_eq!(cache.find_mac(&c.0), None);
    }
}
