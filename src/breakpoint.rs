use std::collections::BTreeMap;

/// An address we want to drop into single-step at. `trigger_every` says
/// how many arrivals make a hit; 0 means every arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub address: u16,
    pub trigger_every: u32,
    remaining: u32,
}

impl Breakpoint {
    pub fn new(address: u16, trigger_every: u32) -> Self {
        Breakpoint {
            address,
            trigger_every,
            remaining: trigger_every,
        }
    }

    /// arrivals left before the next hit
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// count one arrival; true (and the count rearmed) when it's a hit
    fn arrive(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.trigger_every;
            true
        } else {
            false
        }
    }
}

/// At most one breakpoint per address
#[derive(Debug, Clone, Default)]
pub struct BreakpointSet {
    points: BTreeMap<u16, Breakpoint>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        BreakpointSet::default()
    }

    /// add a breakpoint, replacing any already at `address`
    pub fn add(&mut self, address: u16, trigger_every: u32) {
        self.points
            .insert(address, Breakpoint::new(address, trigger_every));
    }

    pub fn remove(&mut self, address: u16) {
        self.points.remove(&address);
    }

    pub fn get(&self, address: u16) -> Option<&Breakpoint> {
        self.points.get(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.points.values()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// count an arrival at `address`; true when a breakpoint there fires
    pub fn check_and_consume(&mut self, address: u16) -> bool {
        self.points
            .get_mut(&address)
            .map_or(false, Breakpoint::arrive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_second_arrival() {
        let mut bps = BreakpointSet::new();
        bps.add(0x0300, 2);
        assert!(!bps.check_and_consume(0x0300));
        assert_eq!(bps.get(0x0300).unwrap().remaining(), 1);
        assert!(bps.check_and_consume(0x0300));
        assert_eq!(bps.get(0x0300).unwrap().remaining(), 2);
        assert!(!bps.check_and_consume(0x0300));
    }

    #[test]
    fn test_zero_fires_every_time() {
        let mut bps = BreakpointSet::new();
        bps.add(0x1234, 0);
        for _ in 0..3 {
            assert!(bps.check_and_consume(0x1234));
        }
        assert_eq!(bps.get(0x1234).unwrap().remaining(), 0);
    }

    #[test]
    fn test_one_fires_every_time() {
        let mut bps = BreakpointSet::new();
        bps.add(0x1234, 1);
        assert!(bps.check_and_consume(0x1234));
        assert!(bps.check_and_consume(0x1234));
    }

    #[test]
    fn test_no_match() {
        let mut bps = BreakpointSet::new();
        bps.add(0x0300, 0);
        assert!(!bps.check_and_consume(0x0301));
    }

    #[test]
    fn test_add_replaces_and_rearms() {
        let mut bps = BreakpointSet::new();
        bps.add(0x0300, 3);
        bps.check_and_consume(0x0300);
        bps.add(0x0300, 5);
        assert_eq!(bps.len(), 1);
        assert_eq!(bps.get(0x0300).unwrap().remaining(), 5);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut bps = BreakpointSet::new();
        bps.remove(0x0300);
        bps.add(0x0300, 0);
        bps.remove(0x0300);
        assert!(bps.is_empty());
    }
}
