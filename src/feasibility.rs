//! Precomputation of drone-flight feasibility.
//!
//! For FSTSP every (launch, customer, recovery) triple over the
//! augmented vertex set is classified once, before the model is built.
//! This is an O(N^3) sweep and the dominant precomputation cost on
//! large instances. For PDSTSP a simpler per-customer round-trip check
//! determines drone eligibility.

use crate::instance::TspdInstance;
use rayon::prelude::*;

/// Boolean table over (launch, customer, recovery) triples of the
/// augmented vertex set. Index `dimension` is the virtual return depot
/// and aliases physical vertex 0 for travel times.
#[derive(Debug, Clone)]
pub struct FlightTable {
    dimension: usize,
    cells: Vec<bool>,
}

impl FlightTable {
    /// Enumerate all feasible sorties for the instance. A triple
    /// (s, c, e) is feasible iff s != c, c != e and the sortie duration
    /// droneTime(s, c) + droneTime(c, e) fits within the flight time.
    /// Launch and recovery at the same truck stop are allowed.
    pub fn build(instance: &TspdInstance) -> Self {
        let n = instance.dimension;
        let flight_time = instance.flight_time();
        log::info!(
            "enumerating drone sorties for {} vertices ({} triples)",
            n,
            (n + 1) * n * (n + 1)
        );

        let blocks: Vec<Vec<bool>> = (0..=n)
            .into_par_iter()
            .map(|s| {
                let mut block = vec![false; n * (n + 1)];
                for c in 0..n {
                    if s == c {
                        continue;
                    }
                    let leg_out = instance.drone_time_aug(s, c);
                    if leg_out > flight_time {
                        continue;
                    }
                    for e in 0..=n {
                        if c == e {
                            continue;
                        }
                        block[c * (n + 1) + e] =
                            leg_out + instance.drone_time_aug(c, e) <= flight_time;
                    }
                }
                block
            })
            .collect();

        FlightTable { dimension: n, cells: blocks.concat() }
    }

    #[inline]
    fn index(&self, s: usize, c: usize, e: usize) -> usize {
        let n = self.dimension;
        s * n * (n + 1) + c * (n + 1) + e
    }

    /// Whether a drone may launch at `s`, serve `c` and recover at `e`.
    #[inline]
    pub fn feasible(&self, s: usize, c: usize, e: usize) -> bool {
        self.cells[self.index(s, c, e)]
    }

    /// Number of feasible triples.
    pub fn count_feasible(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }

    /// Iterate the feasible triples for a given customer.
    pub fn sorties_for(&self, customer: usize) -> Vec<(usize, usize)> {
        let n = self.dimension;
        let mut sorties = Vec::new();
        for s in 0..=n {
            for e in 0..=n {
                if self.feasible(s, customer, e) {
                    sorties.push((s, e));
                }
            }
        }
        sorties
    }
}

/// PDSTSP eligibility: customers a drone can serve from the depot.
///
/// A customer is in range iff its one-way drone time fits in half the
/// flight time, and it belongs to the instance's eligible set.
pub fn pdstsp_in_range(instance: &TspdInstance) -> Vec<usize> {
    let drone = instance.drone.as_ref().expect("instance has no drone parameters");
    let half = instance.flight_time() / 2.0;
    (1..instance.dimension)
        .filter(|&c| drone.is_eligible(c) && instance.drone_time(0, c) <= half)
        .collect()
}
