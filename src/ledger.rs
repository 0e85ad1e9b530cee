//! Per-arm bookkeeping with explicit insert-or-update semantics.
//!
//! The driver keeps two of these: one tracking the best oracle optimum seen
//! for each pulled arm (`Combine::Max`) and one tracking the learned value of
//! each experiment winner (`Combine::TwoPointMean` by default).

use std::collections::BTreeMap;

/// How a new value is folded into an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Combine {
    /// `max(old, new)`.
    Max,
    /// `(old + new) / 2`, regardless of how many values were folded before.
    ///
    /// Later values weigh more than earlier ones; this reproduces the
    /// reference aggregation.
    #[default]
    TwoPointMean,
    /// Arithmetic mean of every value folded into the entry.
    RunningMean,
}

/// One ledger entry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedgerEntry {
    pub value: f64,
    /// Number of values folded into this entry.
    pub count: u64,
}

/// Arm-index → value mapping with a fixed combine policy.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmLedger {
    combine: Combine,
    entries: BTreeMap<usize, LedgerEntry>,
}

impl ArmLedger {
    pub fn new(combine: Combine) -> Self {
        Self {
            combine,
            entries: BTreeMap::new(),
        }
    }

    pub fn combine(&self) -> Combine {
        self.combine
    }

    /// Insert `value` for `arm`, or fold it into the existing entry.
    ///
    /// Returns the stored value after the update.
    pub fn upsert(&mut self, arm: usize, value: f64) -> f64 {
        let combine = self.combine;
        let e = self
            .entries
            .entry(arm)
            .and_modify(|e| {
                e.value = match combine {
                    Combine::Max => e.value.max(value),
                    Combine::TwoPointMean => (e.value + value) / 2.0,
                    Combine::RunningMean => e.value + (value - e.value) / (e.count + 1) as f64,
                };
                e.count += 1;
            })
            .or_insert(LedgerEntry { value, count: 1 });
        e.value
    }

    pub fn get(&self, arm: usize) -> Option<f64> {
        self.entries.get(&arm).map(|e| e.value)
    }

    pub fn entry(&self, arm: usize) -> Option<LedgerEntry> {
        self.entries.get(&arm).copied()
    }

    /// Largest stored value across all arms.
    pub fn max_value(&self) -> Option<f64> {
        self.entries.values().map(|e| e.value).reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&k, e)| (k, e.value))
    }

    /// Plain `arm → value` map, for reporting.
    pub fn to_map(&self) -> BTreeMap<usize, f64> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_upsert_stores_value_unchanged() {
        for combine in [Combine::Max, Combine::TwoPointMean, Combine::RunningMean] {
            let mut l = ArmLedger::new(combine);
            assert_eq!(l.upsert(3, 1.25), 1.25);
            assert_eq!(l.get(3), Some(1.25));
            assert_eq!(l.entry(3).unwrap().count, 1);
        }
    }

    #[test]
    fn max_keeps_largest() {
        let mut l = ArmLedger::new(Combine::Max);
        l.upsert(0, 2.0);
        l.upsert(0, 1.0);
        assert_eq!(l.get(0), Some(2.0));
        l.upsert(0, 3.5);
        assert_eq!(l.get(0), Some(3.5));
    }

    #[test]
    fn two_point_mean_overweights_recent_values() {
        let mut l = ArmLedger::new(Combine::TwoPointMean);
        l.upsert(1, 0.0);
        l.upsert(1, 4.0);
        l.upsert(1, 8.0);
        // ((0 + 4) / 2 + 8) / 2
        assert_eq!(l.get(1), Some(5.0));
    }

    #[test]
    fn running_mean_is_plain_average() {
        let mut l = ArmLedger::new(Combine::RunningMean);
        l.upsert(1, 0.0);
        l.upsert(1, 4.0);
        l.upsert(1, 8.0);
        assert!((l.get(1).unwrap() - 4.0).abs() < 1e-12);
        assert_eq!(l.entry(1).unwrap().count, 3);
    }

    #[test]
    fn arms_are_independent() {
        let mut l = ArmLedger::new(Combine::Max);
        l.upsert(0, 1.0);
        l.upsert(5, 2.0);
        assert_eq!(l.len(), 2);
        assert_eq!(l.get(2), None);
        assert_eq!(l.max_value(), Some(2.0));
        assert_eq!(l.to_map().keys().copied().collect::<Vec<_>>(), vec![0, 5]);
    }
}
