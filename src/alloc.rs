//! Budget allocation enumeration.
//!
//! Turns a base discretization vector into the full, ordered set of feasible
//! per-campaign spend tuples. The order is lexicographic over the Cartesian
//! product of spend levels, and arm indices downstream are positions in this
//! list, so the order is part of the contract.

use std::fmt;

use crate::{Error, Result};

/// One per-campaign spend tuple whose total fits the budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Allocation(Vec<u64>);

impl Allocation {
    pub fn new(spends: Vec<u64>) -> Self {
        Self(spends)
    }

    /// Spend per campaign, in campaign order.
    pub fn spends(&self) -> &[u64] {
        &self.0
    }

    /// Total spend across campaigns.
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    /// Number of campaigns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Spends as a GP input vector.
    pub fn to_features(&self) -> Vec<f64> {
        self.0.iter().map(|&s| s as f64).collect()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{s}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<u64>> for Allocation {
    fn from(v: Vec<u64>) -> Self {
        Self(v)
    }
}

fn validate_levels(levels: &[u64]) -> Result<()> {
    let Some(&first) = levels.first() else {
        return Err(Error::EmptyDiscretization);
    };
    if first != 0 {
        return Err(Error::DiscretizationNotZeroBased { first });
    }
    if levels.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::UnsortedDiscretization);
    }
    Ok(())
}

/// Scale a base discretization vector to a cumulative budget.
///
/// Each level becomes `floor(level * cumulative_budget / base_budget)`, computed
/// in integer arithmetic so the truncation is exact. Levels that collapse onto
/// the same value after truncation are kept, so the level count (and with it
/// the arm indexing) does not depend on the budget.
///
/// # Example
///
/// ```rust
/// use gpts_alloc::scale_discretization;
///
/// let levels = scale_discretization(&[0, 1, 3, 5, 8, 10], 20, 10).unwrap();
/// assert_eq!(levels, vec![0, 2, 6, 10, 16, 20]);
/// ```
pub fn scale_discretization(base: &[u64], cumulative_budget: u64, base_budget: u64) -> Result<Vec<u64>> {
    validate_levels(base)?;
    if base_budget == 0 {
        return Err(Error::ZeroBaseBudget);
    }
    Ok(base
        .iter()
        .map(|&v| ((v as u128 * cumulative_budget as u128) / base_budget as u128) as u64)
        .collect())
}

/// Enumerate every spend tuple over `n_campaigns` positions whose sum is at
/// most `total_budget`.
///
/// Tuples come out in lexicographic order of the Cartesian product of
/// `levels`, taken by position: repeated levels yield repeated tuples, each
/// its own arm. The all-zero tuple is always first.
pub fn budget_allocations(levels: &[u64], total_budget: u64, n_campaigns: usize) -> Result<Vec<Allocation>> {
    validate_levels(levels)?;
    if n_campaigns == 0 {
        return Err(Error::ZeroCampaigns);
    }
    let max_level = levels.last().copied().unwrap_or(0);
    if total_budget < max_level {
        return Err(Error::BudgetBelowMaxLevel {
            budget: total_budget,
            max_level,
        });
    }

    let mut out = Vec::new();
    let mut current = Vec::with_capacity(n_campaigns);
    extend_allocations(levels, total_budget, n_campaigns, &mut current, 0, &mut out);

    if out.is_empty() {
        return Err(Error::NoFeasibleAllocation);
    }
    Ok(out)
}

// Depth-first walk of the product. Levels are sorted, so once a level overshoots
// the remaining budget every later level does too.
fn extend_allocations(
    levels: &[u64],
    budget: u64,
    n_campaigns: usize,
    current: &mut Vec<u64>,
    spent: u64,
    out: &mut Vec<Allocation>,
) {
    if current.len() == n_campaigns {
        out.push(Allocation(current.clone()));
        return;
    }
    for &level in levels {
        let Some(total) = spent.checked_add(level) else {
            break;
        };
        if total > budget {
            break;
        }
        current.push(level);
        extend_allocations(levels, budget, n_campaigns, current, total, out);
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: [u64; 6] = [0, 1, 3, 5, 8, 10];

    #[test]
    fn reference_grid_has_69_arms_ending_at_full_first_campaign() {
        let allocs = budget_allocations(&BASE, 10, 3).unwrap();
        assert_eq!(allocs.len(), 69);
        assert_eq!(allocs[0].spends(), &[0, 0, 0]);
        assert_eq!(allocs[1].spends(), &[0, 0, 1]);
        assert_eq!(allocs[68].spends(), &[10, 0, 0]);
    }

    #[test]
    fn two_campaign_grid_matches_product_filter() {
        let allocs = budget_allocations(&BASE, 10, 2).unwrap();
        assert_eq!(allocs.len(), 22);
        assert_eq!(allocs[5].spends(), &[0, 10]);
        assert_eq!(allocs[6].spends(), &[1, 0]);
        assert_eq!(allocs[21].spends(), &[10, 0]);
    }

    #[test]
    fn scaling_truncates_toward_zero() {
        assert_eq!(scale_discretization(&BASE, 10, 10).unwrap(), BASE.to_vec());
        // 15/10: 1.5 -> 1, 4.5 -> 4, 7.5 -> 7, 12, 15.
        assert_eq!(scale_discretization(&BASE, 15, 10).unwrap(), vec![0, 1, 4, 7, 12, 15]);
    }

    #[test]
    fn scaling_keeps_colliding_levels() {
        // 5/10: 0, 0.5, 1.5, 2.5, 4, 5 -> 0, 0, 1, 2, 4, 5.
        let levels = scale_discretization(&BASE, 5, 10).unwrap();
        assert_eq!(levels, vec![0, 0, 1, 2, 4, 5]);

        // Every position of the product is an arm, repeats included.
        let allocs = budget_allocations(&levels, 5, 3).unwrap();
        assert_eq!(allocs.len(), 99);
        // Two zero levels per campaign: [0, 0, 0] is arms 0, 1, 6, 7, 26, 27, 32, 33.
        let zeros: Vec<usize> = (0..allocs.len()).filter(|&i| allocs[i].total() == 0).collect();
        assert_eq!(zeros, vec![0, 1, 6, 7, 26, 27, 32, 33]);
        assert_eq!(allocs[98].spends(), &[5, 0, 0]);

        let pairs = budget_allocations(&levels, 5, 2).unwrap();
        assert_eq!(pairs.len(), 26);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(budget_allocations(&[], 10, 3), Err(Error::EmptyDiscretization)));
        assert!(matches!(
            budget_allocations(&[1, 2], 10, 3),
            Err(Error::DiscretizationNotZeroBased { first: 1 })
        ));
        assert!(matches!(
            budget_allocations(&[0, 5, 3], 10, 3),
            Err(Error::UnsortedDiscretization)
        ));
        assert!(matches!(budget_allocations(&BASE, 10, 0), Err(Error::ZeroCampaigns)));
        assert!(matches!(
            budget_allocations(&BASE, 9, 3),
            Err(Error::BudgetBelowMaxLevel { budget: 9, max_level: 10 })
        ));
        assert!(matches!(scale_discretization(&BASE, 10, 0), Err(Error::ZeroBaseBudget)));
    }

    #[test]
    fn display_is_bracketed_list() {
        assert_eq!(Allocation::new(vec![10, 0, 0]).to_string(), "[10, 0, 0]");
    }

    proptest! {
        #[test]
        fn allocations_fit_budget_and_include_zero(
            budget in 1u64..40,
            n_campaigns in 1usize..4,
        ) {
            let levels = scale_discretization(&BASE, budget, 10).unwrap();
            let allocs = budget_allocations(&levels, budget, n_campaigns).unwrap();

            prop_assert!(allocs.iter().all(|a| a.total() <= budget));
            prop_assert!(allocs.iter().all(|a| a.len() == n_campaigns));
            prop_assert!(allocs.iter().any(|a| a.spends().iter().all(|&s| s == 0)));

            // Non-decreasing lexicographic order; strict when no levels collide.
            let mut distinct = levels.clone();
            distinct.dedup();
            for w in allocs.windows(2) {
                if distinct.len() == levels.len() {
                    prop_assert!(w[0] < w[1]);
                } else {
                    prop_assert!(w[0] <= w[1]);
                }
            }

            // Same inputs, same ordered output.
            let again = budget_allocations(&levels, budget, n_campaigns).unwrap();
            prop_assert_eq!(&allocs, &again);
        }

        #[test]
        fn allocations_are_exactly_the_feasible_product(
            budget in 1u64..30,
        ) {
            let levels = scale_discretization(&BASE, budget, 10).unwrap();
            let allocs = budget_allocations(&levels, budget, 2).unwrap();
            let mut brute = Vec::new();
            for &a in &levels {
                for &b in &levels {
                    if a + b <= budget {
                        brute.push(Allocation::new(vec![a, b]));
                    }
                }
            }
            prop_assert_eq!(allocs, brute);
        }
    }
}
