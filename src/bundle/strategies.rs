//! Selection strategies
//!
//! Every strategy is incremental: a candidate joins only while
//! [`validate_addition`] holds. Rejected candidates are skipped, not fatal.

use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;
use crate::{
    bundle::{
        scoring::{composite_score, diversity_score, synergy_with},
        validation::validate_addition,
    },
    config::{BundleConstraints, RISK_AVERSE_MAX_RISK},
    types::{BundleCandidate, CompositionStrategy, Opportunity},
    utils::to_f64,
};

pub fn select(
    strategy: CompositionStrategy,
    candidates: &[Opportunity],
    constraints: &BundleConstraints,
) -> BundleCandidate {
    match strategy {
        CompositionStrategy::Greedy => greedy(candidates, constraints),
        CompositionStrategy::Balanced => balanced(candidates, constraints),
        CompositionStrategy::RiskAverse => risk_averse(candidates, constraints),
        CompositionStrategy::Diversified => diversified(candidates, constraints),
        CompositionStrategy::Synergistic => synergistic(candidates, constraints),
    }
}

/// Profit descending; id breaks ties so equal inputs give equal output.
fn by_profit_desc(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.declared_profit.cmp(&a.declared_profit).then_with(|| a.id.cmp(&b.id))
}

fn fill_in_order<'a>(
    ordered: impl IntoIterator<Item = &'a Opportunity>,
    constraints: &BundleConstraints,
) -> BundleCandidate {
    let mut bundle = BundleCandidate::default();
    for opportunity in ordered {
        if bundle.len() >= constraints.max_bundle_size {
            break;
        }
        match validate_addition(&bundle, opportunity, constraints) {
            Ok(()) => bundle.push(opportunity.clone()),
            Err(reason) => debug!("Skipping {}: {}", opportunity.id, reason),
        }
    }
    bundle
}

pub fn greedy(candidates: &[Opportunity], constraints: &BundleConstraints) -> BundleCandidate {
    let mut ordered: Vec<&Opportunity> = candidates.iter().collect();
    ordered.sort_by(|a, b| by_profit_desc(a, b));
    fill_in_order(ordered, constraints)
}

pub fn balanced(candidates: &[Opportunity], constraints: &BundleConstraints) -> BundleCandidate {
    let max_profit = candidates
        .iter()
        .map(|o| to_f64(o.declared_profit))
        .fold(0.0, f64::max);

    let mut scored: Vec<(f64, &Opportunity)> = candidates
        .iter()
        .map(|o| (composite_score(o, max_profit), o))
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then_with(|| by_profit_desc(a, b)));

    fill_in_order(scored.into_iter().map(|(_, o)| o), constraints)
}

pub fn risk_averse(candidates: &[Opportunity], constraints: &BundleConstraints) -> BundleCandidate {
    let mut ordered: Vec<&Opportunity> = candidates
        .iter()
        .filter(|o| o.declared_risk_score <= RISK_AVERSE_MAX_RISK)
        .collect();
    ordered.sort_by(|a, b| {
        a.declared_risk_score
            .total_cmp(&b.declared_risk_score)
            .then_with(|| by_profit_desc(a, b))
    });
    fill_in_order(ordered, constraints)
}

pub fn diversified(candidates: &[Opportunity], constraints: &BundleConstraints) -> BundleCandidate {
    let mut bundle = BundleCandidate::default();
    let mut remaining: Vec<&Opportunity> = candidates.iter().collect();
    let mut seen_kinds = HashSet::new();
    let mut seen_venues = HashSet::new();

    while bundle.len() < constraints.max_bundle_size {
        let best = remaining
            .iter()
            .enumerate()
            .map(|(i, o)| (i, diversity_score(o, &seen_kinds, &seen_venues)))
            .max_by(|(ia, sa), (ib, sb)| {
                sa.total_cmp(sb)
                    .then_with(|| by_profit_desc(remaining[*ia], remaining[*ib]).reverse())
            })
            .map(|(i, _)| i);

        let Some(index) = best else { break };
        let pick = remaining.swap_remove(index);

        match validate_addition(&bundle, pick, constraints) {
            Ok(()) => {
                seen_kinds.insert(pick.kind);
                for venue in pick.venues() {
                    seen_venues.insert(venue.to_ascii_lowercase());
                }
                bundle.push(pick.clone());
            }
            Err(reason) => debug!("Skipping {}: {}", pick.id, reason),
        }
    }

    bundle
}

pub fn synergistic(candidates: &[Opportunity], constraints: &BundleConstraints) -> BundleCandidate {
    let mut remaining: Vec<&Opportunity> = candidates.iter().collect();
    remaining.sort_by(|a, b| by_profit_desc(a, b));

    let mut bundle = BundleCandidate::default();
    let Some(seed_index) = remaining
        .iter()
        .position(|o| validate_addition(&bundle, o, constraints).is_ok())
    else {
        return bundle;
    };
    bundle.push(remaining.remove(seed_index).clone());

    while bundle.len() < constraints.max_bundle_size {
        let best = remaining
            .iter()
            .enumerate()
            .map(|(i, o)| (i, synergy_with(&bundle, o)))
            .filter(|(_, s)| *s > 0.0)
            .max_by(|(ia, sa), (ib, sb)| sa.total_cmp(sb).then_with(|| ib.cmp(ia)))
            .map(|(i, _)| i);

        let Some(index) = best else { break };
        let pick = remaining.remove(index);

        match validate_addition(&bundle, pick, constraints) {
            Ok(()) => bundle.push(pick.clone()),
            Err(reason) => debug!("Skipping {}: {}", pick.id, reason),
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::opportunity;
    use crate::types::OpportunityKind;
    use rust_decimal_macros::dec;

    fn ids(bundle: &BundleCandidate) -> Vec<&str> {
        bundle.transactions.iter().map(|o| o.id.as_str()).collect()
    }

    fn constraints(max: usize) -> BundleConstraints {
        BundleConstraints { max_bundle_size: max, ..Default::default() }
    }

    #[test]
    fn greedy_takes_highest_profit_first() {
        let opps = vec![
            opportunity("a", dec!(0.1)),
            opportunity("b", dec!(0.3)),
            opportunity("c", dec!(0.2)),
        ];
        assert_eq!(ids(&greedy(&opps, &constraints(2))), vec!["b", "c"]);
    }

    #[test]
    fn greedy_skips_failing_candidate_and_continues() {
        let mut risky = opportunity("risky", dec!(0.9));
        risky.declared_risk_score = 20.0;
        let opps = vec![risky, opportunity("a", dec!(0.2)), opportunity("b", dec!(0.1))];
        assert_eq!(ids(&greedy(&opps, &constraints(3))), vec!["a", "b"]);
    }

    #[test]
    fn risk_averse_filters_and_orders_by_risk() {
        let mut calm = opportunity("calm", dec!(0.1));
        calm.declared_risk_score = 1.0;
        let mut mid = opportunity("mid", dec!(0.5));
        mid.declared_risk_score = 4.0;
        let mut wild = opportunity("wild", dec!(0.9));
        wild.declared_risk_score = 6.0;
        let bundle = risk_averse(&[wild, mid, calm], &constraints(5));
        assert_eq!(ids(&bundle), vec!["calm", "mid"]);
    }

    #[test]
    fn diversified_prefers_new_kinds() {
        let a = opportunity("a", dec!(0.5));
        let b = opportunity("b", dec!(0.4));
        let mut liq = opportunity("liq", dec!(0.05));
        liq.kind = OpportunityKind::Liquidation;
        liq.primary_venue = "solend".to_string();
        liq.secondary_venue = None;

        let bundle = diversified(&[a, b, liq], &constraints(2));
        assert_eq!(ids(&bundle), vec!["a", "liq"]);
    }

    #[test]
    fn synergistic_requires_positive_synergy() {
        let seed = opportunity("seed", dec!(0.5));
        let mut loner = opportunity("loner", dec!(0.4));
        loner.kind = OpportunityKind::Liquidation;
        loner.primary_venue = "phoenix".to_string();
        loner.secondary_venue = None;
        loner.tokens = vec!["BONK".to_string()];
        let partner = opportunity("partner", dec!(0.1));

        let bundle = synergistic(&[loner, seed, partner], &constraints(5));
        assert_eq!(ids(&bundle), vec!["seed", "partner"]);
    }

    #[test]
    fn balanced_ranks_by_composite_score() {
        let mut pricey = opportunity("pricey", dec!(0.5));
        pricey.declared_gas_cost = dec!(0.2);
        pricey.declared_risk_score = 6.9;
        let lean = opportunity("lean", dec!(0.45));
        let bundle = balanced(&[pricey, lean], &constraints(1));
        assert_eq!(ids(&bundle), vec!["lean"]);
    }
}
