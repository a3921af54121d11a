//! Scores used to rank candidates during composition

use std::collections::HashSet;
use crate::{
    types::{BundleCandidate, Opportunity, OpportunityKind},
    utils::to_f64,
};

pub const PROFIT_WEIGHT: f64 = 0.4;
pub const RISK_ADJUSTED_RETURN_WEIGHT: f64 = 0.35;
pub const GAS_EFFICIENCY_WEIGHT: f64 = 0.25;

pub const UNSEEN_KIND_BONUS: f64 = 1.0;
pub const UNSEEN_VENUE_BONUS: f64 = 0.5;

pub const SHARED_VENUE_SYNERGY: f64 = 0.5;
pub const SHARED_TOKEN_SYNERGY: f64 = 1.0;
pub const COMPLEMENTARY_SYNERGY: f64 = 1.5;
pub const MAX_SYNERGY: f64 = 3.0;

/// Weighted blend of normalized profit, risk-adjusted return and gas efficiency.
///
/// `max_profit` is the largest declared profit among the candidates; it keeps
/// the first two terms on a 0-1 scale.
pub fn composite_score(opportunity: &Opportunity, max_profit: f64) -> f64 {
    let profit = to_f64(opportunity.declared_profit);
    let gas = to_f64(opportunity.declared_gas_cost);
    let scale = if max_profit > 0.0 { max_profit } else { 1.0 };

    let profit_term = (profit / scale).clamp(0.0, 1.0);
    let risk_factor = 1.0 - opportunity.declared_risk_score.clamp(0.0, 10.0) / 10.0;
    let return_term = ((profit - gas) * risk_factor / scale).clamp(0.0, 1.0);
    let gas_term = if profit > 0.0 { (1.0 - gas / profit).clamp(0.0, 1.0) } else { 0.0 };

    PROFIT_WEIGHT * profit_term + RISK_ADJUSTED_RETURN_WEIGHT * return_term + GAS_EFFICIENCY_WEIGHT * gas_term
}

pub fn diversity_score(
    opportunity: &Opportunity,
    seen_kinds: &HashSet<OpportunityKind>,
    seen_venues: &HashSet<String>,
) -> f64 {
    let kind = if seen_kinds.contains(&opportunity.kind) { 0.0 } else { UNSEEN_KIND_BONUS };
    let venues = opportunity
        .venues()
        .filter(|v| !seen_venues.contains(&v.to_ascii_lowercase()))
        .count() as f64;
    kind + venues * UNSEEN_VENUE_BONUS
}

fn complementary(a: OpportunityKind, b: OpportunityKind) -> bool {
    use OpportunityKind::*;
    matches!(
        (a, b),
        (Arbitrage, Flashloan)
            | (Flashloan, Arbitrage)
            | (Liquidation, Flashloan)
            | (Flashloan, Liquidation)
            | (Sandwich, Arbitrage)
            | (Arbitrage, Sandwich)
    )
}

pub fn pair_synergy(a: &Opportunity, b: &Opportunity) -> f64 {
    let mut score = 0.0;

    if a.venues().any(|va| b.venues().any(|vb| va.eq_ignore_ascii_case(vb))) {
        score += SHARED_VENUE_SYNERGY;
    }
    if a.tokens.iter().any(|ta| b.tokens.iter().any(|tb| ta.eq_ignore_ascii_case(tb))) {
        score += SHARED_TOKEN_SYNERGY;
    }
    if complementary(a.kind, b.kind) {
        score += COMPLEMENTARY_SYNERGY;
    }

    score
}

/// Synergy of `candidate` with every current member, capped at [`MAX_SYNERGY`].
pub fn synergy_with(bundle: &BundleCandidate, candidate: &Opportunity) -> f64 {
    bundle
        .transactions
        .iter()
        .map(|member| pair_synergy(member, candidate))
        .sum::<f64>()
        .min(MAX_SYNERGY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::opportunity;
    use rust_decimal_macros::dec;

    #[test]
    fn composite_prefers_cheap_safe_profit() {
        let good = opportunity("good", dec!(0.5));
        let mut risky = opportunity("risky", dec!(0.5));
        risky.declared_risk_score = 9.0;
        assert!(composite_score(&good, 0.5) > composite_score(&risky, 0.5));
        assert!(composite_score(&good, 0.5) <= 1.0);
    }

    #[test]
    fn diversity_rewards_unseen_kind_and_venue() {
        let opp = opportunity("d", dec!(0.1));
        let empty = diversity_score(&opp, &HashSet::new(), &HashSet::new());
        assert_eq!(empty, 2.0);

        let kinds = HashSet::from([OpportunityKind::Arbitrage]);
        let venues = HashSet::from(["raydium".to_string(), "orca".to_string()]);
        assert_eq!(diversity_score(&opp, &kinds, &venues), 0.0);
    }

    #[test]
    fn synergy_components_and_cap() {
        let arb = opportunity("a", dec!(0.1));
        let mut flash = opportunity("f", dec!(0.1));
        flash.kind = OpportunityKind::Flashloan;
        assert_eq!(pair_synergy(&arb, &flash), 3.0);

        let mut bundle = BundleCandidate::default();
        bundle.push(arb.clone());
        bundle.push(opportunity("b", dec!(0.1)));
        assert_eq!(synergy_with(&bundle, &flash), MAX_SYNERGY);

        let mut unrelated = opportunity("u", dec!(0.1));
        unrelated.primary_venue = "phoenix".to_string();
        unrelated.secondary_venue = None;
        unrelated.tokens = vec!["BONK".to_string()];
        unrelated.kind = OpportunityKind::Liquidation;
        assert_eq!(pair_synergy(&arb, &unrelated), 0.0);
    }
}
