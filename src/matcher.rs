//! Cross-platform product matching.
//!
//! Greedy single-pass clustering over a record batch: each unassigned
//! record seeds a candidate group and absorbs every later unassigned record
//! whose name similarity clears the threshold. A candidate group survives
//! only when its members span at least two distinct platforms; members of a
//! discarded group are never marked assigned and stay available to later
//! seeds. First seed wins on borderline records — the pass is
//! order-sensitive by design.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::DEFAULT_SIMILARITY_THRESHOLD;
use crate::text::similarity::{score_prepared, PreparedName};
use crate::types::{MatchGroup, PriceSpread, ProductRecord, RatingSpread};
use crate::util::percentage_change;

pub struct ProductMatcher {
    threshold: f64,
}

impl Default for ProductMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl ProductMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Cluster mutually similar records into cross-platform match groups.
    /// Comparisons are O(n²); names are tokenized once per batch.
    pub fn find_matches(&self, records: &[ProductRecord]) -> Vec<MatchGroup> {
        if records.len() < 2 {
            return Vec::new();
        }

        let prepared: Vec<PreparedName> =
            records.iter().map(|r| PreparedName::of(&r.name)).collect();
        let mut assigned = vec![false; records.len()];
        let mut groups = Vec::new();

        for i in 0..records.len() {
            if assigned[i] {
                continue;
            }

            let mut member_idx = vec![i];
            for j in (i + 1)..records.len() {
                if assigned[j] {
                    continue;
                }
                let score = score_prepared(&prepared[i], &prepared[j]);
                if score >= self.threshold {
                    member_idx.push(j);
                }
            }

            if member_idx.len() < 2 {
                continue;
            }

            let distinct: BTreeSet<&str> = member_idx
                .iter()
                .map(|&k| records[k].platform.as_str())
                .collect();
            if distinct.len() < 2 {
                // single-platform cluster: discard, leave members seedable
                debug!(
                    seed = %records[i].name,
                    members = member_idx.len(),
                    "discarding single-platform candidate group"
                );
                continue;
            }

            for &k in &member_idx {
                assigned[k] = true;
            }
            groups.push(build_group(records, &member_idx));
        }

        groups
    }
}

fn build_group(records: &[ProductRecord], member_idx: &[usize]) -> MatchGroup {
    let members: Vec<ProductRecord> = member_idx.iter().map(|&k| records[k].clone()).collect();
    let platforms: Vec<String> = members.iter().map(|m| m.platform.clone()).collect();
    let platform_count = platforms.iter().collect::<BTreeSet<_>>().len();

    MatchGroup {
        product_name: members[0].name.clone(),
        platforms,
        platform_count,
        price_spread: price_spread(&members),
        rating_spread: rating_spread(&members),
        members,
    }
}

/// Price spread over members with a usable price. Ties on min/max resolve
/// to the first member in input order.
fn price_spread(members: &[ProductRecord]) -> Option<PriceSpread> {
    let priced: Vec<&ProductRecord> = members.iter().filter(|m| m.has_valid_price()).collect();
    if priced.is_empty() {
        return None;
    }

    let min_price = priced.iter().map(|m| m.price).fold(f64::INFINITY, f64::min);
    let max_price = priced.iter().map(|m| m.price).fold(f64::NEG_INFINITY, f64::max);
    let cheapest = priced.iter().find(|m| m.price == min_price)?;
    let most_expensive = priced.iter().find(|m| m.price == max_price)?;

    Some(PriceSpread {
        min_price,
        max_price,
        price_difference: max_price - min_price,
        price_difference_percent: percentage_change(min_price, max_price),
        cheapest_platform: cheapest.platform.clone(),
        most_expensive_platform: most_expensive.platform.clone(),
    })
}

fn rating_spread(members: &[ProductRecord]) -> Option<RatingSpread> {
    let rated: Vec<(&ProductRecord, f64)> = members
        .iter()
        .filter_map(|m| m.rating.map(|r| (m, r)))
        .collect();
    if rated.is_empty() {
        return None;
    }

    let min_rating = rated.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
    let max_rating = rated.iter().map(|(_, r)| *r).fold(f64::NEG_INFINITY, f64::max);
    let avg_rating = rated.iter().map(|(_, r)| *r).sum::<f64>() / rated.len() as f64;
    let best = rated.iter().find(|(_, r)| *r == max_rating)?;

    Some(RatingSpread {
        min_rating,
        max_rating,
        avg_rating,
        rating_range: max_rating - min_rating,
        highest_rated_platform: best.0.platform.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(platform: &str, id: &str, name: &str, price: f64) -> ProductRecord {
        ProductRecord::new(platform, id, name, price, "USD", "In Stock", "https://example.com/p")
    }

    #[test]
    fn matches_same_product_across_platforms() {
        let records = vec![
            record("amazon", "1", "Apple iPhone 15 Pro 256GB", 999.0),
            record("ebay", "2", "iPhone15 Pro 256G", 949.0),
            record("jd", "3", "Samsung Galaxy S24", 899.0),
        ];
        let groups = ProductMatcher::default().find_matches(&records);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.platform_count, 2);
        assert_eq!(group.members.len(), 2);

        let spread = group.price_spread.as_ref().unwrap();
        assert_eq!(spread.min_price, 949.0);
        assert_eq!(spread.max_price, 999.0);
        assert_eq!(spread.price_difference, 50.0);
        assert_eq!(spread.cheapest_platform, "ebay");
        assert_eq!(spread.most_expensive_platform, "amazon");
    }

    #[test]
    fn single_platform_batch_yields_no_groups() {
        let records = vec![
            record("amazon", "1", "Apple iPhone 15 Pro 256GB", 999.0),
            record("amazon", "2", "Apple iPhone 15 Pro 256GB", 989.0),
            record("amazon", "3", "Apple iPhone 15 Pro 256GB", 1009.0),
        ];
        let groups = ProductMatcher::default().find_matches(&records);
        assert!(groups.is_empty());
    }

    #[test]
    fn discarded_group_members_stay_available_to_later_seeds() {
        // Seed 0 absorbs its same-platform neighbor but no cross-platform
        // record, so the candidate group is discarded. Record 1 must remain
        // unassigned and seed the accepted cross-platform group with 2.
        let records = vec![
            record("a", "1", "Acme Widget", 10.0),
            record("a", "2", "Acme Widget Pro", 11.0),
            record("b", "3", "Acme Widget Pro Max", 12.0),
        ];
        let groups = ProductMatcher::new(0.75).find_matches(&records);
        assert_eq!(groups.len(), 1);
        let ids: Vec<&str> = groups[0].members.iter().map(|m| m.product_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(groups[0].platform_count, 2);
    }

    #[test]
    fn same_platform_duplicate_of_seed_joins_but_cannot_carry_a_group() {
        let records = vec![
            record("a", "1", "Acme Widget Deluxe", 10.0),
            record("b", "2", "Acme Widget Deluxe", 12.0),
            record("a", "3", "Acme Widget Deluxe", 11.0),
        ];
        let groups = ProductMatcher::default().find_matches(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
        // three members, two distinct platforms
        assert_eq!(groups[0].platform_count, 2);
    }

    #[test]
    fn empty_names_join_nothing() {
        let records = vec![
            record("a", "1", "", 10.0),
            record("b", "2", "", 11.0),
            record("c", "3", "Acme Widget", 12.0),
        ];
        let groups = ProductMatcher::default().find_matches(&records);
        assert!(groups.is_empty());
    }

    #[test]
    fn no_matches_is_an_empty_list() {
        let records = vec![
            record("a", "1", "Garden hose 25ft", 20.0),
            record("b", "2", "Espresso machine", 250.0),
        ];
        let groups = ProductMatcher::default().find_matches(&records);
        assert!(groups.is_empty());
    }

    #[test]
    fn rating_spread_reports_highest_rated_platform() {
        let mut r1 = record("a", "1", "Acme Widget Deluxe", 10.0);
        r1.rating = Some(4.0);
        let mut r2 = record("b", "2", "Acme Widget Deluxe", 12.0);
        r2.rating = Some(4.8);
        let groups = ProductMatcher::default().find_matches(&[r1, r2]);
        assert_eq!(groups.len(), 1);
        let rs = groups[0].rating_spread.as_ref().unwrap();
        assert_eq!(rs.max_rating, 4.8);
        assert_eq!(rs.highest_rated_platform, "b");
        assert!((rs.avg_rating - 4.4).abs() < 1e-9);
    }
}
