//! Hybrid recommender: weighted voting across several strategies.
//!
//! Every registered recommender is asked, in registration order, for twice
//! as many candidates as the caller wants. Each candidate is counted once
//! per unit of the recommender's weight, where the weight is truncated to
//! a whole number (1.5 counts as 1, anything below 1 counts as nothing).
//! Recipes are ranked by total count; ties go to whichever recipe appeared
//! first, so earlier-registered, heavier and higher-ranked candidates win.
//!
//! A recommender that fails is logged and contributes nothing for that
//! call. It never fails the aggregation.

use recipe_core::{RecipeId, RecommenderError, RecommenderResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::strategy::{IdentityNeed, Recommender};

/// Candidates requested from each member per result slot.
const CANDIDATE_MULTIPLIER: usize = 2;

struct Member {
    name: String,
    recommender: Arc<dyn Recommender>,
    weight: f64,
}

impl Member {
    /// Whole votes per candidate. Huge weights saturate at `usize::MAX`.
    fn votes(&self) -> usize {
        if self.weight >= 1.0 {
            self.weight.trunc() as usize
        } else {
            0
        }
    }
}

pub struct HybridRecommender {
    members: Vec<Member>,
}

impl HybridRecommender {
    /// Register `recommenders` in the given order. Names must be unique;
    /// names missing from `weights` weigh 1.0.
    pub fn new(
        recommenders: Vec<(String, Arc<dyn Recommender>)>,
        weights: Option<HashMap<String, f64>>,
    ) -> RecommenderResult<Self> {
        let weights = weights.unwrap_or_default();
        let mut members: Vec<Member> = Vec::with_capacity(recommenders.len());

        for (name, recommender) in recommenders {
            if members.iter().any(|m| m.name == name) {
                return Err(RecommenderError::DuplicateRecommender(name));
            }
            let weight = weights.get(&name).copied().unwrap_or(1.0);
            if !weight.is_finite() {
                return Err(RecommenderError::InvalidWeight { name, weight });
            }
            members.push(Member {
                name,
                recommender,
                weight,
            });
        }

        Ok(Self { members })
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn weight(&self, name: &str) -> Option<f64> {
        self.members.iter().find(|m| m.name == name).map(|m| m.weight)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Combine every member's candidates into the `top_n` most voted
    /// recipes. Errors only when `top_n` is zero.
    pub fn recommend_top(
        &self,
        user_id: Option<&str>,
        top_n: usize,
    ) -> RecommenderResult<Vec<RecipeId>> {
        if top_n == 0 {
            return Err(RecommenderError::InvalidArgument(
                "top_n must be a positive integer".to_string(),
            ));
        }

        let per_member = top_n.saturating_mul(CANDIDATE_MULTIPLIER);
        // (recipe, votes) in order of first appearance
        let mut tally: Vec<(RecipeId, usize)> = Vec::new();
        let mut positions: HashMap<RecipeId, usize> = HashMap::new();

        for member in &self.members {
            let identity = match member.recommender.identity_need() {
                IdentityNeed::Required => user_id,
                IdentityNeed::Unused => None,
            };

            let candidates = match member.recommender.recommend(identity, per_member) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(recommender = %member.name, error = %e, "Recommender failed, skipping");
                    metrics::counter!(
                        "recommender.hybrid.strategy_failures",
                        "strategy" => member.name.clone()
                    )
                    .increment(1);
                    continue;
                }
            };

            let votes = member.votes();
            debug!(
                recommender = %member.name,
                candidates = candidates.len(),
                votes,
                "Collected candidates"
            );
            if votes == 0 {
                continue;
            }

            for recipe_id in candidates {
                match positions.get(&recipe_id) {
                    Some(&i) => tally[i].1 = tally[i].1.saturating_add(votes),
                    None => {
                        positions.insert(recipe_id.clone(), tally.len());
                        tally.push((recipe_id, votes));
                    }
                }
            }
        }

        // stable: equal counts keep first-appearance order
        tally.sort_by(|a, b| b.1.cmp(&a.1));
        tally.truncate(top_n);
        Ok(tally.into_iter().map(|(id, _)| id).collect())
    }
}

impl Recommender for HybridRecommender {
    fn identity_need(&self) -> IdentityNeed {
        if self
            .members
            .iter()
            .any(|m| m.recommender.identity_need() == IdentityNeed::Required)
        {
            IdentityNeed::Required
        } else {
            IdentityNeed::Unused
        }
    }

    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        self.recommend_top(user_id, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Returns a fixed list, truncated to the requested count.
    struct Fixed {
        ids: Vec<&'static str>,
        need: IdentityNeed,
    }

    impl Fixed {
        fn new(ids: &[&'static str]) -> Arc<dyn Recommender> {
            Arc::new(Self {
                ids: ids.to_vec(),
                need: IdentityNeed::Required,
            })
        }
    }

    impl Recommender for Fixed {
        fn identity_need(&self) -> IdentityNeed {
            self.need
        }

        fn recommend(&self, _user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
            Ok(self.ids.iter().take(count).map(|s| s.to_string()).collect())
        }
    }

    struct Failing;

    impl Recommender for Failing {
        fn recommend(&self, _user_id: Option<&str>, _count: usize) -> RecommenderResult<Vec<RecipeId>> {
            Err(RecommenderError::Strategy {
                name: "failing".into(),
                message: "backing store unavailable".into(),
            })
        }
    }

    /// Records what it was called with.
    #[derive(Default)]
    struct Spy {
        need: Option<IdentityNeed>,
        calls: Mutex<Vec<(Option<String>, usize)>>,
    }

    impl Recommender for Spy {
        fn identity_need(&self) -> IdentityNeed {
            self.need.unwrap_or(IdentityNeed::Required)
        }

        fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
            self.calls
                .lock()
                .unwrap()
                .push((user_id.map(str::to_string), count));
            Ok(Vec::new())
        }
    }

    fn named(pairs: Vec<(&str, Arc<dyn Recommender>)>) -> Vec<(String, Arc<dyn Recommender>)> {
        pairs.into_iter().map(|(n, r)| (n.to_string(), r)).collect()
    }

    fn weights(pairs: &[(&str, f64)]) -> Option<HashMap<String, f64>> {
        Some(pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect())
    }

    #[test]
    fn test_single_recommender_keeps_order_and_truncates() {
        let hybrid = HybridRecommender::new(named(vec![("x", Fixed::new(&["A", "B", "C"]))]), None).unwrap();
        assert_eq!(hybrid.recommend_top(Some("u1"), 2).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_weighted_votes() {
        // X (w=2): A, B  Y (w=1): B, C  => A:2 B:3 C:1
        let hybrid = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A", "B"])), ("y", Fixed::new(&["B", "C"]))]),
            weights(&[("x", 2.0), ("y", 1.0)]),
        )
        .unwrap();
        assert_eq!(hybrid.recommend_top(Some("u1"), 3).unwrap(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_ties_keep_first_appearance_order() {
        // every id ends with one vote; first appearance is D, A, B, C
        let hybrid = HybridRecommender::new(
            named(vec![("first", Fixed::new(&["D", "A"])), ("second", Fixed::new(&["B", "C"]))]),
            None,
        )
        .unwrap();
        assert_eq!(
            hybrid.recommend_top(Some("u1"), 4).unwrap(),
            vec!["D", "A", "B", "C"]
        );

        // overlapping lists with equal final tallies: B:2 C:2, then A:1 D:1
        let hybrid = HybridRecommender::new(
            named(vec![("first", Fixed::new(&["A", "B", "C"])), ("second", Fixed::new(&["C", "B", "D"]))]),
            None,
        )
        .unwrap();
        assert_eq!(
            hybrid.recommend_top(Some("u1"), 4).unwrap(),
            vec!["B", "C", "A", "D"]
        );
    }

    #[test]
    fn test_registration_order_decides_ties() {
        let a_first = HybridRecommender::new(
            named(vec![("p", Fixed::new(&["A"])), ("q", Fixed::new(&["B"]))]),
            None,
        )
        .unwrap();
        let b_first = HybridRecommender::new(
            named(vec![("q", Fixed::new(&["B"])), ("p", Fixed::new(&["A"]))]),
            None,
        )
        .unwrap();
        assert_eq!(a_first.recommend_top(None, 1).unwrap(), vec!["A"]);
        assert_eq!(b_first.recommend_top(None, 1).unwrap(), vec!["B"]);
    }

    #[test]
    fn test_failing_recommender_is_equivalent_to_absent() {
        let with_failure = HybridRecommender::new(
            named(vec![
                ("broken", Arc::new(Failing)),
                ("x", Fixed::new(&["A", "B"])),
                ("y", Fixed::new(&["B", "C"])),
            ]),
            None,
        )
        .unwrap();
        let without = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A", "B"])), ("y", Fixed::new(&["B", "C"]))]),
            None,
        )
        .unwrap();
        assert_eq!(
            with_failure.recommend_top(Some("u1"), 3).unwrap(),
            without.recommend_top(Some("u1"), 3).unwrap()
        );
    }

    #[test]
    fn test_all_failing_or_empty_gives_empty_result() {
        let failing = HybridRecommender::new(named(vec![("broken", Arc::new(Failing))]), None).unwrap();
        assert!(failing.recommend_top(Some("u1"), 5).unwrap().is_empty());

        let empty = HybridRecommender::new(
            named(vec![("a", Fixed::new(&[])), ("b", Fixed::new(&[]))]),
            None,
        )
        .unwrap();
        assert!(empty.recommend_top(Some("u1"), 5).unwrap().is_empty());

        let none = HybridRecommender::new(Vec::new(), None).unwrap();
        assert!(none.is_empty());
        assert!(none.recommend_top(Some("u1"), 5).unwrap().is_empty());
    }

    #[test]
    fn test_zero_top_n_is_rejected() {
        let hybrid = HybridRecommender::new(named(vec![("x", Fixed::new(&["A"]))]), None).unwrap();
        let err = hybrid.recommend_top(Some("u1"), 0).unwrap_err();
        assert!(matches!(err, RecommenderError::InvalidArgument(_)));
    }

    #[test]
    fn test_fractional_weights_truncate() {
        // 1.5 counts as 1, so the tie falls back to first appearance
        let hybrid = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A"])), ("y", Fixed::new(&["B"]))]),
            weights(&[("y", 1.5)]),
        )
        .unwrap();
        assert_eq!(hybrid.recommend_top(None, 2).unwrap(), vec!["A", "B"]);

        // 2.9 counts as 2
        let hybrid = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A"])), ("y", Fixed::new(&["B"]))]),
            weights(&[("y", 2.9)]),
        )
        .unwrap();
        assert_eq!(hybrid.recommend_top(None, 2).unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn test_huge_weights_saturate_instead_of_overflowing() {
        let hybrid = HybridRecommender::new(
            named(vec![
                ("x", Fixed::new(&["A", "B"])),
                ("y", Fixed::new(&["A"])),
                ("z", Fixed::new(&["B", "C"])),
            ]),
            weights(&[("x", 1e19), ("y", 1e19), ("z", 1e300)]),
        )
        .unwrap();
        // A and B both reach usize::MAX and keep first-appearance order
        assert_eq!(hybrid.recommend_top(Some("u"), 1).unwrap(), vec!["A"]);
        assert_eq!(
            hybrid.recommend_top(Some("u"), 3).unwrap(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_zero_and_negative_weights_contribute_nothing() {
        let hybrid = HybridRecommender::new(
            named(vec![
                ("muted", Fixed::new(&["A"])),
                ("negative", Fixed::new(&["B"])),
                ("small", Fixed::new(&["C"])),
                ("x", Fixed::new(&["D"])),
            ]),
            weights(&[("muted", 0.0), ("negative", -3.0), ("small", 0.7)]),
        )
        .unwrap();
        assert_eq!(hybrid.recommend_top(None, 5).unwrap(), vec!["D"]);
    }

    #[test]
    fn test_duplicate_names_and_bad_weights_are_rejected() {
        let err = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A"])), ("x", Fixed::new(&["B"]))]),
            None,
        )
        .err()
        .unwrap();
        assert!(matches!(err, RecommenderError::DuplicateRecommender(ref n) if n == "x"));

        let err = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A"]))]),
            weights(&[("x", f64::NAN)]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, RecommenderError::InvalidWeight { .. }));
    }

    #[test]
    fn test_default_weight_for_unlisted_names() {
        let hybrid = HybridRecommender::new(
            named(vec![("x", Fixed::new(&["A"])), ("y", Fixed::new(&["B"]))]),
            weights(&[("x", 3.0)]),
        )
        .unwrap();
        assert_eq!(hybrid.weight("x"), Some(3.0));
        assert_eq!(hybrid.weight("y"), Some(1.0));
        assert_eq!(hybrid.weight("z"), None);
        assert_eq!(hybrid.member_names(), vec!["x", "y"]);
    }

    #[test]
    fn test_requests_twice_top_n_and_passes_identity_only_when_needed() {
        let personal = Arc::new(Spy::default());
        let global = Arc::new(Spy {
            need: Some(IdentityNeed::Unused),
            ..Default::default()
        });
        let hybrid = HybridRecommender::new(
            vec![
                ("personal".to_string(), personal.clone() as Arc<dyn Recommender>),
                ("global".to_string(), global.clone() as Arc<dyn Recommender>),
            ],
            None,
        )
        .unwrap();

        hybrid.recommend_top(Some("u7"), 4).unwrap();

        assert_eq!(
            *personal.calls.lock().unwrap(),
            vec![(Some("u7".to_string()), 8)]
        );
        assert_eq!(*global.calls.lock().unwrap(), vec![(None, 8)]);
        assert_eq!(hybrid.identity_need(), IdentityNeed::Required);
    }

    #[test]
    fn test_output_bounded_and_unique() {
        let hybrid = HybridRecommender::new(
            named(vec![
                ("x", Fixed::new(&["A", "B", "C", "D", "E", "F"])),
                ("y", Fixed::new(&["F", "E", "D", "G"])),
                ("z", Fixed::new(&["A", "A", "H"])),
            ]),
            weights(&[("z", 2.0)]),
        )
        .unwrap();

        let candidates: HashSet<&str> = ["A", "B", "C", "D", "E", "F", "G", "H"].into_iter().collect();
        for n in 1..=10 {
            let out = hybrid.recommend_top(Some("u1"), n).unwrap();
            assert!(out.len() <= n);
            let unique: HashSet<&String> = out.iter().collect();
            assert_eq!(unique.len(), out.len());
            assert!(out.iter().all(|id| candidates.contains(id.as_str())));
        }
    }
}
