//! The contract every recommender implements.

use recipe_core::{RecipeId, RecommenderError, RecommenderResult};

/// Whether a recommender needs to know who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityNeed {
    /// Results are personalised; the caller's user id is passed through.
    Required,
    /// Results are the same for everyone; no user id is passed.
    Unused,
}

/// A recommendation strategy over an in-memory snapshot of the data.
///
/// `recommend` returns at most `count` recipe ids, best first. A failure is
/// reported through the `Err` arm; callers combining several strategies
/// decide whether to treat it as an empty list.
pub trait Recommender: Send + Sync {
    fn identity_need(&self) -> IdentityNeed {
        IdentityNeed::Required
    }

    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>>;
}

/// Unwraps the user id for strategies that declare `IdentityNeed::Required`.
pub(crate) fn require_user<'a>(user_id: Option<&'a str>, strategy: &str) -> RecommenderResult<&'a str> {
    user_id.ok_or_else(|| {
        RecommenderError::InvalidArgument(format!("{strategy} recommendations need a user id"))
    })
}
