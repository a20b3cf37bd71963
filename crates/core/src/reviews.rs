//! Embedded product reviews and their rating aggregate.
//!
//! Reviews live inside their product. Every mutation goes through
//! [`upsert_review`] or [`remove_review`], which return the new review list
//! together with the recomputed aggregate so the two can never drift apart.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Rejected review input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Rating outside `MIN_RATING..=MAX_RATING`.
    #[error("rating must be between {MIN_RATING} and {MAX_RATING}, got {0}")]
    RatingOutOfRange(i64),
    /// Empty comment.
    #[error("comment cannot be empty")]
    EmptyComment,
}

/// A single review, owned by its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// The reviewing account.
    pub user: AccountId,
    /// Reviewer display name at the time of writing.
    pub name: String,
    /// Rating, `1..=5`.
    pub rating: u8,
    /// Free-text comment.
    pub comment: String,
}

impl Review {
    /// Build a validated review.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError` if the rating is out of range or the comment is
    /// blank.
    pub fn new(
        user: AccountId,
        name: impl Into<String>,
        rating: i64,
        comment: &str,
    ) -> Result<Self, ReviewError> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or(ReviewError::RatingOutOfRange(rating))?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }
        Ok(Self {
            user,
            name: name.into(),
            rating,
            comment: comment.to_owned(),
        })
    }
}

/// A product's review list with its derived aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSet {
    /// Reviews in submission order, at most one per reviewer.
    pub reviews: Vec<Review>,
    /// Mean rating, `0.0` when there are no reviews.
    pub ratings: f64,
    /// Number of reviews.
    pub number_of_reviews: i32,
}

impl ReviewSet {
    /// Wrap a review list, computing its aggregate.
    #[must_use]
    pub fn from_reviews(reviews: Vec<Review>) -> Self {
        let ratings = average_rating(&reviews);
        let number_of_reviews = i32::try_from(reviews.len()).unwrap_or(i32::MAX);
        Self {
            reviews,
            ratings,
            number_of_reviews,
        }
    }

    /// The review left by `user`, if any.
    #[must_use]
    pub fn by_reviewer(&self, user: AccountId) -> Option<&Review> {
        self.reviews.iter().find(|r| r.user == user)
    }
}

/// Mean of the ratings, `0.0` for an empty slice.
#[must_use]
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    #[allow(clippy::cast_precision_loss)] // review counts never approach 2^52
    let count = reviews.len() as f64;
    f64::from(total) / count
}

/// Insert `review`, replacing the reviewer's earlier review in place.
#[must_use]
pub fn upsert_review(current: &[Review], review: Review) -> ReviewSet {
    let mut reviews = current.to_vec();
    match reviews.iter_mut().find(|r| r.user == review.user) {
        Some(existing) => {
            existing.rating = review.rating;
            existing.comment = review.comment;
        }
        None => reviews.push(review),
    }
    ReviewSet::from_reviews(reviews)
}

/// Remove the review left by `user`. Returns `None` if there was none.
#[must_use]
pub fn remove_review(current: &[Review], user: AccountId) -> Option<ReviewSet> {
    if !current.iter().any(|r| r.user == user) {
        return None;
    }
    let reviews = current.iter().filter(|r| r.user != user).cloned().collect();
    Some(ReviewSet::from_reviews(reviews))
}
