// Database queries organized by table
// Functions taking a transaction run under the caller's expert lock;
// functions taking the pool are plain reads

pub mod experts;
pub mod reviews;
pub mod notifications;

pub use experts::{find_expert, lock_expert, lock_expert_by_user, update_expert_reputation};
pub use reviews::{
    count_recent_reviews, delete_review, find_review, find_review_by_pair, insert_review,
    list_reviews_for_expert, list_reviews_page, update_review,
};
pub use notifications::insert_notification;
