// API handlers - thin HTTP orchestration layer
// Handlers only deal with HTTP concerns:
// 1. Extract parameters from request
// 2. Perform authentication
// 3. Call domain logic
// 4. Transform domain result to HTTP response

pub mod reviews;

pub use reviews::{
    delete_review_handler, expert_reviews_handler, submit_review_handler, update_review_handler,
    user_reviews_handler,
};
