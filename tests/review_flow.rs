// Review operations end to end over the in-memory store

use chrono::{Duration, Utc};
use expert_reputation::db::{MemoryReputationStore, ReputationStore};
use expert_reputation::domain::reviews::ReviewService;
use expert_reputation::domain::DomainError;
use expert_reputation::models::{
    Badge, BadgeSet, ExpertDetails, NewReview, NotificationType, PageRequest, ProgressLevel,
    ReviewContent, Satisfaction, SubmitReviewPayload, UpdateReviewPayload,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

fn expert_with(badges: &[Badge], expertise: usize) -> ExpertDetails {
    ExpertDetails {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        ratings: Decimal::ZERO,
        progress_level: ProgressLevel::Bronze,
        badges: badges.iter().copied().collect(),
        expertise: (0..expertise).map(|i| format!("skill-{}", i)).collect(),
    }
}

fn payload(rating: i32) -> SubmitReviewPayload {
    SubmitReviewPayload {
        session_id: Some(format!("session-{}", rating)),
        rating,
        satisfaction: "VERY_SATISFIED".to_string(),
        remarks: Some("great session".to_string()),
    }
}

async fn setup(expert: &ExpertDetails) -> (MemoryReputationStore, ReviewService<MemoryReputationStore>) {
    let store = MemoryReputationStore::new();
    store.insert_expert(expert.clone()).await;
    (store.clone(), ReviewService::new(store))
}

fn seeded_review(expert_id: Uuid, rating: i32) -> NewReview {
    NewReview {
        expert_id,
        reviewer_id: Uuid::new_v4(),
        session_id: None,
        content: ReviewContent {
            rating,
            satisfaction: Satisfaction::Satisfied,
            remarks: None,
        },
    }
}

#[tokio::test]
async fn test_tenth_five_star_review_earns_silver_and_top_rated() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;

    // Outside the IN_DEMAND window so only TOP_RATED changes on the tenth
    let long_ago = Utc::now() - Duration::days(90);
    for _ in 0..9 {
        store.seed_review(seeded_review(expert.id, 5), long_ago).await.unwrap();
    }
    service.recompute_expert_reputation(expert.id).await.unwrap();

    let after_nine = store.expert(expert.id).await.unwrap();
    assert_eq!(after_nine.ratings, dec!(5.0));
    assert_eq!(after_nine.progress_level, ProgressLevel::Bronze);
    assert!(!after_nine.badges.contains(&Badge::TopRated));
    assert!(after_nine.badges.contains(&Badge::RisingExpert));
    let notified_before = store.notifications().await.len();

    let mutation = service
        .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(5))
        .await
        .unwrap();
    assert!(mutation.created);
    assert_eq!(mutation.reputation.earned_badges, vec![Badge::TopRated]);

    let after_ten = store.expert(expert.id).await.unwrap();
    assert_eq!(after_ten.progress_level, ProgressLevel::Silver);
    assert!(after_ten.badges.contains(&Badge::TopRated));
    assert!(!after_ten.badges.contains(&Badge::RisingExpert));

    let notifications = store.notifications().await;
    let new: Vec<_> = notifications[notified_before..].to_vec();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].kind, NotificationType::BadgeEarned);
    assert_eq!(new[0].recipient_id, expert.user_id);
    assert_eq!(new[0].sender_id, None);
    assert!(new[0].content.contains("TOP RATED"));
}

#[tokio::test]
async fn test_second_submission_updates_same_review() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;
    let reviewer = Uuid::new_v4();

    let first = service
        .submit_or_update_review(reviewer, expert.user_id, payload(2))
        .await
        .unwrap();
    let second = service
        .submit_or_update_review(reviewer, expert.user_id, payload(4))
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.review.id, second.review.id);
    assert_eq!(first.review.created_at, second.review.created_at);
    assert_eq!(second.review.rating, 4);
    assert_eq!(second.review.session_id.as_deref(), Some("session-4"));

    assert_eq!(store.reviews_for(expert.id).await.len(), 1);
    assert_eq!(store.expert(expert.id).await.unwrap().ratings, dec!(4.0));
}

#[tokio::test]
async fn test_deleting_only_review_resets_reputation() {
    let expert = expert_with(&[Badge::Specialist], 3);
    let (store, service) = setup(&expert).await;
    let reviewer = Uuid::new_v4();

    let mutation = service
        .submit_or_update_review(reviewer, expert.user_id, payload(5))
        .await
        .unwrap();
    let with_review = store.expert(expert.id).await.unwrap();
    assert!(with_review.badges.contains(&Badge::VersatilePro));

    service
        .delete_review(mutation.review.id, reviewer)
        .await
        .unwrap();

    let after = store.expert(expert.id).await.unwrap();
    assert!(store.reviews_for(expert.id).await.is_empty());
    assert_eq!(after.ratings, Decimal::ZERO);
    assert_eq!(after.progress_level, ProgressLevel::Bronze);
    assert_eq!(after.badges, [Badge::Specialist].into_iter().collect::<BadgeSet>());
}

#[tokio::test]
async fn test_revoked_badges_send_no_notification() {
    let expert = expert_with(&[], 3);
    let (store, service) = setup(&expert).await;
    let reviewer = Uuid::new_v4();

    let mutation = service
        .submit_or_update_review(reviewer, expert.user_id, payload(5))
        .await
        .unwrap();
    assert_eq!(mutation.reputation.earned_badges, vec![Badge::VersatilePro]);
    assert_eq!(store.notifications().await.len(), 1);

    let lowered = service
        .update_review(
            mutation.review.id,
            reviewer,
            UpdateReviewPayload {
                rating: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(lowered.reputation.earned_badges.is_empty());
    assert!(!store.expert(expert.id).await.unwrap().badges.contains(&Badge::VersatilePro));
    assert_eq!(store.notifications().await.len(), 1);
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let expert = expert_with(&[Badge::QuickResponder], 0);
    let (store, service) = setup(&expert).await;
    for _ in 0..4 {
        service
            .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(4))
            .await
            .unwrap();
    }
    let before = store.expert(expert.id).await.unwrap();
    let notified = store.notifications().await.len();

    let first = service.recompute_expert_reputation(expert.id).await.unwrap();
    let second = service.recompute_expert_reputation(expert.id).await.unwrap();

    assert!(first.earned_badges.is_empty());
    assert!(second.earned_badges.is_empty());
    assert_eq!(first.update, second.update);
    assert_eq!(store.expert(expert.id).await.unwrap(), before);
    assert_eq!(store.notifications().await.len(), notified);
}

#[tokio::test]
async fn test_recompute_unknown_expert_is_not_found() {
    let service = ReviewService::new(MemoryReputationStore::new());
    let err = service
        .recompute_expert_reputation(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_in_demand_counts_only_recent_reviews() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;
    let now = Utc::now();

    for i in 0..12 {
        let created_at = if i < 9 {
            now - Duration::days(5)
        } else {
            now - Duration::days(45)
        };
        store
            .seed_review(seeded_review(expert.id, 3), created_at)
            .await
            .unwrap();
    }

    let outcome = service.recompute_expert_reputation(expert.id).await.unwrap();
    assert!(!outcome.update.badges.contains(&Badge::InDemand));

    // Tenth recent review
    let mutation = service
        .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(3))
        .await
        .unwrap();
    assert!(mutation.reputation.earned_badges.contains(&Badge::InDemand));
}

#[tokio::test]
async fn test_only_author_can_modify_review() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;
    let author = Uuid::new_v4();
    let intruder = Uuid::new_v4();

    let mutation = service
        .submit_or_update_review(author, expert.user_id, payload(3))
        .await
        .unwrap();

    let err = service
        .delete_review(mutation.review.id, intruder)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    let err = service
        .update_review(mutation.review.id, intruder, UpdateReviewPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    assert_eq!(store.reviews_for(expert.id).await.len(), 1);
}

#[tokio::test]
async fn test_missing_review_and_expert() {
    let expert = expert_with(&[], 0);
    let (_store, service) = setup(&expert).await;

    let err = service
        .delete_review(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = service
        .submit_or_update_review(Uuid::new_v4(), Uuid::new_v4(), payload(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = service
        .get_expert_reviews(Uuid::new_v4(), PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_self_review_and_invalid_payload_rejected() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;

    let err = service
        .submit_or_update_review(expert.user_id, expert.user_id, payload(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = service
        .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(9))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    assert!(store.reviews_for(expert.id).await.is_empty());
}

#[tokio::test]
async fn test_patch_keeps_unspecified_fields() {
    let expert = expert_with(&[], 0);
    let (_store, service) = setup(&expert).await;
    let reviewer = Uuid::new_v4();

    let created = service
        .submit_or_update_review(reviewer, expert.user_id, payload(3))
        .await
        .unwrap();

    let updated = service
        .update_review(
            created.review.id,
            reviewer,
            UpdateReviewPayload {
                satisfaction: Some("neutral".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.review.id, created.review.id);
    assert_eq!(updated.review.rating, 3);
    assert_eq!(updated.review.satisfaction, Satisfaction::Neutral);
    assert_eq!(updated.review.remarks.as_deref(), Some("great session"));
    assert_eq!(updated.review.session_id.as_deref(), Some("session-3"));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_mutation() {
    let expert = expert_with(&[], 3);
    let (store, service) = setup(&expert).await;
    store.set_fail_notifications(true);

    let mutation = service
        .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(5))
        .await
        .unwrap();

    assert_eq!(mutation.reputation.earned_badges, vec![Badge::VersatilePro]);
    assert!(store.expert(expert.id).await.unwrap().badges.contains(&Badge::VersatilePro));
    assert!(store.notifications().await.is_empty());
}

#[tokio::test]
async fn test_failed_recompute_rolls_back_review() {
    let expert = expert_with(&[], 0);
    let (store, service) = setup(&expert).await;
    store.set_fail_reputation_updates(true);

    let err = service
        .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(5))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Database(_)));
    assert!(store.reviews_for(expert.id).await.is_empty());
    assert_eq!(store.expert(expert.id).await.unwrap(), expert);
}

#[tokio::test]
async fn test_user_and_expert_pages() {
    let expert = expert_with(&[], 0);
    let other = expert_with(&[], 0);
    let store = MemoryReputationStore::new();
    store.insert_expert(expert.clone()).await;
    store.insert_expert(other.clone()).await;
    let service = ReviewService::new(store.clone());
    let reviewer = Uuid::new_v4();

    for rating in 1..=3 {
        service
            .submit_or_update_review(Uuid::new_v4(), expert.user_id, payload(rating))
            .await
            .unwrap();
    }
    service
        .submit_or_update_review(reviewer, expert.user_id, payload(5))
        .await
        .unwrap();
    service
        .submit_or_update_review(reviewer, other.user_id, payload(4))
        .await
        .unwrap();

    let page = service
        .get_expert_reviews(expert.id, PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap();
    assert_eq!(page.reviews.total, 4);
    assert_eq!(page.reviews.reviews.len(), 2);
    assert_eq!(page.expert.ratings, dec!(2.8));

    let mine = service
        .get_user_reviews(reviewer, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.reviews.iter().all(|review| review.reviewer_id == reviewer));

    assert!(store.find_expert(other.id).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_stay_consistent() {
    let expert = expert_with(&[], 0);
    let store = MemoryReputationStore::new();
    store.insert_expert(expert.clone()).await;
    let service = Arc::new(ReviewService::new(store.clone()));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let service = Arc::clone(&service);
            let expert_user = expert.user_id;
            tokio::spawn(async move {
                service
                    .submit_or_update_review(Uuid::new_v4(), expert_user, payload(1 + i % 5))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let reviews = store.reviews_for(expert.id).await;
    assert_eq!(reviews.len(), 20);

    // 4 of each rating 1..=5
    let after = store.expert(expert.id).await.unwrap();
    assert_eq!(after.ratings, dec!(3.0));
    assert_eq!(after.progress_level, ProgressLevel::Bronze);
    assert!(after.badges.contains(&Badge::InDemand));
}
