#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use expert_reputation::api::server::{router, AppState};
    use expert_reputation::db::MemoryReputationStore;
    use expert_reputation::models::{ExpertDetails, ProgressLevel};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "integration-secret";

    struct TestApp {
        app: Router,
        store: MemoryReputationStore,
        expert: ExpertDetails,
    }

    async fn setup() -> TestApp {
        let store = MemoryReputationStore::new();
        let expert = ExpertDetails {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ratings: Decimal::ZERO,
            progress_level: ProgressLevel::Bronze,
            badges: Default::default(),
            expertise: vec!["tax".to_string(), "audit".to_string(), "payroll".to_string()],
        };
        store.insert_expert(expert.clone()).await;

        let app = router(AppState::new(store.clone(), SECRET));
        TestApp { app, store, expert }
    }

    fn token_for(user_id: Uuid) -> String {
        let claims = json!({
            "id": user_id.to_string(),
            "exp": chrono::Utc::now().timestamp() + 3600,
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request(method: Method, uri: &str, user: Option<Uuid>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn review_body(rating: i32) -> Value {
        json!({
            "sessionId": "sess-1",
            "rating": rating,
            "satisfaction": "VERY_SATISFIED",
            "remarks": "Clear and helpful",
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let t = setup().await;

        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_health_check_reports_unreachable_store() {
        let t = setup().await;
        t.store.set_unavailable(true);

        let req = request(Method::GET, "/health", None, None);
        let (status, body) = send(&t.app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "DATABASE_ERROR");

        t.store.set_unavailable(false);
        let response = t
            .app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let t = setup().await;
        let uri = format!("/reviews/expert/{}", t.expert.user_id);

        let (status, body) = send(&t.app, request(Method::POST, &uri, None, Some(review_body(5)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_submit_review_returns_created() {
        let t = setup().await;
        let reviewer = Uuid::new_v4();
        let uri = format!("/reviews/expert/{}", t.expert.user_id);

        let (status, body) = send(&t.app, request(Method::POST, &uri, Some(reviewer), Some(review_body(5)))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "success");

        let review = &body["data"]["review"];
        assert_eq!(review["rating"], 5);
        assert_eq!(review["satisfaction"], "VERY_SATISFIED");
        assert_eq!(review["reviewerId"], reviewer.to_string());
        assert_eq!(review["expertId"], t.expert.id.to_string());

        let expert = t.store.expert(t.expert.id).await.unwrap();
        assert_eq!(expert.ratings, Decimal::from(5));
    }

    #[tokio::test]
    async fn test_submit_validation_errors() {
        let t = setup().await;
        let uri = format!("/reviews/expert/{}", t.expert.user_id);
        let reviewer = Some(Uuid::new_v4());

        let (status, body) = send(&t.app, request(Method::POST, &uri, reviewer, Some(review_body(6)))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let bad_satisfaction = json!({ "rating": 4, "satisfaction": "ECSTATIC" });
        let (status, body) = send(&t.app, request(Method::POST, &uri, reviewer, Some(bad_satisfaction))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let missing_rating = json!({ "satisfaction": "NEUTRAL" });
        let (status, body) = send(&t.app, request(Method::POST, &uri, reviewer, Some(missing_rating))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, body) = send(
            &t.app,
            request(Method::POST, "/reviews/expert/not-a-uuid", reviewer, Some(review_body(4))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_expert_is_not_found() {
        let t = setup().await;
        let uri = format!("/reviews/expert/{}", Uuid::new_v4());

        let (status, body) = send(&t.app, request(Method::POST, &uri, Some(Uuid::new_v4()), Some(review_body(4)))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_patch_and_delete_own_review() {
        let t = setup().await;
        let reviewer = Uuid::new_v4();
        let uri = format!("/reviews/expert/{}", t.expert.user_id);

        let (_, created) = send(&t.app, request(Method::POST, &uri, Some(reviewer), Some(review_body(2)))).await;
        let review_id = created["data"]["review"]["id"].as_str().unwrap().to_string();
        let review_uri = format!("/reviews/{}", review_id);

        // Someone else cannot touch it
        let (status, body) = send(&t.app, request(Method::DELETE, &review_uri, Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = send(
            &t.app,
            request(Method::PATCH, &review_uri, Some(reviewer), Some(json!({ "rating": 4 }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["review"]["id"], review_id.as_str());
        assert_eq!(body["data"]["review"]["rating"], 4);
        assert_eq!(body["data"]["review"]["remarks"], "Clear and helpful");

        let (status, body) = send(&t.app, request(Method::DELETE, &review_uri, Some(reviewer), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "success", "message": "Review deleted successfully" })
        );

        let (status, _) = send(&t.app, request(Method::DELETE, &review_uri, Some(reviewer), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let expert = t.store.expert(t.expert.id).await.unwrap();
        assert_eq!(expert.ratings, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_expert_reviews_page() {
        let t = setup().await;
        let uri = format!("/reviews/expert/{}", t.expert.user_id);

        for rating in [5, 5, 4] {
            let (status, _) = send(&t.app, request(Method::POST, &uri, Some(Uuid::new_v4()), Some(review_body(rating)))).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let list_uri = format!("/reviews/expert/{}?page=1&limit=2", t.expert.id);
        let (status, body) = send(&t.app, request(Method::GET, &list_uri, Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["averageRating"], 4.7);
        assert_eq!(body["data"]["progressLevel"], "BRONZE");
        assert_eq!(
            body["data"]["badges"],
            json!(["RISING_EXPERT", "VERSATILE_PRO"])
        );
        assert_eq!(
            body["pagination"],
            json!({
                "page": 1,
                "limit": 2,
                "total": 3,
                "totalPages": 2,
                "hasNextPage": true,
                "hasPrevPage": false,
            })
        );
    }

    #[tokio::test]
    async fn test_user_reviews_page() {
        let t = setup().await;
        let reviewer = Uuid::new_v4();
        let uri = format!("/reviews/expert/{}", t.expert.user_id);

        send(&t.app, request(Method::POST, &uri, Some(reviewer), Some(review_body(3)))).await;
        send(&t.app, request(Method::POST, &uri, Some(Uuid::new_v4()), Some(review_body(5)))).await;

        let (status, body) = send(&t.app, request(Method::GET, "/reviews/user", Some(reviewer), None)).await;
        assert_eq!(status, StatusCode::OK);
        let reviews = body["data"]["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["reviewerId"], reviewer.to_string());
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["limit"], 10);
    }
}
