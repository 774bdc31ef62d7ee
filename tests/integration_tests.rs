use chrono::Duration;
use reqwest::{Client, Method, StatusCode};
use reverse_auction::clock::ManualClock;
use reverse_auction::handlers::{router, AppState, USER_ID_HEADER};
use reverse_auction::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

/// 메모리 저장소와 수동 시계로 띄운 테스트 서버
struct TestServer {
    base: String,
    client: Client,
    clock: Arc<ManualClock>,
}

async fn spawn_server() -> TestServer {
    let store = MemoryStore::new_shared();
    let clock = Arc::new(ManualClock::default());
    let state = AppState {
        auctions: store.clone(),
        users: store,
        clock: clock.clone(),
        default_duration_minutes: 10,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state).into_make_service())
            .await
            .unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: Client::new(),
        clock,
    }
}

impl TestServer {
    async fn send(
        &self,
        method: Method,
        path: &str,
        user: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let url = format!("{}{}", self.base, path);
        let mut request = self.client.request(method, url);
        if let Some(user) = user {
            request = request.header(USER_ID_HEADER, user.to_string());
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.expect("Failed to send request");
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, path: &str, user: Option<i64>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, user, Some(body)).await
    }

    async fn get(&self, path: &str, user: i64) -> (StatusCode, Value) {
        self.send(Method::GET, path, Some(user), None).await
    }

    async fn signup(&self, name: &str, role: &str) -> i64 {
        let (status, body) = self
            .post(
                "/users",
                None,
                json!({
                    "name": name,
                    "email": format!("{name}@example.com"),
                    "password": "pw",
                    "role": role,
                    "company_name": format!("{name} Pvt Ltd"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// 품목을 붙여 시작한 경매 (경매 id, 품목 id 목록)
    async fn live_auction(
        &self,
        buyer: i64,
        min_decrement: f64,
        prices: &[f64],
    ) -> (i64, Vec<i64>) {
        let (status, auction) = self
            .post(
                "/auctions",
                Some(buyer),
                json!({
                    "title": "Packaging",
                    "currency": "inr",
                    "min_decrement": min_decrement,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{auction}");
        let auction_id = auction["id"].as_i64().unwrap();

        let mut items = Vec::new();
        for price in prices {
            let (status, item) = self
                .post(
                    &format!("/auctions/{auction_id}/items"),
                    Some(buyer),
                    json!({ "name": "Carton", "quantity": 1000, "base_price": price }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{item}");
            items.push(item["id"].as_i64().unwrap());
        }

        let (status, started) = self
            .send(
                Method::POST,
                &format!("/auctions/{auction_id}/start"),
                Some(buyer),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{started}");
        assert_eq!(started["status"], "live");
        (auction_id, items)
    }
}

/// 가입과 로그인
#[tokio::test]
async fn test_signup_and_login() {
    let server = spawn_server().await;
    server.signup("asha", "supplier").await;

    let (status, body) = server
        .post(
            "/login",
            None,
            json!({ "email": "asha@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "supplier");
    assert_eq!(body["display_company"], "asha");

    let (status, body) = server
        .post(
            "/login",
            None,
            json!({ "email": "asha@example.com", "password": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let (status, body) = server
        .post(
            "/users",
            None,
            json!({
                "name": "asha",
                "email": "asha@example.com",
                "password": "pw",
                "role": "buyer",
                "company_name": "Other",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");
}

/// 인증 헤더 없는 요청 거절
#[tokio::test]
async fn test_requests_need_a_known_user() {
    let server = spawn_server().await;
    let (status, body) = server.send(Method::GET, "/auctions/live", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");

    let (status, _) = server.get("/auctions/live", 404).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// 입찰 흐름 (감소 단위 규칙 포함)
#[tokio::test]
async fn test_bidding_flow() {
    let server = spawn_server().await;
    let buyer = server.signup("buyer", "buyer").await;
    let alpha = server.signup("alpha", "supplier").await;
    let beta = server.signup("beta", "supplier").await;
    let (auction_id, items) = server.live_auction(buyer, 0.5, &[100.0]).await;
    let bids_path = format!("/auctions/{auction_id}/bids");

    let (status, body) = server
        .post(
            &bids_path,
            Some(alpha),
            json!({ "item_id": items[0], "amount": 95.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = server
        .post(
            &bids_path,
            Some(beta),
            json!({ "item_id": items[0], "amount": 94.7 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_DECREMENT");

    let (status, body) = server
        .post(
            &bids_path,
            Some(beta),
            json!({ "item_id": items[0], "amount": 96.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BID_NOT_LOWER");

    let (status, _) = server
        .post(
            &bids_path,
            Some(beta),
            json!({ "item_id": items[0], "amount": 94.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = server
        .get(&format!("/items/{}/bids", items[0]), alpha)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winning_bid"]["bid_amount"], 94.0);
    assert_eq!(body["winning_bid"]["bidder_id"], beta);
    assert_eq!(body["bids"].as_array().unwrap().len(), 2);

    let (_, body) = server
        .get(&format!("/items/{}/lowest", items[0]), alpha)
        .await;
    assert_eq!(body["lowest_bid"], 94.0);

    let (status, body) = server
        .get(&format!("/auctions/{auction_id}/items"), beta)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["lowest_bid"], 94.0);
    assert_eq!(body[0]["bid_count"], 2);

    // 입찰 현황은 경매를 만든 구매자만
    let (status, body) = server.get(&bids_path, buyer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["company_name"], "beta Pvt Ltd");
    let (status, body) = server.get(&bids_path, alpha).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // 없는 경매는 품목보다 먼저 보고된다
    let missing = auction_id + 100;
    let (status, body) = server
        .post(
            &format!("/auctions/{missing}/bids"),
            Some(alpha),
            json!({ "item_id": items[0], "amount": 90.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "AUCTION_NOT_FOUND");
    let (status, body) = server
        .post(
            &format!("/auctions/{missing}/bids/batch"),
            Some(alpha),
            json!([{ "item_id": items[0], "amount": 90.0 }]),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "AUCTION_NOT_FOUND");
}

/// 일괄 입찰은 품목별로 결과를 보고한다
#[tokio::test]
async fn test_batch_reports_each_item() {
    let server = spawn_server().await;
    let buyer = server.signup("buyer", "buyer").await;
    let supplier = server.signup("alpha", "supplier").await;
    let (auction_id, items) = server.live_auction(buyer, 0.0, &[100.0, 50.0, 20.0]).await;

    let (status, body) = server
        .post(
            &format!("/auctions/{auction_id}/bids/batch"),
            Some(supplier),
            json!([
                { "item_id": items[0], "amount": 90.0 },
                { "item_id": items[1], "amount": 55.0 },
                { "item_id": items[2], "amount": 10.0, "selected": false },
                { "item_id": 9999, "amount": 1.0 },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["accepted_count"], 1);
    let failures = body["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["item_id"], items[1]);
    assert_eq!(failures[0]["code"], "BID_NOT_LOWER");
    assert_eq!(failures[1]["code"], "ITEM_NOT_FOUND");
}

/// 마감 이후 입찰 거절과 자동 종료
#[tokio::test]
async fn test_deadline_and_lifecycle() {
    let server = spawn_server().await;
    let buyer = server.signup("buyer", "buyer").await;
    let supplier = server.signup("alpha", "supplier").await;
    let (auction_id, items) = server.live_auction(buyer, 0.0, &[100.0]).await;

    let (_, live) = server.get("/auctions/live", supplier).await;
    assert_eq!(live.as_array().unwrap().len(), 1);

    // 시작 이후에는 품목 추가와 수정 불가
    let (status, body) = server
        .post(
            &format!("/auctions/{auction_id}/items"),
            Some(buyer),
            json!({ "name": "Tape", "quantity": 10, "base_price": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AUCTION_NOT_SCHEDULED");
    let (status, body) = server
        .send(
            Method::PATCH,
            &format!("/auctions/{auction_id}"),
            Some(buyer),
            Some(json!({ "duration_minutes": 60 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AUCTION_NOT_SCHEDULED");

    server.clock.advance(Duration::minutes(11));
    let (status, body) = server
        .post(
            &format!("/auctions/{auction_id}/bids"),
            Some(supplier),
            json!({ "item_id": items[0], "amount": 90.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "AUCTION_EXPIRED");

    let (status, body) = server.post("/sweep", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["closed"], json!([auction_id]));

    let (_, auction) = server
        .get(&format!("/auctions/{auction_id}"), supplier)
        .await;
    assert_eq!(auction["status"], "closed");
    let (_, live) = server.get("/auctions/live", supplier).await;
    assert!(live.as_array().unwrap().is_empty());

    // 이미 종료된 경매를 다시 닫아도 성공
    let (status, closed) = server
        .post(
            &format!("/auctions/{auction_id}/close"),
            Some(buyer),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    let (_, mine) = server.get("/auctions", buyer).await;
    assert_eq!(mine[0]["status"], "closed");
    assert_eq!(mine[0]["total_items"], 1);
}

/// 같은 금액의 동시 입찰은 하나만 기록된다
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_equal_bids() {
    let server = Arc::new(spawn_server().await);
    let buyer = server.signup("buyer", "buyer").await;
    let (auction_id, items) = server.live_auction(buyer, 0.0, &[100.0]).await;
    let mut suppliers = Vec::new();
    for i in 0..8 {
        suppliers.push(server.signup(&format!("s{i}"), "supplier").await);
    }

    let mut handles = Vec::new();
    for supplier in suppliers {
        let server = Arc::clone(&server);
        let item_id = items[0];
        handles.push(tokio::spawn(async move {
            server
                .post(
                    &format!("/auctions/{auction_id}/bids"),
                    Some(supplier),
                    json!({ "item_id": item_id, "amount": 90.0 }),
                )
                .await
                .0
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        let status = handle.await.unwrap();
        if status == StatusCode::CREATED {
            accepted += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }
    assert_eq!(accepted, 1);

    let (_, body) = server
        .get(&format!("/items/{}/bids", items[0]), buyer)
        .await;
    assert_eq!(body["bids"].as_array().unwrap().len(), 1);
}
