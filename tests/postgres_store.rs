//! PostgreSQL 저장소 테스트
//!
//! 실제 데이터베이스가 필요하다. `DATABASE_URL`을 지정하고
//! `cargo test --test postgres_store -- --ignored`로 실행한다.
use chrono::{Duration, Utc};
use reverse_auction::auction::commands::{
    add_item, create_auction, AddItemCommand, CreateAuctionCommand,
};
use reverse_auction::auction::lifecycle::{auto_close_expired, close_auction, start_auction};
use reverse_auction::auction::model::{AuctionItem, AuctionStatus};
use reverse_auction::bidding::commands::{admit_bid, PlaceBidCommand};
use reverse_auction::bidding::model::{BidCandidate, InsertOutcome};
use reverse_auction::clock::{Clock, ManualClock};
use reverse_auction::config::AppConfig;
use reverse_auction::database::{DatabaseManager, PgStore};
use reverse_auction::error::AuctionError;
use reverse_auction::query::handlers as query;
use reverse_auction::store::AuctionStore;
use reverse_auction::users::model::{NewUser, RequestContext, Role};
use reverse_auction::users::signup;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

static SCHEMA_READY: Mutex<bool> = Mutex::const_new(false);
static NEXT_USER: AtomicU32 = AtomicU32::new(0);

/// 데이터베이스 연결과 스키마 준비
async fn setup() -> Arc<PgStore> {
    let config = AppConfig::from_env().expect("DATABASE_URL must be set");
    let db_manager = DatabaseManager::connect(&config)
        .await
        .expect("Failed to create pool");
    let mut ready = SCHEMA_READY.lock().await;
    if !*ready {
        db_manager
            .initialize_database(false)
            .await
            .expect("Failed to apply schema");
        *ready = true;
    }
    drop(ready);
    Arc::new(PgStore::new(Arc::new(db_manager)))
}

/// 실행마다 겹치지 않는 사용자 생성
async fn register(store: &PgStore, tag: &str, role: Role) -> RequestContext {
    let unique = format!(
        "{}-{}",
        Utc::now().timestamp_micros(),
        NEXT_USER.fetch_add(1, Ordering::Relaxed)
    );
    let user = signup(
        store,
        NewUser {
            name: tag.to_string(),
            email: format!("{tag}-{unique}@example.com"),
            password: "pw".to_string(),
            role,
            company_name: format!("{tag} Pvt Ltd"),
        },
    )
    .await
    .unwrap();
    RequestContext::from(&user)
}

struct Market {
    store: Arc<PgStore>,
    clock: Arc<ManualClock>,
    buyer: RequestContext,
    suppliers: Vec<RequestContext>,
    auction_id: i64,
    item: AuctionItem,
}

/// 시작가 100인 품목 하나로 시작한 경매
async fn live_market(suppliers: usize, duration_minutes: u32) -> Market {
    let store = setup().await;
    let clock = Arc::new(ManualClock::default());
    let buyer = register(&store, "buyer", Role::Buyer).await;
    let mut ctxs = Vec::new();
    for n in 0..suppliers {
        let name = format!("supplier{n}");
        ctxs.push(register(&store, &name, Role::Supplier).await);
    }

    let auction = create_auction(
        &*store,
        &*clock,
        &buyer,
        CreateAuctionCommand {
            title: "Cement".to_string(),
            description: String::new(),
            currency: "INR".to_string(),
            duration_minutes: Some(duration_minutes),
            min_decrement: 0.0,
        },
        10,
    )
    .await
    .unwrap();
    let item = add_item(
        &*store,
        &buyer,
        auction.id,
        AddItemCommand {
            name: "OPC 53".to_string(),
            description: String::new(),
            quantity: 100.0,
            uom: "bags".to_string(),
            base_price: 100.0,
        },
    )
    .await
    .unwrap();
    start_auction(&*store, &*clock, &buyer, auction.id, None)
        .await
        .unwrap();

    Market {
        store,
        clock,
        buyer,
        suppliers: ctxs,
        auction_id: auction.id,
        item,
    }
}

impl Market {
    /// 공급자마다 하나씩 동시에 입찰하고 결과를 모은다
    async fn bid_concurrently(
        &self,
        amount: impl Fn(usize) -> f64,
    ) -> Vec<Result<f64, AuctionError>> {
        let handles: Vec<_> = self
            .suppliers
            .iter()
            .enumerate()
            .map(|(n, ctx)| {
                let store = Arc::clone(&self.store);
                let clock = Arc::clone(&self.clock);
                let ctx = *ctx;
                let cmd = PlaceBidCommand {
                    auction_id: self.auction_id,
                    item_id: self.item.id,
                    amount: amount(n),
                };
                tokio::spawn(async move {
                    admit_bid(&*store, &*clock, &ctx, cmd)
                        .await
                        .map(|bid| bid.bid_amount)
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    async fn amounts_in_commit_order(&self) -> Vec<f64> {
        let mut bids = self.store.list_item_bids(self.item.id).await.unwrap();
        bids.sort_by_key(|b| b.id);
        bids.into_iter().map(|b| b.bid_amount).collect()
    }
}

/// 같은 금액의 동시 입찰은 하나만 기록된다
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_equal_bids() {
    let market = live_market(20, 120).await;

    let results = market.bid_concurrently(|_| 90.0).await;
    let mut accepted = 0;
    for result in results {
        match result {
            Ok(_) => accepted += 1,
            Err(AuctionError::BidNotLower { .. }) | Err(AuctionError::StorageConflict(_)) => {}
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(market.amounts_in_commit_order().await, vec![90.0]);
}

/// 서로 다른 금액의 동시 입찰도 기록 순서대로 엄격히 감소한다
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_descending_bids() {
    let market = live_market(20, 120).await;

    let results = market.bid_concurrently(|n| 99.0 - n as f64).await;
    let accepted: Vec<f64> = results.into_iter().filter_map(Result::ok).collect();

    let amounts = market.amounts_in_commit_order().await;
    assert!(!amounts.is_empty());
    assert_eq!(amounts.len(), accepted.len());
    assert!(amounts.windows(2).all(|w| w[1] < w[0]), "{amounts:?}");
    let lowest = accepted.iter().copied().fold(f64::INFINITY, f64::min);
    assert_eq!(
        market.store.get_lowest_bid(market.item.id).await.unwrap(),
        Some(lowest)
    );
}

/// 조건부 삽입은 검증 이후 바뀐 최저가를 충돌로 보고한다
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_candidate_is_a_conflict() {
    let market = live_market(2, 120).await;
    let candidate = |bidder: &RequestContext, amount: f64| BidCandidate {
        auction_id: market.auction_id,
        item_id: market.item.id,
        bidder_id: bidder.user_id,
        bid_amount: amount,
        bid_time: market.clock.now(),
        expected_lowest: None,
    };

    let first = market
        .store
        .insert_bid(candidate(&market.suppliers[0], 90.0))
        .await
        .unwrap();
    assert!(matches!(first, InsertOutcome::Inserted(_)));

    let stale = market
        .store
        .insert_bid(candidate(&market.suppliers[1], 85.0))
        .await
        .unwrap();
    match stale {
        InsertOutcome::Conflict { current_lowest } => assert_eq!(current_lowest, Some(90.0)),
        other => panic!("expected a conflict, got {other:?}"),
    }
}

/// 마감, 종료, 조회 쿼리
///
/// 만료 처리는 데이터베이스 전체에 적용된다.
/// 다른 테스트의 경매(120분)보다 먼저 끝나도록 10분으로 둔다.
#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_lifecycle_and_read_queries() {
    let market = live_market(2, 10).await;
    let store = &*market.store;
    let clock = &*market.clock;

    for (n, amount) in [(0, 95.0), (1, 91.0), (0, 90.5)] {
        admit_bid(
            store,
            clock,
            &market.suppliers[n],
            PlaceBidCommand {
                auction_id: market.auction_id,
                item_id: market.item.id,
                amount,
            },
        )
        .await
        .unwrap();
    }

    let standings = query::item_standings(store, clock, market.auction_id)
        .await
        .unwrap();
    assert_eq!(standings.len(), 1);
    assert_eq!(standings[0].lowest_bid, Some(90.5));
    assert_eq!(standings[0].bid_count, 3);

    let board = query::bid_board(store, clock, &market.buyer, market.auction_id)
        .await
        .unwrap();
    let amounts: Vec<f64> = board.iter().map(|r| r.bid_amount).collect();
    assert_eq!(amounts, vec![90.5, 91.0, 95.0]);
    assert_eq!(board[0].bidder_id, market.suppliers[0].user_id);

    let live = query::live_auctions(store, clock).await.unwrap();
    assert!(live.iter().any(|a| a.id == market.auction_id));

    let summaries = query::my_auctions(store, clock, &market.buyer)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].bidders, 2);

    // 저장된 마감 시각과 정확히 같은 시각의 입찰은 받는다
    let stored = store.get_auction(market.auction_id).await.unwrap().unwrap();
    let deadline = stored.end_time.unwrap();
    market.clock.set(deadline);
    let at_deadline = admit_bid(
        store,
        clock,
        &market.suppliers[1],
        PlaceBidCommand {
            auction_id: market.auction_id,
            item_id: market.item.id,
            amount: 90.0,
        },
    )
    .await
    .unwrap();
    assert_eq!(at_deadline.bid_time, deadline);

    market.clock.advance(Duration::minutes(1));
    let err = admit_bid(
        store,
        clock,
        &market.suppliers[1],
        PlaceBidCommand {
            auction_id: market.auction_id,
            item_id: market.item.id,
            amount: 80.0,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AuctionError::AuctionExpired { .. }));

    let closed = auto_close_expired(store, clock).await.unwrap();
    assert!(closed.contains(&market.auction_id));
    let live = query::live_auctions(store, clock).await.unwrap();
    assert!(live.iter().all(|a| a.id != market.auction_id));

    let first = close_auction(store, &market.buyer, market.auction_id)
        .await
        .unwrap();
    let second = close_auction(store, &market.buyer, market.auction_id)
        .await
        .unwrap();
    assert_eq!(first.status, AuctionStatus::Closed);
    assert_eq!(second.status, AuctionStatus::Closed);
    assert_eq!(first.end_time, second.end_time);
}
