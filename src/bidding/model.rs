use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 입찰 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub item_id: i64,
    pub bidder_id: i64,
    pub bid_amount: f64,
    pub bid_time: DateTime<Utc>,
}

/// 검증을 통과한 입찰 후보
///
/// `expected_lowest`는 검증 시점에 읽은 최저 입찰가이다. 저장소는 삽입 직전에
/// 현재 최저가가 이 값과 같을 때만 기록한다.
#[derive(Debug, Clone)]
pub struct BidCandidate {
    pub auction_id: i64,
    pub item_id: i64,
    pub bidder_id: i64,
    pub bid_amount: f64,
    pub bid_time: DateTime<Utc>,
    pub expected_lowest: Option<f64>,
}

/// 조건부 입찰 삽입 결과
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(Bid),
    /// 검증 이후 다른 입찰이 먼저 커밋됨
    Conflict { current_lowest: Option<f64> },
    ItemMissing,
    AuctionNotLive,
    AuctionExpired { end_time: DateTime<Utc> },
}

/// 구매자용 입찰 현황 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BidBoardRow {
    pub bid_id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub quantity: f64,
    pub uom: String,
    pub bid_amount: f64,
    pub bid_time: DateTime<Utc>,
    pub bidder_id: i64,
    pub company_name: String,
}
