use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// region:    --- Auction Status
/// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Scheduled,
    Live,
    Closed,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Closed => "closed",
        }
    }

    /// 허용된 상태 전이인지 확인 (scheduled → live → closed, scheduled → closed)
    pub fn can_move_to(&self, next: AuctionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::Live)
                | (Self::Scheduled, Self::Closed)
                | (Self::Live, Self::Closed)
        )
    }
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown auction status: {0}")]
pub struct UnknownStatus(pub String);

impl TryFrom<String> for AuctionStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "closed" => Ok(Self::Closed),
            _ => Err(UnknownStatus(value)),
        }
    }
}
// endregion: --- Auction Status

// region:    --- Models
// 경매 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: AuctionStatus,
    pub created_by: i64,
    pub duration_minutes: i32,
    pub min_decrement: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 마감 시각이 지났는지 여부 (마감 시각 자체는 아직 유효)
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| now > end)
    }
}

// 경매 품목 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuctionItem {
    pub id: i64,
    pub auction_id: i64,
    pub name: String,
    pub description: String,
    pub quantity: f64,
    pub uom: String,
    pub base_price: f64,
}

/// 신규 경매 (검증 완료)
#[derive(Debug, Clone)]
pub struct NewAuction {
    pub title: String,
    pub description: String,
    pub currency: String,
    pub created_by: i64,
    pub duration_minutes: i32,
    pub min_decrement: f64,
    pub created_at: DateTime<Utc>,
}

/// 예정 상태 경매의 수정 사항. `None` 필드는 그대로 둔다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub min_decrement: Option<f64>,
}

/// 신규 품목 (검증 완료)
#[derive(Debug, Clone)]
pub struct NewItem {
    pub auction_id: i64,
    pub name: String,
    pub description: String,
    pub quantity: f64,
    pub uom: String,
    pub base_price: f64,
}

/// 조건부 상태 변경. 현재 상태가 `expected` 중 하나일 때만 적용된다.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub expected: &'static [AuctionStatus],
    pub status: AuctionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// 품목 생성 결과
#[derive(Debug, Clone)]
pub enum ItemInsert {
    Created(AuctionItem),
    AuctionMissing,
    NotScheduled(AuctionStatus),
}
// endregion: --- Models

// region:    --- Read Models
/// 품목별 현재 최저가
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemStanding {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: AuctionItem,
    pub lowest_bid: Option<f64>,
    pub bid_count: i64,
}

impl ItemStanding {
    /// 다음 입찰이 넘어야 할 기준 가격
    pub fn reference_price(&self) -> f64 {
        self.lowest_bid.unwrap_or(self.item.base_price)
    }
}

/// 진행 중 경매 목록 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LiveAuction {
    pub id: i64,
    pub title: String,
    pub currency: String,
    pub end_time: DateTime<Utc>,
    pub item_count: i64,
}

/// 구매자 경매 요약 행
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuctionSummary {
    pub id: i64,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: AuctionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub min_decrement: f64,
    pub total_items: i64,
    pub bidders: i64,
}
// endregion: --- Read Models

// endregion: --- Tests
