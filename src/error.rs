// region:    --- Imports
use crate::auction::model::AuctionStatus;
use chrono::{DateTime, Utc};
use thiserror::Error;

// endregion: --- Imports

// region:    --- Store Error
/// 저장소 계층 오류
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
// endregion: --- Store Error

// region:    --- Auction Error
/// 경매 서비스 오류
///
/// 규칙 위반은 모두 복구 가능하다(사용자가 금액을 고쳐 재시도).
/// `Storage`만 인프라 장애를 뜻한다.
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("auction {auction_id} is {status}, not live")]
    AuctionNotLive {
        auction_id: i64,
        status: AuctionStatus,
    },

    #[error("auction {auction_id} ended at {end_time}")]
    AuctionExpired {
        auction_id: i64,
        end_time: DateTime<Utc>,
    },

    #[error("bid {amount} must be lower than the current price {reference}")]
    BidNotLower { amount: f64, reference: f64 },

    #[error("bid must undercut {reference} in multiples of {step} (gap was {gap})")]
    BadDecrement { reference: f64, step: f64, gap: f64 },

    #[error("item {0} not found")]
    ItemNotFound(i64),

    #[error("auction {0} not found")]
    AuctionNotFound(i64),

    #[error("concurrent bids kept winning on item {0}, please retry")]
    StorageConflict(i64),

    #[error("auction {auction_id} cannot move from {from} to {to}")]
    InvalidTransition {
        auction_id: i64,
        from: AuctionStatus,
        to: AuctionStatus,
    },

    #[error("auction {auction_id} is {status}; it can only be changed while scheduled")]
    AuctionNotScheduled {
        auction_id: i64,
        status: AuctionStatus,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("missing or unknown user")]
    Unauthenticated,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("a user with email {0} already exists")]
    EmailTaken(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuctionError {
    /// 클라이언트에 메시지와 함께 전달되는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuctionNotLive { .. } => "AUCTION_NOT_LIVE",
            Self::AuctionExpired { .. } => "AUCTION_EXPIRED",
            Self::BidNotLower { .. } => "BID_NOT_LOWER",
            Self::BadDecrement { .. } => "BAD_DECREMENT",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::AuctionNotFound(_) => "AUCTION_NOT_FOUND",
            Self::StorageConflict(_) => "STORAGE_CONFLICT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AuctionNotScheduled { .. } => "AUCTION_NOT_SCHEDULED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// 규칙 위반이면 true, 저장소 장애면 false
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
// endregion: --- Auction Error

pub type AuctionResult<T> = Result<T, AuctionError>;

// endregion: --- Tests
