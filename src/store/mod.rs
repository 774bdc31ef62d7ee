//! 레코드 저장소 트레이트
//!
//! 경매 규칙은 이 트레이트만 보고 동작한다. 구현체는 PostgreSQL
//! (`database::PgStore`)과 테스트/로컬 실행용 메모리 저장소(`MemoryStore`)가 있다.
// region:    --- Imports
use crate::auction::model::{
    Auction, AuctionEdit, AuctionItem, AuctionSummary, ItemInsert, ItemStanding, LiveAuction,
    NewAuction, NewItem, StatusUpdate,
};
use crate::bidding::model::{Bid, BidBoardRow, BidCandidate, InsertOutcome};
use crate::error::StoreError;
use crate::users::model::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// endregion: --- Imports

mod memory;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

// region:    --- Auction Store Trait
/// 경매/품목/입찰 저장소
#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn create_auction(&self, new: NewAuction) -> StoreResult<Auction>;

    async fn get_auction(&self, auction_id: i64) -> StoreResult<Option<Auction>>;

    /// 예정 상태일 때만 수정. 그 외에는 `None`.
    async fn edit_scheduled_auction(
        &self,
        auction_id: i64,
        edit: AuctionEdit,
    ) -> StoreResult<Option<Auction>>;

    /// 현재 상태가 `update.expected`에 있을 때만 변경. 그 외에는 `None`.
    async fn update_auction_status(
        &self,
        auction_id: i64,
        update: StatusUpdate,
    ) -> StoreResult<Option<Auction>>;

    /// 마감 시각이 지난 live 경매를 모두 종료하고 그 id를 반환
    async fn close_expired_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<i64>>;

    /// 경매가 예정 상태일 때만 품목을 추가 (상태 확인과 삽입은 원자적)
    async fn create_item(&self, new: NewItem) -> StoreResult<ItemInsert>;

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<AuctionItem>>;

    async fn list_items(&self, auction_id: i64) -> StoreResult<Vec<ItemStanding>>;

    async fn get_lowest_bid(&self, item_id: i64) -> StoreResult<Option<f64>>;

    /// 조건부 입찰 삽입
    ///
    /// 품목 단위로 직렬화된 상태에서 경매 상태, 마감 시각, 현재 최저가가
    /// 후보 검증 시점과 같은지 다시 확인한 뒤에만 기록한다.
    async fn insert_bid(&self, candidate: BidCandidate) -> StoreResult<InsertOutcome>;

    /// 최저가 순(동가면 먼저 들어온 순) 입찰 목록
    async fn list_item_bids(&self, item_id: i64) -> StoreResult<Vec<Bid>>;

    async fn list_auction_bids(&self, auction_id: i64) -> StoreResult<Vec<BidBoardRow>>;

    async fn list_live_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<LiveAuction>>;

    async fn list_auctions_by_creator(&self, user_id: i64) -> StoreResult<Vec<AuctionSummary>>;
}
// endregion: --- Auction Store Trait

// region:    --- User Store Trait
/// 사용자 저장소. 비밀번호는 불투명 문자열로 비교한다.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 이메일이 이미 있으면 `None`
    async fn create_user(&self, new: NewUser) -> StoreResult<Option<User>>;

    async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;
}
// endregion: --- User Store Trait
