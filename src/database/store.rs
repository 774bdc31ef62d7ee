// region:    --- Imports
use super::DatabaseManager;
use crate::auction::model::{
    Auction, AuctionEdit, AuctionItem, AuctionStatus, AuctionSummary, ItemInsert, ItemStanding,
    LiveAuction, NewAuction, NewItem, StatusUpdate,
};
use crate::bidding::model::{Bid, BidBoardRow, BidCandidate, InsertOutcome};
use crate::error::StoreError;
use crate::query::queries;
use crate::store::{AuctionStore, StoreResult, UserStore};
use crate::users::model::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

// endregion: --- Imports

// region:    --- Postgres Store
/// PostgreSQL 저장소
///
/// 입찰 삽입은 품목 행을 `FOR UPDATE`로 잠근 트랜잭션 안에서 최저가를 다시
/// 확인하므로 같은 품목의 입찰은 직렬화된다. 경매 행은 `FOR SHARE`로 잡아
/// 종료와 겹치지 않게 한다.
pub struct PgStore {
    db: Arc<DatabaseManager>,
}

impl PgStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        &self.db.pool
    }
}

#[async_trait]
impl AuctionStore for PgStore {
    async fn create_auction(&self, new: NewAuction) -> StoreResult<Auction> {
        let auction = sqlx::query_as::<_, Auction>(queries::INSERT_AUCTION)
            .bind(new.title)
            .bind(new.description)
            .bind(new.currency)
            .bind(new.created_by)
            .bind(new.duration_minutes)
            .bind(new.min_decrement)
            .bind(new.created_at)
            .fetch_one(self.pool())
            .await?;
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: i64) -> StoreResult<Option<Auction>> {
        let auction = sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(auction)
    }

    async fn edit_scheduled_auction(
        &self,
        auction_id: i64,
        edit: AuctionEdit,
    ) -> StoreResult<Option<Auction>> {
        let auction = sqlx::query_as::<_, Auction>(queries::EDIT_SCHEDULED_AUCTION)
            .bind(auction_id)
            .bind(edit.title)
            .bind(edit.description)
            .bind(edit.duration_minutes.map(|m| m as i32))
            .bind(edit.min_decrement)
            .fetch_optional(self.pool())
            .await?;
        Ok(auction)
    }

    async fn update_auction_status(
        &self,
        auction_id: i64,
        update: StatusUpdate,
    ) -> StoreResult<Option<Auction>> {
        let expected: Vec<String> = update
            .expected
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let auction = sqlx::query_as::<_, Auction>(queries::UPDATE_AUCTION_STATUS)
            .bind(auction_id)
            .bind(update.status.as_str())
            .bind(update.start_time)
            .bind(update.end_time)
            .bind(expected)
            .fetch_optional(self.pool())
            .await?;
        Ok(auction)
    }

    async fn close_expired_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<i64>> {
        let closed = sqlx::query_scalar::<_, i64>(queries::CLOSE_EXPIRED_AUCTIONS)
            .bind(now)
            .fetch_all(self.pool())
            .await?;
        Ok(closed)
    }

    async fn create_item(&self, new: NewItem) -> StoreResult<ItemInsert> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let status: Option<String> = sqlx::query_scalar(queries::LOCK_AUCTION_FOR_ITEM)
                        .bind(new.auction_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    let Some(status) = status else {
                        return Ok(ItemInsert::AuctionMissing);
                    };
                    let status = AuctionStatus::try_from(status)
                        .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
                    if status != AuctionStatus::Scheduled {
                        return Ok(ItemInsert::NotScheduled(status));
                    }

                    let item = sqlx::query_as::<_, AuctionItem>(queries::INSERT_ITEM)
                        .bind(new.auction_id)
                        .bind(new.name)
                        .bind(new.description)
                        .bind(new.quantity)
                        .bind(new.uom)
                        .bind(new.base_price)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok::<_, StoreError>(ItemInsert::Created(item))
                })
            })
            .await
    }

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<AuctionItem>> {
        let item = sqlx::query_as::<_, AuctionItem>(queries::GET_ITEM)
            .bind(item_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(item)
    }

    async fn list_items(&self, auction_id: i64) -> StoreResult<Vec<ItemStanding>> {
        let items = sqlx::query_as::<_, ItemStanding>(queries::GET_ITEM_STANDINGS)
            .bind(auction_id)
            .fetch_all(self.pool())
            .await?;
        Ok(items)
    }

    async fn get_lowest_bid(&self, item_id: i64) -> StoreResult<Option<f64>> {
        let lowest = sqlx::query_scalar::<_, Option<f64>>(queries::GET_LOWEST_BID)
            .bind(item_id)
            .fetch_one(self.pool())
            .await?;
        Ok(lowest)
    }

    async fn insert_bid(&self, candidate: BidCandidate) -> StoreResult<InsertOutcome> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    // 같은 품목의 입찰은 여기서 줄을 선다
                    let item_auction: Option<i64> = sqlx::query_scalar(queries::LOCK_ITEM_FOR_BID)
                        .bind(candidate.item_id)
                        .fetch_optional(&mut **tx)
                        .await?;
                    if item_auction != Some(candidate.auction_id) {
                        return Ok(InsertOutcome::ItemMissing);
                    }

                    let Some(row) = sqlx::query(queries::LOCK_AUCTION_FOR_BID)
                        .bind(candidate.auction_id)
                        .fetch_optional(&mut **tx)
                        .await?
                    else {
                        return Ok(InsertOutcome::ItemMissing);
                    };
                    let status: String = row.try_get("status")?;
                    let end_time: Option<DateTime<Utc>> = row.try_get("end_time")?;
                    if status != AuctionStatus::Live.as_str() {
                        return Ok(InsertOutcome::AuctionNotLive);
                    }
                    if let Some(end_time) = end_time.filter(|end| candidate.bid_time > *end) {
                        return Ok(InsertOutcome::AuctionExpired { end_time });
                    }

                    let current_lowest: Option<f64> = sqlx::query_scalar(queries::GET_LOWEST_BID)
                        .bind(candidate.item_id)
                        .fetch_one(&mut **tx)
                        .await?;
                    if current_lowest != candidate.expected_lowest {
                        debug!(
                            "{:<12} --> 최저가 변경 감지: item={}, {:?} → {:?}",
                            "Database", candidate.item_id, candidate.expected_lowest, current_lowest
                        );
                        return Ok(InsertOutcome::Conflict { current_lowest });
                    }

                    let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
                        .bind(candidate.auction_id)
                        .bind(candidate.item_id)
                        .bind(candidate.bidder_id)
                        .bind(candidate.bid_amount)
                        .bind(candidate.bid_time)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok::<_, StoreError>(InsertOutcome::Inserted(bid))
                })
            })
            .await
    }

    async fn list_item_bids(&self, item_id: i64) -> StoreResult<Vec<Bid>> {
        let bids = sqlx::query_as::<_, Bid>(queries::GET_ITEM_BIDS)
            .bind(item_id)
            .fetch_all(self.pool())
            .await?;
        Ok(bids)
    }

    async fn list_auction_bids(&self, auction_id: i64) -> StoreResult<Vec<BidBoardRow>> {
        let rows = sqlx::query_as::<_, BidBoardRow>(queries::GET_AUCTION_BID_BOARD)
            .bind(auction_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    async fn list_live_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<LiveAuction>> {
        let live = sqlx::query_as::<_, LiveAuction>(queries::GET_LIVE_AUCTIONS)
            .bind(now)
            .fetch_all(self.pool())
            .await?;
        Ok(live)
    }

    async fn list_auctions_by_creator(&self, user_id: i64) -> StoreResult<Vec<AuctionSummary>> {
        let summaries = sqlx::query_as::<_, AuctionSummary>(queries::GET_AUCTIONS_BY_CREATOR)
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        Ok(summaries)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(queries::INSERT_USER)
            .bind(new.name)
            .bind(new.email)
            .bind(new.password)
            .bind(new.role.as_str())
            .bind(new.company_name)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(queries::AUTHENTICATE_USER)
            .bind(email)
            .bind(password)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(queries::GET_USER)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }
}
// endregion: --- Postgres Store
