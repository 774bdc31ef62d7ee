// region:    --- Imports
use crate::auction::lifecycle::{auto_close_expired, fetch_auction, load_owned_auction};
use crate::auction::model::{Auction, AuctionSummary, ItemStanding, LiveAuction};
use crate::bidding::model::{Bid, BidBoardRow};
use crate::clock::Clock;
use crate::error::{AuctionError, AuctionResult};
use crate::store::AuctionStore;
use crate::users::model::{RequestContext, Role};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers
// 조회 전에 만료 경매를 먼저 닫아 live 상태가 마감 전임을 보장한다.

/// 최저 입찰가 조회 (캐시 없이 저장소에서 직접)
pub async fn lowest_bid(store: &dyn AuctionStore, item_id: i64) -> AuctionResult<Option<f64>> {
    info!("{:<12} --> 최저 입찰가 조회 id: {}", "Query", item_id);
    store
        .get_item(item_id)
        .await?
        .ok_or(AuctionError::ItemNotFound(item_id))?;
    Ok(store.get_lowest_bid(item_id).await?)
}

/// 품목 입찰 목록 조회 (최저가 순, 첫 번째가 현재 낙찰 후보)
pub async fn current_bids(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    item_id: i64,
) -> AuctionResult<Vec<Bid>> {
    info!("{:<12} --> 품목 입찰 조회 id: {}", "Query", item_id);
    auto_close_expired(store, clock).await?;
    store
        .get_item(item_id)
        .await?
        .ok_or(AuctionError::ItemNotFound(item_id))?;
    Ok(store.list_item_bids(item_id).await?)
}

/// 현재 최저 입찰 조회
pub async fn winning_bid(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    item_id: i64,
) -> AuctionResult<Option<Bid>> {
    let bids = current_bids(store, clock, item_id).await?;
    Ok(bids.into_iter().next())
}

/// 경매 상태 조회
pub async fn auction_state(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    auction_id: i64,
) -> AuctionResult<Auction> {
    info!("{:<12} --> 경매 상태 조회 id: {}", "Query", auction_id);
    auto_close_expired(store, clock).await?;
    fetch_auction(store, auction_id).await
}

/// 경매 품목별 현재 최저가 조회
pub async fn item_standings(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    auction_id: i64,
) -> AuctionResult<Vec<ItemStanding>> {
    info!("{:<12} --> 품목 현황 조회 id: {}", "Query", auction_id);
    auto_close_expired(store, clock).await?;
    fetch_auction(store, auction_id).await?;
    Ok(store.list_items(auction_id).await?)
}

/// 경매 전체 입찰 현황 조회 (경매를 만든 구매자만)
pub async fn bid_board(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
    auction_id: i64,
) -> AuctionResult<Vec<BidBoardRow>> {
    info!("{:<12} --> 입찰 현황 조회 id: {}", "Query", auction_id);
    auto_close_expired(store, clock).await?;
    load_owned_auction(store, ctx, auction_id).await?;
    Ok(store.list_auction_bids(auction_id).await?)
}

/// 진행 중 경매 목록 조회
pub async fn live_auctions(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
) -> AuctionResult<Vec<LiveAuction>> {
    info!("{:<12} --> 진행 중 경매 조회", "Query");
    auto_close_expired(store, clock).await?;
    Ok(store.list_live_auctions(clock.now()).await?)
}

/// 구매자 본인 경매 요약 조회
pub async fn my_auctions(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
) -> AuctionResult<Vec<AuctionSummary>> {
    info!("{:<12} --> 내 경매 조회 user: {}", "Query", ctx.user_id);
    ctx.require_role(Role::Buyer)?;
    auto_close_expired(store, clock).await?;
    Ok(store.list_auctions_by_creator(ctx.user_id).await?)
}

// endregion: --- Query Handlers

// endregion: --- Tests
