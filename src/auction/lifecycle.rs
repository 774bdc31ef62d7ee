//! 경매 상태 전이
//! 1. 시작 (scheduled → live)
//! 2. 종료 (live/scheduled → closed, 이미 종료면 무시)
//! 3. 만료 경매 일괄 종료 (조회 전에 호출)
// region:    --- Imports
use super::model::{Auction, AuctionStatus, StatusUpdate};
use crate::clock::Clock;
use crate::config::{MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};
use crate::error::{AuctionError, AuctionResult};
use crate::store::AuctionStore;
use crate::users::model::{RequestContext, Role};
use chrono::Duration;
use tracing::{debug, info};

// endregion: --- Imports

const FROM_SCHEDULED: &[AuctionStatus] = &[AuctionStatus::Scheduled];
const FROM_OPEN: &[AuctionStatus] = &[AuctionStatus::Scheduled, AuctionStatus::Live];

// region:    --- Lifecycle
/// 1. 경매 시작
///
/// `duration_minutes`가 없으면 생성 시 정한 기본 진행 시간을 쓴다.
/// 시작 이후 마감 시각은 바뀌지 않는다.
pub async fn start_auction(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
    auction_id: i64,
    duration_minutes: Option<u32>,
) -> AuctionResult<Auction> {
    info!("{:<12} --> 경매 시작 요청 id: {}", "Lifecycle", auction_id);
    let requested = duration_minutes.map(validate_duration).transpose()?;
    let auction = load_owned_auction(store, ctx, auction_id).await?;
    ensure_transition(&auction, AuctionStatus::Live)?;

    let minutes = requested.unwrap_or(auction.duration_minutes);
    let now = clock.now();
    let update = StatusUpdate {
        expected: FROM_SCHEDULED,
        status: AuctionStatus::Live,
        start_time: Some(now),
        end_time: Some(now + Duration::minutes(i64::from(minutes))),
    };

    match store.update_auction_status(auction_id, update).await? {
        Some(started) => {
            info!(
                "{:<12} --> 경매 시작: id={}, 마감={:?}",
                "Lifecycle", started.id, started.end_time
            );
            Ok(started)
        }
        // 확인과 갱신 사이에 다른 요청이 상태를 바꿈
        None => {
            let current = fetch_auction(store, auction_id).await?;
            Err(AuctionError::InvalidTransition {
                auction_id,
                from: current.status,
                to: AuctionStatus::Live,
            })
        }
    }
}

/// 2. 경매 종료
///
/// 예정 상태에서 닫으면 취소로 본다. 이미 종료된 경매는 그대로 반환한다.
pub async fn close_auction(
    store: &dyn AuctionStore,
    ctx: &RequestContext,
    auction_id: i64,
) -> AuctionResult<Auction> {
    info!("{:<12} --> 경매 종료 요청 id: {}", "Lifecycle", auction_id);
    let auction = load_owned_auction(store, ctx, auction_id).await?;
    if auction.status == AuctionStatus::Closed {
        debug!("{:<12} --> 이미 종료된 경매: {}", "Lifecycle", auction_id);
        return Ok(auction);
    }

    let update = StatusUpdate {
        expected: FROM_OPEN,
        status: AuctionStatus::Closed,
        start_time: None,
        end_time: None,
    };
    match store.update_auction_status(auction_id, update).await? {
        Some(closed) => {
            info!("{:<12} --> 경매 종료: id={}", "Lifecycle", closed.id);
            Ok(closed)
        }
        // 그 사이 만료 처리로 이미 닫힘
        None => fetch_auction(store, auction_id).await,
    }
}

/// 3. 만료 경매 일괄 종료
pub async fn auto_close_expired(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
) -> AuctionResult<Vec<i64>> {
    let closed = store.close_expired_auctions(clock.now()).await?;
    if !closed.is_empty() {
        info!("{:<12} --> 만료 경매 종료: {:?}", "Sweep", closed);
    }
    Ok(closed)
}
// endregion: --- Lifecycle

// region:    --- Helpers
pub(crate) async fn fetch_auction(
    store: &dyn AuctionStore,
    auction_id: i64,
) -> AuctionResult<Auction> {
    store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::AuctionNotFound(auction_id))
}

/// 요청자가 해당 경매를 만든 구매자인지 확인하고 경매를 반환
pub(crate) async fn load_owned_auction(
    store: &dyn AuctionStore,
    ctx: &RequestContext,
    auction_id: i64,
) -> AuctionResult<Auction> {
    ctx.require_role(Role::Buyer)?;
    let auction = fetch_auction(store, auction_id).await?;
    if auction.created_by != ctx.user_id {
        return Err(AuctionError::Forbidden(format!(
            "auction {} belongs to another buyer",
            auction_id
        )));
    }
    Ok(auction)
}

fn ensure_transition(auction: &Auction, to: AuctionStatus) -> AuctionResult<()> {
    if auction.status.can_move_to(to) {
        Ok(())
    } else {
        Err(AuctionError::InvalidTransition {
            auction_id: auction.id,
            from: auction.status,
            to,
        })
    }
}

pub(crate) fn validate_duration(minutes: u32) -> AuctionResult<i32> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(minutes as i32)
    } else {
        Err(AuctionError::InvalidInput(format!(
            "duration must be between {} and {} minutes, got {}",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, minutes
        )))
    }
}
// endregion: --- Helpers

// endregion: --- Tests
