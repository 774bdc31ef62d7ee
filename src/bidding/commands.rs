//! 입찰 관련 커맨드 처리
//! 1. 입찰 (단건)
//! 2. 일괄 입찰
// region:    --- Imports
use super::decrement::is_valid_step;
use super::model::{Bid, BidCandidate, InsertOutcome};
use crate::auction::lifecycle::fetch_auction;
use crate::auction::model::{Auction, AuctionItem, AuctionStatus};
use crate::clock::Clock;
use crate::error::{AuctionError, AuctionResult};
use crate::store::AuctionStore;
use crate::users::model::{RequestContext, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// endregion: --- Imports

// 조건부 삽입 충돌 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 10;

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub item_id: i64,
    pub amount: f64,
}

/// 일괄 입찰 항목. 선택되지 않았거나 금액이 없으면 건너뛴다.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchEntry {
    pub item_id: i64,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

/// 일괄 입찰 실패 항목
#[derive(Debug)]
pub struct ItemFailure {
    pub item_id: i64,
    pub error: AuctionError,
}

/// 일괄 입찰 결과
#[derive(Debug, Default)]
pub struct BatchReport {
    pub accepted: Vec<Bid>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }
}

/// 1. 입찰
///
/// 경매 상태와 기준가를 매번 새로 읽어 검증하고, 저장소의 조건부 삽입으로
/// 확인과 기록 사이의 경쟁을 막는다. 다른 입찰이 먼저 커밋되면 새 최저가로
/// 다시 검증한다.
pub async fn admit_bid(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
    cmd: PlaceBidCommand,
) -> AuctionResult<Bid> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    ctx.require_role(Role::Supplier)?;
    if !cmd.amount.is_finite() || cmd.amount < 0.0 {
        return Err(AuctionError::InvalidInput(format!(
            "bid amount must be a non-negative number, got {}",
            cmd.amount
        )));
    }

    let mut auction = fetch_auction(store, cmd.auction_id).await?;
    ensure_accepting_bids(&auction, clock.now())?;

    let item = store
        .get_item(cmd.item_id)
        .await?
        .filter(|item| item.auction_id == auction.id)
        .ok_or(AuctionError::ItemNotFound(cmd.item_id))?;

    for attempt in 1..=MAX_RETRIES {
        // 충돌 뒤에는 이전에 읽은 상태를 믿지 않고 다시 읽는다
        if attempt > 1 {
            auction = fetch_auction(store, cmd.auction_id).await?;
        }
        let now = clock.now();
        ensure_accepting_bids(&auction, now)?;

        let lowest = store.get_lowest_bid(item.id).await?;
        check_amount(&auction, &item, lowest, cmd.amount)?;

        let candidate = BidCandidate {
            auction_id: auction.id,
            item_id: item.id,
            bidder_id: ctx.user_id,
            bid_amount: cmd.amount,
            bid_time: now,
            expected_lowest: lowest,
        };
        match store.insert_bid(candidate).await? {
            InsertOutcome::Inserted(bid) => {
                info!(
                    "{:<12} --> 입찰 성공: item={}, 금액={}, bid={}",
                    "Command", bid.item_id, bid.bid_amount, bid.id
                );
                return Ok(bid);
            }
            InsertOutcome::Conflict { current_lowest } => {
                warn!(
                    "{:<12} --> 동시 입찰 충돌: item={}, 최저가 {:?} → {:?}, 재시도 {}/{}",
                    "Command", item.id, lowest, current_lowest, attempt, MAX_RETRIES
                );
            }
            InsertOutcome::ItemMissing => return Err(AuctionError::ItemNotFound(item.id)),
            InsertOutcome::AuctionNotLive => {
                // 삽입 직전에 닫힘
                let status = store
                    .get_auction(auction.id)
                    .await?
                    .map_or(AuctionStatus::Closed, |a| a.status);
                return Err(AuctionError::AuctionNotLive {
                    auction_id: auction.id,
                    status,
                });
            }
            InsertOutcome::AuctionExpired { end_time } => {
                return Err(AuctionError::AuctionExpired {
                    auction_id: auction.id,
                    end_time,
                })
            }
        }
    }

    Err(AuctionError::StorageConflict(item.id))
}

/// 2. 일괄 입찰
///
/// 각 항목을 독립적으로 검증하고 기록한다. 규칙 위반과 저장소 장애 모두
/// 품목별 실패로 모아 반환하고 나머지 항목은 그대로 진행한다. 이미 기록된
/// 입찰은 항상 `accepted`에 보고된다.
pub async fn submit_batch(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
    auction_id: i64,
    entries: &[BatchEntry],
) -> AuctionResult<BatchReport> {
    info!(
        "{:<12} --> 일괄 입찰 요청: 경매={}, 항목 {}개",
        "Command",
        auction_id,
        entries.len()
    );
    ctx.require_role(Role::Supplier)?;
    fetch_auction(store, auction_id).await?;

    let mut report = BatchReport::default();
    let selected = entries
        .iter()
        .filter(|e| e.selected)
        .filter_map(|e| e.amount.map(|amount| (e.item_id, amount)));

    for (item_id, amount) in selected {
        let cmd = PlaceBidCommand {
            auction_id,
            item_id,
            amount,
        };
        match admit_bid(store, clock, ctx, cmd).await {
            Ok(bid) => report.accepted.push(bid),
            Err(err) => {
                if err.is_rejection() {
                    info!(
                        "{:<12} --> 일괄 입찰 항목 거절: item={}, 사유={}",
                        "Command", item_id, err
                    );
                } else {
                    error!(
                        "{:<12} --> 일괄 입찰 항목 저장 실패: item={}, 오류={:?}",
                        "Command", item_id, err
                    );
                }
                report.failures.push(ItemFailure {
                    item_id,
                    error: err,
                });
            }
        }
    }

    info!(
        "{:<12} --> 일괄 입찰 완료: 성공 {}건, 실패 {}건",
        "Command",
        report.accepted_count(),
        report.failures.len()
    );
    Ok(report)
}
// endregion: --- Commands

// region:    --- Rules
/// 경매가 입찰을 받는 중인지 확인 (live, 마감 전)
pub fn ensure_accepting_bids(auction: &Auction, now: DateTime<Utc>) -> AuctionResult<()> {
    if auction.status != AuctionStatus::Live {
        return Err(AuctionError::AuctionNotLive {
            auction_id: auction.id,
            status: auction.status,
        });
    }
    match auction.end_time {
        Some(end_time) if auction.is_past_deadline(now) => Err(AuctionError::AuctionExpired {
            auction_id: auction.id,
            end_time,
        }),
        _ => Ok(()),
    }
}

/// 기준가(최저 입찰가, 없으면 시작가) 대비 입찰 금액 검증
pub fn check_amount(
    auction: &Auction,
    item: &AuctionItem,
    lowest: Option<f64>,
    amount: f64,
) -> AuctionResult<()> {
    let reference = lowest.unwrap_or(item.base_price);
    if amount >= reference {
        return Err(AuctionError::BidNotLower { amount, reference });
    }

    let gap = reference - amount;
    if auction.min_decrement > 0.0 && !is_valid_step(auction.min_decrement, gap) {
        return Err(AuctionError::BadDecrement {
            reference,
            step: auction.min_decrement,
            gap,
        });
    }
    Ok(())
}
// endregion: --- Rules
