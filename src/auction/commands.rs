//! 경매 관련 커맨드 처리
//! 1. 경매 생성
//! 2. 경매 수정 (예정 상태만)
//! 3. 품목 추가 (예정 상태만)
// region:    --- Imports
use super::lifecycle::{load_owned_auction, validate_duration};
use super::model::{Auction, AuctionEdit, AuctionItem, ItemInsert, NewAuction, NewItem};
use crate::clock::Clock;
use crate::error::{AuctionError, AuctionResult};
use crate::store::AuctionStore;
use crate::users::model::{RequestContext, Role};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands
/// 경매 생성 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionCommand {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub currency: String,
    /// 생략하면 설정의 기본 진행 시간
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub min_decrement: f64,
}

/// 품목 추가 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quantity: f64,
    #[serde(default = "default_uom")]
    pub uom: String,
    pub base_price: f64,
}

fn default_uom() -> String {
    "Nos".to_string()
}

/// 1. 경매 생성
pub async fn create_auction(
    store: &dyn AuctionStore,
    clock: &dyn Clock,
    ctx: &RequestContext,
    cmd: CreateAuctionCommand,
    default_duration_minutes: u32,
) -> AuctionResult<Auction> {
    info!("{:<12} --> 경매 생성 요청: {:?}", "Command", cmd);
    ctx.require_role(Role::Buyer)?;

    let new = NewAuction {
        title: required_text("title", cmd.title)?,
        description: cmd.description.trim().to_string(),
        currency: validate_currency(&cmd.currency)?,
        created_by: ctx.user_id,
        duration_minutes: validate_duration(
            cmd.duration_minutes.unwrap_or(default_duration_minutes),
        )?,
        min_decrement: validate_decrement(cmd.min_decrement)?,
        created_at: clock.now(),
    };

    let auction = store.create_auction(new).await?;
    info!(
        "{:<12} --> 경매 생성 완료: id={}, 상태={}",
        "Command", auction.id, auction.status
    );
    Ok(auction)
}

/// 2. 경매 수정
///
/// 시작된 경매의 진행 시간과 감소 단위는 고정이므로 예정 상태에서만 허용한다.
pub async fn edit_auction(
    store: &dyn AuctionStore,
    ctx: &RequestContext,
    auction_id: i64,
    edit: AuctionEdit,
) -> AuctionResult<Auction> {
    info!("{:<12} --> 경매 수정 요청 id: {}", "Command", auction_id);
    let auction = load_owned_auction(store, ctx, auction_id).await?;

    let edit = AuctionEdit {
        title: edit.title.map(|t| required_text("title", t)).transpose()?,
        description: edit.description.map(|d| d.trim().to_string()),
        duration_minutes: match edit.duration_minutes {
            Some(minutes) => Some(validate_duration(minutes)? as u32),
            None => None,
        },
        min_decrement: edit.min_decrement.map(validate_decrement).transpose()?,
    };

    store
        .edit_scheduled_auction(auction_id, edit)
        .await?
        .ok_or(AuctionError::AuctionNotScheduled {
            auction_id,
            status: auction.status,
        })
}

/// 3. 품목 추가
pub async fn add_item(
    store: &dyn AuctionStore,
    ctx: &RequestContext,
    auction_id: i64,
    cmd: AddItemCommand,
) -> AuctionResult<AuctionItem> {
    info!("{:<12} --> 품목 추가 요청: {:?}", "Command", cmd);
    load_owned_auction(store, ctx, auction_id).await?;

    if !cmd.quantity.is_finite() || cmd.quantity <= 0.0 {
        return Err(AuctionError::InvalidInput(format!(
            "quantity must be positive, got {}",
            cmd.quantity
        )));
    }
    if !cmd.base_price.is_finite() || cmd.base_price < 0.0 {
        return Err(AuctionError::InvalidInput(format!(
            "base price must not be negative, got {}",
            cmd.base_price
        )));
    }
    let new = NewItem {
        auction_id,
        name: required_text("name", cmd.name)?,
        description: cmd.description.trim().to_string(),
        quantity: cmd.quantity,
        uom: required_text("uom", cmd.uom)?,
        base_price: cmd.base_price,
    };

    match store.create_item(new).await? {
        ItemInsert::Created(item) => {
            info!(
                "{:<12} --> 품목 추가 완료: id={}, 경매={}",
                "Command", item.id, auction_id
            );
            Ok(item)
        }
        ItemInsert::AuctionMissing => Err(AuctionError::AuctionNotFound(auction_id)),
        ItemInsert::NotScheduled(status) => {
            Err(AuctionError::AuctionNotScheduled { auction_id, status })
        }
    }
}
// endregion: --- Commands

// region:    --- Validation
fn required_text(field: &str, value: String) -> AuctionResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuctionError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(value.to_string())
}

fn validate_currency(code: &str) -> AuctionResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(AuctionError::InvalidInput(format!(
            "currency must be a three-letter code, got {:?}",
            code
        )))
    }
}

fn validate_decrement(step: f64) -> AuctionResult<f64> {
    if step.is_finite() && step >= 0.0 {
        Ok(step)
    } else {
        Err(AuctionError::InvalidInput(format!(
            "minimum decrement must not be negative, got {}",
            step
        )))
    }
}
// endregion: --- Validation

// endregion: --- Tests
