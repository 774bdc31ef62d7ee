// region:    --- Imports
use crate::auction::commands::{
    add_item, create_auction, edit_auction, AddItemCommand, CreateAuctionCommand,
};
use crate::auction::lifecycle::{auto_close_expired, close_auction, start_auction};
use crate::auction::model::AuctionEdit;
use crate::bidding::commands::{admit_bid, submit_batch, BatchEntry, PlaceBidCommand};
use crate::clock::Clock;
use crate::error::AuctionError;
use crate::query::handlers as query;
use crate::store::{AuctionStore, UserStore};
use crate::users::model::{NewUser, RequestContext};
use crate::users::{login, signup};
use axum::async_trait;
use axum::extract::{DefaultBodyLimit, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

/// 요청자 식별 헤더
pub const USER_ID_HEADER: &str = "x-user-id";

// region:    --- State
/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub auctions: Arc<dyn AuctionStore>,
    pub users: Arc<dyn UserStore>,
    pub clock: Arc<dyn Clock>,
    pub default_duration_minutes: u32,
}
// endregion: --- State

// region:    --- Router
/// 라우터 설정
pub fn router(state: AppState) -> Router {
    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/users", post(handle_signup))
        .route("/login", post(handle_login))
        .route(
            "/auctions",
            get(handle_my_auctions).post(handle_create_auction),
        )
        .route("/auctions/live", get(handle_live_auctions))
        .route(
            "/auctions/:id",
            patch(handle_edit_auction).get(handle_get_auction),
        )
        .route("/auctions/:id/start", post(handle_start_auction))
        .route("/auctions/:id/close", post(handle_close_auction))
        .route(
            "/auctions/:id/items",
            get(handle_get_items).post(handle_add_item),
        )
        .route(
            "/auctions/:id/bids",
            get(handle_bid_board).post(handle_place_bid),
        )
        .route("/auctions/:id/bids/batch", post(handle_submit_batch))
        .route("/items/:id/bids", get(handle_get_item_bids))
        .route("/items/:id/lowest", get(handle_get_lowest_bid))
        .route("/sweep", post(handle_sweep))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(state)
}
// endregion: --- Router

// region:    --- Request Context
#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AuctionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(AuctionError::Unauthenticated)?;
        let user = state
            .users
            .get_user(user_id)
            .await?
            .ok_or(AuctionError::Unauthenticated)?;
        Ok(RequestContext::from(&user))
    }
}
// endregion: --- Request Context

// region:    --- Error Response
impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BidNotLower { .. } | Self::BadDecrement { .. } | Self::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::ItemNotFound(_) | Self::AuctionNotFound(_) => StatusCode::NOT_FOUND,
            Self::AuctionNotLive { .. }
            | Self::AuctionExpired { .. }
            | Self::InvalidTransition { .. }
            | Self::AuctionNotScheduled { .. }
            | Self::StorageConflict(_)
            | Self::EmailTaken(_) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let Self::Storage(e) = &self {
            error!("{:<12} --> 저장소 오류: {:?}", "Handler", e);
        }
        let message = public_message(&self);

        (
            status,
            Json(json!({
                "error": message,
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

/// 클라이언트에 보여줄 오류 메시지 (저장소 상세는 숨긴다)
fn public_message(error: &AuctionError) -> String {
    match error {
        AuctionError::Storage(_) => "internal storage error".to_string(),
        other => other.to_string(),
    }
}
// endregion: --- Error Response

// region:    --- Request Bodies
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub item_id: i64,
    pub amount: f64,
}
// endregion: --- Request Bodies

// region:    --- User Handlers
/// 회원 가입
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<impl IntoResponse, AuctionError> {
    let user = signup(state.users.as_ref(), new).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuctionError> {
    let user = login(state.users.as_ref(), &req.email, &req.password).await?;
    Ok(Json(json!({
        "user": user,
        "display_company": user.display_company(),
    })))
}
// endregion: --- User Handlers

// region:    --- Auction Handlers
/// 경매 생성
pub async fn handle_create_auction(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    let auction = create_auction(
        state.auctions.as_ref(),
        state.clock.as_ref(),
        &ctx,
        cmd,
        state.default_duration_minutes,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// 경매 수정
pub async fn handle_edit_auction(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
    Json(edit): Json<AuctionEdit>,
) -> Result<impl IntoResponse, AuctionError> {
    let auction = edit_auction(state.auctions.as_ref(), &ctx, auction_id, edit).await?;
    Ok(Json(auction))
}

/// 경매 시작 (본문이 없으면 기본 진행 시간)
pub async fn handle_start_auction(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
    body: Option<Json<StartRequest>>,
) -> Result<impl IntoResponse, AuctionError> {
    let duration_minutes = body.and_then(|Json(req)| req.duration_minutes);
    let auction = start_auction(
        state.auctions.as_ref(),
        state.clock.as_ref(),
        &ctx,
        auction_id,
        duration_minutes,
    )
    .await?;
    Ok(Json(auction))
}

/// 경매 종료
pub async fn handle_close_auction(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let auction = close_auction(state.auctions.as_ref(), &ctx, auction_id).await?;
    Ok(Json(auction))
}

/// 품목 추가
pub async fn handle_add_item(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
    Json(cmd): Json<AddItemCommand>,
) -> Result<impl IntoResponse, AuctionError> {
    let item = add_item(state.auctions.as_ref(), &ctx, auction_id, cmd).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// 만료 경매 일괄 종료
pub async fn handle_sweep(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AuctionError> {
    let closed = auto_close_expired(state.auctions.as_ref(), state.clock.as_ref()).await?;
    Ok(Json(json!({ "closed": closed })))
}
// endregion: --- Auction Handlers

// region:    --- Bid Handlers
/// 입찰
pub async fn handle_place_bid(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
    Json(req): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, AuctionError> {
    let cmd = PlaceBidCommand {
        auction_id,
        item_id: req.item_id,
        amount: req.amount,
    };
    let bid = admit_bid(state.auctions.as_ref(), state.clock.as_ref(), &ctx, cmd).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

/// 일괄 입찰. 규칙 위반은 품목별로 보고하고 200으로 응답한다.
pub async fn handle_submit_batch(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
    Json(entries): Json<Vec<BatchEntry>>,
) -> Result<impl IntoResponse, AuctionError> {
    let report = submit_batch(
        state.auctions.as_ref(),
        state.clock.as_ref(),
        &ctx,
        auction_id,
        &entries,
    )
    .await?;
    info!(
        "{:<12} --> 일괄 입찰 응답: 성공 {}건, 실패 {}건",
        "Handler",
        report.accepted_count(),
        report.failures.len()
    );

    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|f| {
            json!({
                "item_id": f.item_id,
                "error": public_message(&f.error),
                "code": f.error.code(),
            })
        })
        .collect();
    Ok(Json(json!({
        "accepted_count": report.accepted_count(),
        "accepted": report.accepted,
        "failures": failures,
    })))
}
// endregion: --- Bid Handlers

// region:    --- Query Handlers
/// 경매 상태 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let auction =
        query::auction_state(state.auctions.as_ref(), state.clock.as_ref(), auction_id).await?;
    Ok(Json(auction))
}

/// 구매자 본인 경매 목록
pub async fn handle_my_auctions(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AuctionError> {
    let summaries = query::my_auctions(state.auctions.as_ref(), state.clock.as_ref(), &ctx).await?;
    Ok(Json(summaries))
}

/// 진행 중 경매 목록
pub async fn handle_live_auctions(
    State(state): State<AppState>,
    _ctx: RequestContext,
) -> Result<impl IntoResponse, AuctionError> {
    let live = query::live_auctions(state.auctions.as_ref(), state.clock.as_ref()).await?;
    Ok(Json(live))
}

/// 경매 품목과 현재 최저가
pub async fn handle_get_items(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let items =
        query::item_standings(state.auctions.as_ref(), state.clock.as_ref(), auction_id).await?;
    Ok(Json(items))
}

/// 경매 전체 입찰 현황 (경매를 만든 구매자만)
pub async fn handle_bid_board(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let board = query::bid_board(
        state.auctions.as_ref(),
        state.clock.as_ref(),
        &ctx,
        auction_id,
    )
    .await?;
    Ok(Json(board))
}

/// 품목 입찰 목록과 현재 낙찰 후보
pub async fn handle_get_item_bids(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let bids = query::current_bids(state.auctions.as_ref(), state.clock.as_ref(), item_id).await?;
    Ok(Json(json!({
        "item_id": item_id,
        "winning_bid": bids.first(),
        "bids": bids,
    })))
}

/// 품목 최저 입찰가
pub async fn handle_get_lowest_bid(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(item_id): Path<i64>,
) -> Result<impl IntoResponse, AuctionError> {
    let lowest = query::lowest_bid(state.auctions.as_ref(), item_id).await?;
    Ok(Json(json!({
        "item_id": item_id,
        "lowest_bid": lowest,
    })))
}
// endregion: --- Query Handlers
