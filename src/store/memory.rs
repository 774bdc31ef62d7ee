// region:    --- Imports
use super::{AuctionStore, StoreResult, UserStore};
use crate::auction::model::{
    Auction, AuctionEdit, AuctionItem, AuctionStatus, AuctionSummary, ItemInsert, ItemStanding,
    LiveAuction, NewAuction, NewItem, StatusUpdate,
};
use crate::bidding::model::{Bid, BidBoardRow, BidCandidate, InsertOutcome};
use crate::users::model::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::Mutex;

// endregion: --- Imports

// region:    --- Memory Store
/// 메모리 저장소
///
/// 단위 테스트와 로컬 실행용. 모든 연산이 하나의 뮤텍스를 잡고 수행되므로
/// 조건부 삽입의 확인과 기록 사이에 다른 입찰이 끼어들 수 없다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<i64, StoredUser>,
    auctions: BTreeMap<i64, Auction>,
    items: BTreeMap<i64, AuctionItem>,
    bids: Vec<Bid>,
    next_user_id: i64,
    next_auction_id: i64,
    next_item_id: i64,
    next_bid_id: i64,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password: String,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl State {
    fn lowest_bid(&self, item_id: i64) -> Option<f64> {
        self.bids
            .iter()
            .filter(|b| b.item_id == item_id)
            .map(|b| b.bid_amount)
            .reduce(f64::min)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn create_auction(&self, new: NewAuction) -> StoreResult<Auction> {
        let mut state = self.state.lock().await;
        let auction = Auction {
            id: next_id(&mut state.next_auction_id),
            title: new.title,
            description: new.description,
            currency: new.currency,
            status: AuctionStatus::Scheduled,
            created_by: new.created_by,
            duration_minutes: new.duration_minutes,
            min_decrement: new.min_decrement,
            start_time: None,
            end_time: None,
            created_at: new.created_at,
        };
        state.auctions.insert(auction.id, auction.clone());
        Ok(auction)
    }

    async fn get_auction(&self, auction_id: i64) -> StoreResult<Option<Auction>> {
        Ok(self.state.lock().await.auctions.get(&auction_id).cloned())
    }

    async fn edit_scheduled_auction(
        &self,
        auction_id: i64,
        edit: AuctionEdit,
    ) -> StoreResult<Option<Auction>> {
        let mut state = self.state.lock().await;
        let Some(auction) = state
            .auctions
            .get_mut(&auction_id)
            .filter(|a| a.status == AuctionStatus::Scheduled)
        else {
            return Ok(None);
        };

        if let Some(title) = edit.title {
            auction.title = title;
        }
        if let Some(description) = edit.description {
            auction.description = description;
        }
        if let Some(minutes) = edit.duration_minutes {
            auction.duration_minutes = minutes as i32;
        }
        if let Some(step) = edit.min_decrement {
            auction.min_decrement = step;
        }
        Ok(Some(auction.clone()))
    }

    async fn update_auction_status(
        &self,
        auction_id: i64,
        update: StatusUpdate,
    ) -> StoreResult<Option<Auction>> {
        let mut state = self.state.lock().await;
        let Some(auction) = state
            .auctions
            .get_mut(&auction_id)
            .filter(|a| update.expected.contains(&a.status))
        else {
            return Ok(None);
        };

        auction.status = update.status;
        if let Some(start) = update.start_time {
            auction.start_time = Some(start);
        }
        if let Some(end) = update.end_time {
            auction.end_time = Some(end);
        }
        Ok(Some(auction.clone()))
    }

    async fn close_expired_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<i64>> {
        let mut state = self.state.lock().await;
        let mut closed = Vec::new();
        for auction in state.auctions.values_mut() {
            let expired = auction.end_time.is_some_and(|end| end <= now);
            if auction.status == AuctionStatus::Live && expired {
                auction.status = AuctionStatus::Closed;
                closed.push(auction.id);
            }
        }
        Ok(closed)
    }

    async fn create_item(&self, new: NewItem) -> StoreResult<ItemInsert> {
        let mut state = self.state.lock().await;
        match state.auctions.get(&new.auction_id).map(|a| a.status) {
            None => return Ok(ItemInsert::AuctionMissing),
            Some(AuctionStatus::Scheduled) => {}
            Some(status) => return Ok(ItemInsert::NotScheduled(status)),
        }

        let item = AuctionItem {
            id: next_id(&mut state.next_item_id),
            auction_id: new.auction_id,
            name: new.name,
            description: new.description,
            quantity: new.quantity,
            uom: new.uom,
            base_price: new.base_price,
        };
        state.items.insert(item.id, item.clone());
        Ok(ItemInsert::Created(item))
    }

    async fn get_item(&self, item_id: i64) -> StoreResult<Option<AuctionItem>> {
        Ok(self.state.lock().await.items.get(&item_id).cloned())
    }

    async fn list_items(&self, auction_id: i64) -> StoreResult<Vec<ItemStanding>> {
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .filter(|i| i.auction_id == auction_id)
            .map(|item| ItemStanding {
                lowest_bid: state.lowest_bid(item.id),
                bid_count: state.bids.iter().filter(|b| b.item_id == item.id).count() as i64,
                item: item.clone(),
            })
            .collect())
    }

    async fn get_lowest_bid(&self, item_id: i64) -> StoreResult<Option<f64>> {
        Ok(self.state.lock().await.lowest_bid(item_id))
    }

    async fn insert_bid(&self, candidate: BidCandidate) -> StoreResult<InsertOutcome> {
        let mut state = self.state.lock().await;

        if !state
            .items
            .get(&candidate.item_id)
            .is_some_and(|i| i.auction_id == candidate.auction_id)
        {
            return Ok(InsertOutcome::ItemMissing);
        }
        let Some(auction) = state.auctions.get(&candidate.auction_id) else {
            return Ok(InsertOutcome::ItemMissing);
        };
        if auction.status != AuctionStatus::Live {
            return Ok(InsertOutcome::AuctionNotLive);
        }
        if let Some(end_time) = auction.end_time.filter(|end| candidate.bid_time > *end) {
            return Ok(InsertOutcome::AuctionExpired { end_time });
        }

        let current_lowest = state.lowest_bid(candidate.item_id);
        if current_lowest != candidate.expected_lowest {
            return Ok(InsertOutcome::Conflict { current_lowest });
        }

        let bid = Bid {
            id: next_id(&mut state.next_bid_id),
            auction_id: candidate.auction_id,
            item_id: candidate.item_id,
            bidder_id: candidate.bidder_id,
            bid_amount: candidate.bid_amount,
            bid_time: candidate.bid_time,
        };
        state.bids.push(bid.clone());
        Ok(InsertOutcome::Inserted(bid))
    }

    async fn list_item_bids(&self, item_id: i64) -> StoreResult<Vec<Bid>> {
        let state = self.state.lock().await;
        let mut bids: Vec<Bid> = state
            .bids
            .iter()
            .filter(|b| b.item_id == item_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| {
            a.bid_amount
                .total_cmp(&b.bid_amount)
                .then(a.bid_time.cmp(&b.bid_time))
                .then(a.id.cmp(&b.id))
        });
        Ok(bids)
    }

    async fn list_auction_bids(&self, auction_id: i64) -> StoreResult<Vec<BidBoardRow>> {
        let state = self.state.lock().await;
        let mut rows: Vec<BidBoardRow> = state
            .bids
            .iter()
            .filter(|b| b.auction_id == auction_id)
            .filter_map(|bid| {
                let item = state.items.get(&bid.item_id)?;
                let bidder = state.users.get(&bid.bidder_id)?;
                Some(BidBoardRow {
                    bid_id: bid.id,
                    item_id: item.id,
                    item_name: item.name.clone(),
                    quantity: item.quantity,
                    uom: item.uom.clone(),
                    bid_amount: bid.bid_amount,
                    bid_time: bid.bid_time,
                    bidder_id: bid.bidder_id,
                    company_name: bidder.user.company_name.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.item_id
                .cmp(&b.item_id)
                .then(a.bid_amount.total_cmp(&b.bid_amount))
                .then(a.bid_time.cmp(&b.bid_time))
        });
        Ok(rows)
    }

    async fn list_live_auctions(&self, now: DateTime<Utc>) -> StoreResult<Vec<LiveAuction>> {
        let state = self.state.lock().await;
        let mut live: Vec<LiveAuction> = state
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Live)
            .filter_map(|a| {
                let end_time = a.end_time.filter(|end| *end > now)?;
                let item_count = state
                    .items
                    .values()
                    .filter(|i| i.auction_id == a.id)
                    .count() as i64;
                (item_count > 0).then(|| LiveAuction {
                    id: a.id,
                    title: a.title.clone(),
                    currency: a.currency.clone(),
                    end_time,
                    item_count,
                })
            })
            .collect();
        live.sort_by(|a, b| a.end_time.cmp(&b.end_time).then(a.id.cmp(&b.id)));
        Ok(live)
    }

    async fn list_auctions_by_creator(&self, user_id: i64) -> StoreResult<Vec<AuctionSummary>> {
        let state = self.state.lock().await;
        Ok(state
            .auctions
            .values()
            .filter(|a| a.created_by == user_id)
            .map(|a| {
                let bidders: BTreeSet<i64> = state
                    .bids
                    .iter()
                    .filter(|b| b.auction_id == a.id)
                    .map(|b| b.bidder_id)
                    .collect();
                AuctionSummary {
                    id: a.id,
                    title: a.title.clone(),
                    status: a.status,
                    start_time: a.start_time,
                    end_time: a.end_time,
                    min_decrement: a.min_decrement,
                    total_items: state
                        .items
                        .values()
                        .filter(|i| i.auction_id == a.id)
                        .count() as i64,
                    bidders: bidders.len() as i64,
                }
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<Option<User>> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.user.email == new.email) {
            return Ok(None);
        }

        let user = User {
            id: next_id(&mut state.next_user_id),
            name: new.name,
            email: new.email,
            role: new.role,
            company_name: new.company_name,
        };
        state.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password: new.password,
            },
        );
        Ok(Some(user))
    }

    async fn authenticate(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user.email == email && u.password == password)
            .map(|u| u.user.clone()))
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&user_id)
            .map(|u| u.user.clone()))
    }
}
// endregion: --- Memory Store

// endregion: --- Tests
