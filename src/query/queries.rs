// region:    --- Users
/// 사용자 생성 (이메일 중복이면 행 없음)
pub const INSERT_USER: &str = r#"
    INSERT INTO users (name, email, password, role, company_name)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (email) DO NOTHING
    RETURNING id, name, email, role, company_name
"#;

/// 로그인 확인
pub const AUTHENTICATE_USER: &str =
    "SELECT id, name, email, role, company_name FROM users WHERE email = $1 AND password = $2";

/// 사용자 조회
pub const GET_USER: &str = "SELECT id, name, email, role, company_name FROM users WHERE id = $1";
// endregion: --- Users

// region:    --- Auctions
/// 경매 생성
pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (title, description, currency, status, created_by, duration_minutes, min_decrement, created_at)
    VALUES ($1, $2, $3, 'scheduled', $4, $5, $6, $7)
    RETURNING id, title, description, currency, status, created_by, duration_minutes, min_decrement, start_time, end_time, created_at
"#;

/// 경매 조회
pub const GET_AUCTION: &str = r#"
    SELECT id, title, description, currency, status, created_by, duration_minutes, min_decrement, start_time, end_time, created_at
    FROM auctions
    WHERE id = $1
"#;

/// 예정 경매 수정
pub const EDIT_SCHEDULED_AUCTION: &str = r#"
    UPDATE auctions
    SET title = COALESCE($2, title),
        description = COALESCE($3, description),
        duration_minutes = COALESCE($4, duration_minutes),
        min_decrement = COALESCE($5, min_decrement)
    WHERE id = $1 AND status = 'scheduled'
    RETURNING id, title, description, currency, status, created_by, duration_minutes, min_decrement, start_time, end_time, created_at
"#;

/// 조건부 상태 변경 ($5: 허용되는 현재 상태 목록)
pub const UPDATE_AUCTION_STATUS: &str = r#"
    UPDATE auctions
    SET status = $2,
        start_time = COALESCE($3, start_time),
        end_time = COALESCE($4, end_time)
    WHERE id = $1 AND status = ANY($5)
    RETURNING id, title, description, currency, status, created_by, duration_minutes, min_decrement, start_time, end_time, created_at
"#;

/// 만료 경매 종료 (마감 시각과 같으면 만료로 본다)
pub const CLOSE_EXPIRED_AUCTIONS: &str = r#"
    UPDATE auctions
    SET status = 'closed'
    WHERE status = 'live' AND end_time <= $1
    RETURNING id
"#;

/// 진행 중 경매 목록 (품목 없는 경매 제외)
pub const GET_LIVE_AUCTIONS: &str = r#"
    SELECT a.id, a.title, a.currency, a.end_time, COUNT(i.id) AS item_count
    FROM auctions a
    JOIN auction_items i ON i.auction_id = a.id
    WHERE a.status = 'live' AND a.end_time > $1
    GROUP BY a.id
    ORDER BY a.end_time, a.id
"#;

/// 구매자 경매 요약
pub const GET_AUCTIONS_BY_CREATOR: &str = r#"
    SELECT a.id, a.title, a.status, a.start_time, a.end_time, a.min_decrement,
           (SELECT COUNT(*) FROM auction_items i WHERE i.auction_id = a.id) AS total_items,
           (SELECT COUNT(DISTINCT b.bidder_id) FROM bids b WHERE b.auction_id = a.id) AS bidders
    FROM auctions a
    WHERE a.created_by = $1
    ORDER BY a.id
"#;

/// 품목 추가 전 경매 잠금
pub const LOCK_AUCTION_FOR_ITEM: &str = "SELECT status FROM auctions WHERE id = $1 FOR UPDATE";

/// 입찰 기록 전 경매 공유 잠금 (종료와 동시에 기록되지 않도록)
pub const LOCK_AUCTION_FOR_BID: &str =
    "SELECT status, end_time FROM auctions WHERE id = $1 FOR SHARE";
// endregion: --- Auctions

// region:    --- Items
/// 품목 추가
pub const INSERT_ITEM: &str = r#"
    INSERT INTO auction_items (auction_id, name, description, quantity, uom, base_price)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, auction_id, name, description, quantity, uom, base_price
"#;

/// 품목 조회
pub const GET_ITEM: &str =
    "SELECT id, auction_id, name, description, quantity, uom, base_price FROM auction_items WHERE id = $1";

/// 경매 품목과 현재 최저가
pub const GET_ITEM_STANDINGS: &str = r#"
    SELECT i.id, i.auction_id, i.name, i.description, i.quantity, i.uom, i.base_price,
           l.lowest_bid, COALESCE(l.bid_count, 0) AS bid_count
    FROM auction_items i
    LEFT JOIN v_lowest_bids_per_item l ON l.item_id = i.id
    WHERE i.auction_id = $1
    ORDER BY i.id
"#;

/// 입찰 직렬화를 위한 품목 행 잠금
pub const LOCK_ITEM_FOR_BID: &str = "SELECT auction_id FROM auction_items WHERE id = $1 FOR UPDATE";
// endregion: --- Items

// region:    --- Bids
/// 최저 입찰가 조회
pub const GET_LOWEST_BID: &str =
    "SELECT MIN(bid_amount) AS lowest_bid FROM bids WHERE item_id = $1";

/// 입찰 기록
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, item_id, bidder_id, bid_amount, bid_time)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, auction_id, item_id, bidder_id, bid_amount, bid_time
"#;

/// 품목 입찰 목록 (최저가, 먼저 들어온 순)
pub const GET_ITEM_BIDS: &str = r#"
    SELECT id, auction_id, item_id, bidder_id, bid_amount, bid_time
    FROM bids
    WHERE item_id = $1
    ORDER BY bid_amount, bid_time, id
"#;

/// 경매 전체 입찰 현황
pub const GET_AUCTION_BID_BOARD: &str = r#"
    SELECT b.id AS bid_id, b.item_id, i.name AS item_name, i.quantity, i.uom,
           b.bid_amount, b.bid_time, b.bidder_id, u.company_name
    FROM bids b
    JOIN auction_items i ON i.id = b.item_id
    JOIN users u ON u.id = b.bidder_id
    WHERE b.auction_id = $1
    ORDER BY b.item_id, b.bid_amount, b.bid_time, b.id
"#;
// endregion: --- Bids
