//! 사용자 가입/로그인
// region:    --- Imports
use crate::error::{AuctionError, AuctionResult};
use crate::store::UserStore;
use model::{NewUser, User};
use tracing::info;

// endregion: --- Imports

pub mod model;

/// 회원 가입. 이메일은 소문자로 정규화한다.
pub async fn signup(users: &dyn UserStore, new: NewUser) -> AuctionResult<User> {
    info!("{:<12} --> 회원 가입 요청: {}", "Users", new.email);
    let new = NewUser {
        name: required("name", &new.name)?,
        email: required("email", &new.email)?.to_ascii_lowercase(),
        company_name: required("company_name", &new.company_name)?,
        ..new
    };
    if !new.email.contains('@') {
        return Err(AuctionError::InvalidInput(format!(
            "email {:?} is not valid",
            new.email
        )));
    }
    if new.password.is_empty() {
        return Err(AuctionError::InvalidInput(
            "password must not be empty".to_string(),
        ));
    }

    let email = new.email.clone();
    let user = users
        .create_user(new)
        .await?
        .ok_or(AuctionError::EmailTaken(email))?;
    info!(
        "{:<12} --> 회원 가입 완료: id={}, 역할={}",
        "Users", user.id, user.role
    );
    Ok(user)
}

/// 로그인
pub async fn login(users: &dyn UserStore, email: &str, password: &str) -> AuctionResult<User> {
    info!("{:<12} --> 로그인 요청: {}", "Users", email);
    let email = email.trim().to_ascii_lowercase();
    users
        .authenticate(&email, password)
        .await?
        .ok_or(AuctionError::InvalidCredentials)
}

fn required(field: &str, value: &str) -> AuctionResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuctionError::InvalidInput(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(value.to_string())
}

// endregion: --- Tests
