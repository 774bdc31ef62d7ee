use crate::error::{AuctionError, AuctionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 사용자 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Supplier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Supplier => "supplier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "buyer" => Ok(Self::Buyer),
            "supplier" => Ok(Self::Supplier),
            _ => Err(UnknownRole(value)),
        }
    }
}

// 사용자 모델 (비밀번호는 포함하지 않음)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub company_name: String,
}

const COMPANY_SUFFIXES: [&str; 3] = ["Private Limited", "Pvt Ltd", "Ltd"];

impl User {
    /// 법인 접미사를 뗀 회사 표시명
    pub fn display_company(&self) -> String {
        let mut name = self.company_name.clone();
        for suffix in COMPANY_SUFFIXES {
            name = name.replace(suffix, "");
        }
        name.trim().to_string()
    }
}

/// 회원 가입 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub company_name: String,
}

/// 요청 단위 인증 컨텍스트
///
/// 전송 계층이 인증된 사용자로부터 만들어 모든 명령에 명시적으로 넘긴다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: i64,
    pub role: Role,
}

impl RequestContext {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn require_role(&self, role: Role) -> AuctionResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(AuctionError::Forbidden(format!(
                "this action requires the {} role, user {} is a {}",
                role, self.user_id, self.role
            )))
        }
    }
}

impl From<&User> for RequestContext {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}
