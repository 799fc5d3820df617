//! Authentication: password hashing, signed session tokens, request
//! extractors and login throttling.

pub mod extract;
pub mod jwt;
pub mod password;
pub mod throttle;

pub use extract::{AdminUser, AuthUser, SuperadminUser};
pub use jwt::{Claims, TokenSigner, COOKIE_NAME};
pub use throttle::LoginThrottle;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
