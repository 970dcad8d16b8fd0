/// Authentication module
///
/// Token core: claims, the dual-secret codec, the revocation blacklist,
/// password checks, and the issuer that ties them together.

mod blacklist;
mod claims;
mod issuer;
mod jwt;
mod password;
mod redis_blacklist;

pub use blacklist::{blacklist_key, InMemoryBlacklist, TokenBlacklist};
pub use claims::{TokenClaims, TokenClass};
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::{SignedToken, TokenCodec};
pub use password::{hash_password, verify_password, HASH_COST};
pub use redis_blacklist::RedisBlacklist;
