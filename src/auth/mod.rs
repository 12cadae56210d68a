pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use claims::{TokenClaims, UserClaims};
pub use extractors::AuthToken;
pub use jwt::{JwtKeys, TokenError};
pub use password::{Hasher, HashingError};
