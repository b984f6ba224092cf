pub mod jwt;

pub use jwt::{extract_jwt_from_header, JwtVerifier};
