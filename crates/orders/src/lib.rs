//! Order-management backend adapter.
//!
//! - `token`: client-credentials access token with a coalescing refresh cache
//! - `orders`: order search by customer-supplied number
//! - `http`: shared `reqwest` client construction and error mapping

pub mod http;
pub mod orders;
pub mod token;

pub use orders::{OrderDirectory, OrderLookupClient};
pub use token::{AccessToken, ClientCredentialsExchanger, TokenCache, TokenExchanger, TokenGrant};
