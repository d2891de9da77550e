//! Integration tests against the public `coinflip` API.

mod account_flow;
mod mock_auth;
mod table_flow;
