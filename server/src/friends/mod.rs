//! Friend graph: user search, friend requests and the friends list.
//!
//! A request is one row per (sender, receiver). Accepting it creates a
//! friendship with the sender as `user1`; friendships are undirected for reads.

pub mod list;
pub mod requests;
pub mod search;
pub mod store;
