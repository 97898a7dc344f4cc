//! Actor-critic training building blocks on top of burn: trajectory storage and slicing,
//! value and policy batch streams, policy-input derivation for AWR, A2C and PPO, and the
//! shared-parameter splice used to keep a common trunk between the policy and value models.

pub mod data;
pub mod environment;
pub mod logging;
pub mod module;
pub mod objective;

mod error;

pub use error::{Error, Result};
