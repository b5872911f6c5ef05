#[macro_use]
extern crate serde;

mod authn;
mod board;
mod commitment;
mod config;
mod election;
mod error;
mod field;
mod secret_share;
mod store;
mod tally;
mod util;
mod vote;

pub use authn::*;
pub use board::*;
pub use commitment::*;
pub use config::*;
pub use election::*;
pub use error::*;
pub use field::*;
pub use secret_share::*;
pub use store::*;
pub use tally::*;
pub use util::*;
pub use vote::*;
