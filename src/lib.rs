#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// Abort when an engine invariant does not hold. These are bugs, never user
/// errors, so the condition is logged and the current thread panics.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            log::error!($($arg)+);
            panic!($($arg)+);
        }
    };
}
pub(crate) use invariant;

pub mod ai;
mod battle;
mod bitboard;
#[cfg(feature = "std")]
pub mod client;
mod common;
mod config;
mod grid;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
pub mod protocol;
pub mod replay;
#[cfg(feature = "std")]
pub mod server;
#[cfg(feature = "std")]
pub mod session;
mod ship;
mod shot;
#[cfg(feature = "std")]
pub mod sim;
mod snapshot;
#[cfg(feature = "std")]
pub mod transport;
mod validator;

pub use battle::*;
pub use bitboard::{Adjacency, BitBoard, BitBoardError};
pub use common::*;
pub use config::*;
pub use grid::*;
#[cfg(feature = "std")]
pub use logging::init_logging;
pub use ship::*;
pub use shot::*;
pub use snapshot::*;
pub use validator::*;
#[cfg(feature = "std")]
pub use session::{BattleHandle, BattleListener, BattleSummary, SessionManager};
