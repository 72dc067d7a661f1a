//! Rules adapter for the arena server.
//!
//! Wraps cozy-chess move generation behind a project-owned [`Game`] type:
//! legality, resulting position, SAN, and termination detection.

pub mod converters;
pub mod fen;
pub mod game;
pub mod san;
pub mod types;
pub mod uci;

pub use converters::*;
pub use fen::{FenError, STARTING_FEN};
pub use game::{Game, GameError, HistoryEntry, Outcome};
pub use types::PlayerSide;
pub use uci::format_uci_move;
