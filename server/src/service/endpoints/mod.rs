//! Endpoint handlers organized by domain

pub mod games;
pub mod health;
pub mod matchmaking;
pub mod socket;
pub mod tournament;
