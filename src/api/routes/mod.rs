pub mod leaderboards;
pub mod players;
pub mod status;
