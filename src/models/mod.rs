pub mod badge;
pub mod ledger;
pub mod leaderboard;
pub mod rule;
pub mod streak;
