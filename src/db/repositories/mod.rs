pub mod badge_repository;
pub mod ledger_repository;
pub mod leaderboard_repository;
pub mod rule_repository;
pub mod streak_repository;
pub mod user_directory_repository;
