pub mod activity_service;
pub mod badge_service;
pub mod ledger_service;
pub mod leaderboard_service;
pub mod level;
pub mod rule_service;
pub mod streak_service;
