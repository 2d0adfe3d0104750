pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{
    AutomationSeedInfo, DefaultAutomationSeed, SeedResult, VerificationResult, SEED_USER_ID,
};
