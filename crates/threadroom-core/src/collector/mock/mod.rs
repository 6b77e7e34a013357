//! Mock filesystem for testing readers without a real `/proc`.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::LimitsFixture;
