pub mod funds;
pub mod managers;
pub mod prices;
pub mod setup;
pub mod ui;
