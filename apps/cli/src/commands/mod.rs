pub mod analyze;
pub mod discover;
pub mod generate;
pub mod setup_all;
pub mod verify;
