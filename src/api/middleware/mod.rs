pub mod state;
pub mod wallet;
