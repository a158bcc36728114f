pub mod arts;
pub mod state;
