pub mod routes;

// Re-export route handlers for convenience
pub use routes::arts;
pub use routes::state;
