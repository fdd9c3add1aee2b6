pub mod health;
pub mod mutate;

// Re-export handler functions
pub use health::*;
pub use mutate::*;
