// Public API - measurement primitives and stores
pub mod clock;
pub mod congestion;
pub mod probe;
pub mod report;
pub mod state;
pub mod transport;

// Role loops and process wiring, used by the binary
pub mod cli;
pub mod config;
pub mod engine;
