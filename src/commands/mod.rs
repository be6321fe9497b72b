// Command handlers module
pub mod ps;
pub mod version;
pub mod watch;

// Re-exports for cleaner imports
pub use ps::execute as ps;
pub use version::execute as version;
pub use watch::execute as watch;
