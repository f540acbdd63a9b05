// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;

// Domain layer (composition)
pub mod entity;
pub mod formatter;
pub mod populator;
pub mod template;
pub mod value;

// Delivery
pub mod mail;
pub mod markup;
pub mod transport;

// Application layer
pub mod api;
pub mod server;
