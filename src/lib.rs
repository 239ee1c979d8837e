// Library exports for integration tests and the shelfwright binary

pub mod audible;
pub mod config;
pub mod importer;
pub mod metadata;
pub mod notifications;
pub mod qbit;
