#![warn(clippy::unwrap_used)]

pub mod rest;
pub mod server;
pub mod snapshot;
pub mod swagger;

pub use server::ApiServer;
pub use snapshot::Snapshot;
pub use swagger::ApiDoc;
