pub mod cfg;
pub mod encoding;
pub mod error;
pub mod http_client;
pub mod notification;
pub mod runtime;
pub mod simulated;
pub mod subscription;
