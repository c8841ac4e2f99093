pub mod backend;
pub mod model;
pub mod platform;
pub mod svc;
