pub mod config;
pub mod dispatcher;
pub mod dns;
pub mod error;
pub mod query;
pub mod response;
pub mod server;
pub mod store;
pub mod zone;

pub use dispatcher::QueryDispatcher;
pub use dns::DNSPacket;
