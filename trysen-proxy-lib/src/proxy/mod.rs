pub mod client_pool;
pub mod connection;
pub mod context;
pub mod drop_response;
pub mod forwarding;
pub mod handler;
pub mod http_result;
pub mod server;
pub mod synthetic_response;
pub mod transport;

pub use client_pool::ClientPool;
pub use context::ProxyContext;
pub use drop_response::{drop_response, DropReason};
pub use forwarding::{forward, ForwardConfig, UpstreamOrigin};
pub use handler::{add_forwarded_headers, forwarded, handle_request};
pub use http_result::{HttpError, HttpResult};
pub use server::{run, ProxyServer};
pub use synthetic_response::RespBody;
