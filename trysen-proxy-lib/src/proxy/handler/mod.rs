pub mod headers;
pub mod request;

pub use headers::{add_forwarded_headers, forwarded};
pub use request::handle_request;
