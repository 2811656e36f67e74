pub mod cache;
pub mod http;
pub mod logging;
pub mod timing;
