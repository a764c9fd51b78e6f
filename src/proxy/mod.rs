//
// src/proxy/mod.rs
//
mod proxy;
mod rule;
mod static_files;

pub use proxy::{DevProxy, ProxyError, X_REQUEST_ID};
pub use rule::ProxyRule;
pub use static_files::StaticFiles;
