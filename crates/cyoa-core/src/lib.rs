pub mod config;
pub mod logging;

pub mod control;
pub mod error;
pub mod http;
pub mod mime;
pub mod pipeline;
pub mod resolve;
pub mod retry;
pub mod url_model;
