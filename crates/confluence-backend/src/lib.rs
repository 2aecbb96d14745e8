pub mod client;
mod convert;
pub mod error;
pub mod models;
mod source_impl;


pub use client::ConfluenceClient;
pub use error::{ConfluenceError, Result};
