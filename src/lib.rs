//! Frameweave library
//!
//! Exposes modules for integration testing

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod session;

pub use config::AppConfig;
pub use errors::SessionError;
pub use session::{goto, launch_session, open_session, BrowserSession};
