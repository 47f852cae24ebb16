pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod location;
pub mod navigation;
pub mod renderer;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{AppEvent, Screen, SikapApp, ViewState};
pub use config::SikapConfig;
pub use error::{Advisory, SikapError};
pub use session::{EndChoice, SessionController, SessionState};
