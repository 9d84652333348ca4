//! Headless Orbis application: builds the planet pipeline from configuration
//! and flies a viewer through it frame by frame.

mod error;
pub mod flight;
pub mod session;

pub use error::AppError;
pub use flight::FlightPath;
pub use session::{RunSummary, Session, load_config};
