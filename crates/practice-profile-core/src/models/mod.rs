//! Domain models for the practice profile.

mod profile;
mod session;

pub use profile::*;
pub use session::*;
