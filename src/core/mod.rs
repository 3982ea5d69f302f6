pub mod config;
pub mod error;
pub mod state_machine;
pub mod traits;

pub use self::config::*;
pub use self::error::*;
pub use self::state_machine::*;
pub use self::traits::*;
