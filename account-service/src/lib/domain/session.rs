pub mod delegated;
pub mod errors;
pub mod local;
pub mod models;
pub mod ports;

pub use delegated::DelegatedSessionEngine;
pub use delegated::DelegatedSessionSettings;
pub use errors::SessionError;
pub use local::LocalSessionEngine;
pub use local::LocalSessionSettings;
