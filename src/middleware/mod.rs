pub mod cors;
pub mod errors;
pub mod logging;

pub use cors::build_cors;
pub use errors::OpaqueServerErrors;
pub use logging::RequestLogging;
