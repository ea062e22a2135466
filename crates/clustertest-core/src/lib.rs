pub mod constants;
pub mod environment;
pub mod errors;
pub mod loader;
pub mod logging;
pub mod model;
pub mod params;
pub mod partition;
pub mod selection;
pub mod summary;
pub mod validation;
