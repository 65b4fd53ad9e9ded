#[macro_use]
pub mod logging;
pub mod rand;
