pub mod constants;
pub mod env;
