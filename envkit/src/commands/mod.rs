pub mod seed;
pub mod setup;
pub mod validate;
