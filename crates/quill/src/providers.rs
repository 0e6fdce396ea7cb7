pub mod base;
pub mod configs;
pub mod google;
pub mod utils;

#[cfg(test)]
pub mod mock;
