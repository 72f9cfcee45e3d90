pub mod config;
pub mod detection;
pub mod geometry;
pub mod io;
pub mod vision;

#[cfg(test)]
pub(crate) mod test_utils;
