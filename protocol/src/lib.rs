pub mod files;
pub mod management;

#[cfg(feature = "v1")]
pub mod v1;
