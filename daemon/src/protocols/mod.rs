pub use protocol::Protocol;

pub mod v1;

mod protocol;
