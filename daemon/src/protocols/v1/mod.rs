pub use protocol::ProtocolV1;

mod protocol;
