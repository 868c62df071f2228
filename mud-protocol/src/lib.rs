pub mod codec;
pub mod error;
pub mod frame;

pub use codec::{read_client_frame, write_server_frame, MAX_FRAME_BYTES};
pub use error::ProtocolError;
pub use frame::{ClientFrame, ServerFrame};
