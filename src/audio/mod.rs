pub mod decode;
pub mod mime;
pub mod pipeline;

pub use decode::{AudioDecoder, DecodeError, DecodedBuffer, RodioDecoder};
pub use pipeline::{DecodeOutcome, DecodePipeline};
