pub mod multipart;

pub use multipart::{field_stream, field_text, StreamingForm};
