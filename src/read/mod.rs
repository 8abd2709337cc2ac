mod block;
pub mod chunk;
pub mod crc32;
mod decoder;
mod ext;
pub mod stream;

pub use block::InnoBlockReader;
pub use decoder::Decoder;
pub use ext::ReadBytesExt;
