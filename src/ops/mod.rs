//! The user-facing operations: pack a tree, unpack an archive, and
//! transcode one archive into another without recompressing payloads.

mod pack;
mod transcode;
mod unpack;

pub use pack::pack;
pub use transcode::{Annotation, transcode, transcode_with};
pub use unpack::unpack;
