// traits and types for abstracting away storage mechanisms

mod key;
mod memory;
mod store;

pub use key::Key;

pub use memory::MemoryStore;

pub use store::{ByteStream, Error, ObjectInfo, Result, Store};
