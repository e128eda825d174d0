mod bucket;
mod file;
mod split;

pub use bucket::decode_bucket;
pub use file::decode_file;
pub use split::split_file;
