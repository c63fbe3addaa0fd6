mod avatar_processing;
mod blob_store;
mod profile_store;

pub use avatar_processing::*;
pub use blob_store::*;
pub use profile_store::*;
