mod avatar;
mod ids;
mod todo;

pub use avatar::*;
pub use ids::*;
pub use todo::*;
