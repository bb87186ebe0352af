pub mod gate;
pub mod reporter;

pub use gate::*;
pub use reporter::*;
