pub mod classify;
pub mod delta;
pub mod entries;
pub mod template_links;

pub use classify::*;
pub use delta::*;
pub use entries::*;
pub use template_links::*;
