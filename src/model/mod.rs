pub mod common;
pub mod product_cmpt;
pub mod product_type;
pub mod workspace;

pub use common::*;
pub use product_cmpt::*;
pub use product_type::*;
pub use workspace::*;
