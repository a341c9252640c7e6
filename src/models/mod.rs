pub mod spec;
pub mod result;
pub mod github;

pub use spec::*;
pub use result::*;
pub use github::*;
