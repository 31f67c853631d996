mod resolver;

pub use resolver::{PathResolver, ResolveError};
pub(crate) use resolver::first_executable;
