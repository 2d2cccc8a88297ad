mod sections;
pub use sections::*;
mod templates;
pub use templates::*;
