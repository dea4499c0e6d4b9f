pub mod enums;
pub mod analysis;
pub mod document;
pub mod trend;

pub use enums::*;
pub use analysis::*;
pub use document::*;
pub use trend::*;
