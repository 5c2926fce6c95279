pub mod analysis;
pub mod chains;
pub mod knowledge;
pub mod payload;
pub mod util;

pub use analysis::*;
pub use chains::*;
pub use knowledge::*;
pub use payload::*;
pub use util::*;
