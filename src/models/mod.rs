pub mod correction;
pub mod paper;

pub use correction::*;
pub use paper::*;
