pub mod preview;
pub mod sync;
