pub use errors::*;
pub use order::*;
pub use verification::*;

pub mod errors;
pub mod order;
pub mod verification;
pub mod verification_fsm;
