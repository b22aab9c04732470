pub mod keys;
pub mod similarity;

pub use keys::{ElementKey, keys_for};
pub use similarity::similarity;
