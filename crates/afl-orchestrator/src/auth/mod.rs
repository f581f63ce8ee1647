//! Authentication material

mod keys;

pub use keys::SharedKey;
