pub mod cipher;
pub mod sync;
