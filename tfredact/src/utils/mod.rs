// tfredact/src/utils/mod.rs
pub mod atomic_write;
