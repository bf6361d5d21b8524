pub mod raymarch;
pub mod spatial;
pub mod transfer;
pub mod traversal;
pub mod volume;

pub(crate) mod object_pool;
