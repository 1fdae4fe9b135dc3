//! Application services sitting between the HTTP layer and the stores.

pub mod orders;
