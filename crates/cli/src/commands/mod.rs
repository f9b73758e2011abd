pub mod migrate;
pub mod new;
