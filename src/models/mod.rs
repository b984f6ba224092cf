pub mod internal;
pub mod rows;
pub mod api;
pub mod translation;


pub use internal::*;
pub use rows::*;
pub use api::*;
