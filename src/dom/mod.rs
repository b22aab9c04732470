pub mod dom_model;
pub mod index;
pub mod selector;
