pub mod builder;

pub use builder::ContextBuilder;
