pub mod cache;
pub mod clock;
pub mod history;
pub mod job;
pub mod model;
pub mod settings;
pub mod source;
pub mod usecases;
pub mod util;

#[cfg(test)]
mod test_support;
