pub mod identity;
pub mod pipeline;
pub mod setting;
pub mod shared;
pub mod video;

#[cfg(test)]
pub(crate) mod test_support;
