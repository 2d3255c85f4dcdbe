pub mod access_role;
pub mod completion;
pub mod integration;
pub mod lifecycle;
