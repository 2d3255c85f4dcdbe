pub mod callback;
pub mod iam;
pub mod secrets;
pub mod snowflake;
pub mod warehouse;
