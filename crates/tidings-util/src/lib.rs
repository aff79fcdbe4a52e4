pub mod snowflake;

pub use snowflake::{Snowflake, SnowflakeError};
