pub mod api;
pub mod record;
pub mod sql;
pub mod validate;
