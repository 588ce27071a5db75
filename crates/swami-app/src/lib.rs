// Library root: re-exports all modules so integration tests and the `swami`
// binary share one API.

pub mod config;
pub mod db;
pub mod import;
pub mod schedule;
pub mod slate;
