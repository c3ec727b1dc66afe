pub mod db;
pub mod groceries;
pub mod ics;
pub mod ids;
pub mod kv;
pub mod models;
pub mod nutrition;
pub mod recurrence;
pub mod service;
pub mod storage;
pub mod week;
