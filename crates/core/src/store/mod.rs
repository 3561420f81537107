//! Store backends for the target registry and result writer.
//!
//! A single backend serves both traits so the connection is shared by the
//! registry refresh loop and every job's writes.

mod redis;

pub use self::redis::{decode_entries, RedisStore};
