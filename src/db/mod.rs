pub mod log;
pub mod migrate;
pub mod pool;
pub mod queries;

use crate::errors::AppResult;
use pool::DbPool;

/// Open the server database and bring its schema up to date.
pub fn open_initialized(path: &str) -> AppResult<DbPool> {
    let pool = DbPool::new(path)?;
    migrate::run_pending_migrations(&pool.conn)?;
    Ok(pool)
}
