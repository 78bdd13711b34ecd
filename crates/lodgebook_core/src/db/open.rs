//! Connection bootstrap for the relational backend.

use super::{apply_schema, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a database file, configures it and applies the schema.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let conn = Connection::open(path)?;
    match bootstrap(conn) {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode=file path={}",
                path.display()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=file path={} error={err}",
                path.display()
            );
            Err(err)
        }
    }
}

/// Opens an in-memory database with the same bootstrap as [`open_db`].
pub fn open_db_in_memory() -> DbResult<Connection> {
    let conn = Connection::open_in_memory()?;
    match bootstrap(conn) {
        Ok(conn) => {
            info!("event=db_open module=db status=ok mode=memory");
            Ok(conn)
        }
        Err(err) => {
            error!("event=db_open module=db status=error mode=memory error={err}");
            Err(err)
        }
    }
}

fn bootstrap(mut conn: Connection) -> DbResult<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_schema(&mut conn)?;
    Ok(conn)
}
