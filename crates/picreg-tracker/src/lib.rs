//! Shop-order lookup against the production tracking database.
//!
//! The host consults the tracker once per export, with row 0's OSA code, to
//! name the archive copy and open the tracking page. Absence of a match and
//! backend failure are both ordinary outcomes: the export already succeeded,
//! so [`ShopOrderLookup::find_order`] returns `Option` and adapters collapse
//! their errors to `None` (logged at `warn`).

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default base URL of the tracking station pages.
pub const DEFAULT_TRACKING_BASE_URL: &str =
    "http://wiptracker.ep.lan/stations/bulk_pic_registration";

/// A production shop order matched to an OSA identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOrder {
    pub id: i64,
    pub name: String,
}

/// The lookup collaborator contract: zero-or-one order per OSA code.
pub trait ShopOrderLookup {
    fn find_order(&self, osa: &str) -> Option<ShopOrder>;
}

/// Tracking page for a shop order: `<base-url>/<id>/`.
pub fn tracking_url(base_url: &str, order_id: i64) -> String {
    format!("{}/{order_id}/", base_url.trim_end_matches('/'))
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Lookup adapter over a SQLite snapshot of the tracking schema
/// (`osa`, `device`, `tracker`, `shop_order` tables).
#[derive(Debug)]
pub struct SqliteTracker {
    conn: Connection,
}

impl SqliteTracker {
    /// Open an existing snapshot read-only.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self, TrackerError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Resolve `osa → device → tracker → shop_order`.
    ///
    /// The joins are outer joins, so an OSA row can match while the order
    /// columns come back NULL (device not yet tracked); that is still "no
    /// order".
    fn query_order(&self, osa: &str) -> Result<Option<ShopOrder>, TrackerError> {
        let row = self
            .conn
            .query_row(
                "SELECT d.id, d.name FROM osa a \
                 LEFT JOIN device b ON b.osa_id = a.id \
                 LEFT JOIN tracker c ON c.device_id = b.id \
                 LEFT JOIN shop_order d ON d.id = c.shoporder_id \
                 WHERE a.name = ?1",
                params![osa],
                |r| {
                    let id: Option<i64> = r.get(0)?;
                    let name: Option<String> = r.get(1)?;
                    Ok((id, name))
                },
            )
            .optional()?;

        Ok(row.and_then(|(id, name)| Some(ShopOrder { id: id?, name: name? })))
    }
}

impl ShopOrderLookup for SqliteTracker {
    fn find_order(&self, osa: &str) -> Option<ShopOrder> {
        match self.query_order(osa) {
            Ok(order) => order,
            Err(err) => {
                log::warn!("shop order lookup for '{osa}' failed: {err}");
                None
            }
        }
    }
}
