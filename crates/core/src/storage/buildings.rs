//! Building map coordinate registry

use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::{parse_district, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{BuildingCoord, BuildingId};

pub struct CoordStore<'a> {
    conn: &'a Connection,
}

impl<'a> CoordStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// All registered building markers in display order
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<BuildingCoord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, zone, top_pct, left_pct FROM building_coords \
             ORDER BY sort_order, id",
        )?;
        let coords = stmt
            .query_map([], |row| {
                Ok(BuildingCoord {
                    id: row.get(0)?,
                    label: row.get(1)?,
                    zone: parse_district(&row.get::<_, String>(2)?)?,
                    top: row.get(3)?,
                    left: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(coords)
    }

    /// Replace the entire registry with a new batch. A batch with any
    /// invalid entry is rejected wholesale before the old rows go.
    #[instrument(skip(self, coords), fields(count = coords.len()))]
    pub fn replace_all(&self, coords: &[BuildingCoord]) -> Result<()> {
        for coord in coords {
            if coord.id.trim().is_empty() || coord.label.trim().is_empty() {
                return Err(Error::Validation(
                    "coordinate entries require id and label".into(),
                ));
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM building_coords", [])?;
        for (order, coord) in coords.iter().enumerate() {
            tx.execute(
                "INSERT INTO building_coords (id, label, zone, top_pct, left_pct, sort_order) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    coord.id,
                    coord.label,
                    coord.zone.as_str(),
                    coord.top,
                    coord.left,
                    order as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Whether a building is registered on the site map
    #[instrument(skip(self))]
    pub fn contains(&self, building: &BuildingId) -> Result<bool> {
        let hit: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM building_coords WHERE id = ?1",
                params![building.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Registered buildings as parsed ids; unparseable rows are skipped
    /// with a warning rather than failing the whole listing.
    #[instrument(skip(self))]
    pub fn building_ids(&self) -> Result<Vec<BuildingId>> {
        let coords = self.list()?;
        let mut ids = Vec::with_capacity(coords.len());
        for coord in &coords {
            match coord.building_id() {
                Ok(id) => ids.push(id),
                Err(_) => tracing::warn!(id = %coord.id, "unparseable building coordinate id"),
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::District;
    use crate::storage::Database;

    fn coord(id: &str, label: &str, zone: District) -> BuildingCoord {
        BuildingCoord {
            id: id.into(),
            label: label.into(),
            zone,
            top: "42.5%".into(),
            left: "10%".into(),
        }
    }

    #[test]
    fn test_replace_and_list_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        let store = db.coords();

        store
            .replace_all(&[
                coord("西区_3", "3号楼", District::West),
                coord("东区_5", "5号楼", District::East),
            ])
            .unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "西区_3");
        assert_eq!(listed[1].zone, District::East);
    }

    #[test]
    fn test_replace_rejects_invalid_batch_wholesale() {
        let db = Database::open_in_memory().unwrap();
        let store = db.coords();

        store
            .replace_all(&[coord("西区_3", "3号楼", District::West)])
            .unwrap();

        let err = store
            .replace_all(&[
                coord("东区_5", "5号楼", District::East),
                coord("", "6号楼", District::East),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Old registry survives the rejected batch
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "西区_3");
    }

    #[test]
    fn test_contains() {
        let db = Database::open_in_memory().unwrap();
        let store = db.coords();
        store
            .replace_all(&[coord("西区_3", "3号楼", District::West)])
            .unwrap();

        assert!(store.contains(&BuildingId::new(District::West, 3)).unwrap());
        assert!(!store.contains(&BuildingId::new(District::East, 5)).unwrap());
    }
}
