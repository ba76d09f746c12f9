//! First-run data bootstrap
//!
//! Seeds a deterministic demo dataset so a fresh install is usable in
//! rehearsals, plus the initial operator account. Both are no-ops on a
//! database that already has data.

use tracing::{info, warn};

use anju_core::{auth, BuildingCoord, CandidateRecord, Database, District, Operator, Result};

use crate::config::AppConfig;

const FAMILY_NAMES: [&str; 10] = ["王", "李", "张", "刘", "陈", "杨", "赵", "黄", "周", "吴"];
const GIVEN_NAMES: [&str; 8] = ["建国", "淑兰", "志强", "秀英", "国庆", "玉梅", "德福", "桂芳"];

/// (village, town, households)
const VILLAGES: [(&str, &str, u32); 4] = [
    ("一村", "密云镇", 30),
    ("二村", "密云镇", 28),
    ("三村", "溪翁庄镇", 32),
    ("四村", "溪翁庄镇", 30),
];

/// Default marker layout for the rehearsal map
const DEMO_COORDS: [(&str, &str, District, &str, &str); 5] = [
    ("西区_1", "1号楼", District::West, "30%", "12%"),
    ("西区_2", "2号楼", District::West, "44%", "16%"),
    ("西区_3", "3号楼", District::West, "58%", "12%"),
    ("东区_4", "4号楼", District::East, "36%", "68%"),
    ("东区_5", "5号楼", District::East, "52%", "72%"),
];

/// Insert the demo dataset if the candidate table is empty.
/// Returns the number of candidates inserted.
pub fn seed_if_empty(db: &Database) -> Result<u32> {
    if !db.candidates().list_all()?.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0u32;
    let mut serial = 0u32;
    for (village, town, households) in VILLAGES {
        for _ in 0..households {
            serial += 1;
            let mut candidate = CandidateRecord::new(
                format!("{serial:04}"),
                demo_name(serial),
                demo_id_number(serial),
                demo_phone(serial),
            );
            candidate.village = village.to_string();
            candidate.town = town.to_string();
            db.candidates().create(&candidate)?;
            inserted += 1;
        }
    }

    if db.coords().list()?.is_empty() {
        let coords: Vec<BuildingCoord> = DEMO_COORDS
            .iter()
            .map(|(id, label, zone, top, left)| BuildingCoord {
                id: id.to_string(),
                label: label.to_string(),
                zone: *zone,
                top: top.to_string(),
                left: left.to_string(),
            })
            .collect();
        db.coords().replace_all(&coords)?;
    }

    info!(candidates = inserted, "Seeded demo dataset");
    Ok(inserted)
}

/// Create the bootstrap operator account if none exists.
///
/// The generated password appears once in the log; it has no other
/// copy anywhere.
pub fn bootstrap_admin(db: &Database, config: &AppConfig) -> Result<()> {
    if db
        .operators()
        .find_by_username(&config.admin_username)?
        .is_some()
    {
        return Ok(());
    }

    let password = auth::generate_token();
    let operator = Operator::new(
        config.admin_username.clone(),
        auth::hash_password(&password)?,
        config.admin_display_name.clone(),
    );
    db.operators().create(&operator)?;
    warn!(
        username = %config.admin_username,
        %password,
        "Created bootstrap operator; change this password"
    );
    Ok(())
}

fn demo_name(serial: u32) -> String {
    let family = FAMILY_NAMES[(serial as usize) % FAMILY_NAMES.len()];
    let given = GIVEN_NAMES[(serial as usize / FAMILY_NAMES.len()) % GIVEN_NAMES.len()];
    format!("{family}{given}")
}

fn demo_id_number(serial: u32) -> String {
    format!("1102281965{:08}", serial)
}

fn demo_phone(serial: u32) -> String {
    format!("138{:08}", serial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = seed_if_empty(&db).unwrap();
        assert_eq!(first, 120);
        assert_eq!(seed_if_empty(&db).unwrap(), 0);

        let all = db.candidates().list_all().unwrap();
        assert_eq!(all.len(), 120);
        assert_eq!(all[0].query_no, "0001");
        assert!(all.iter().all(|c| !c.has_selected()));
        assert_eq!(db.coords().list().unwrap().len(), 5);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = Database::open_in_memory().unwrap();
        let b = Database::open_in_memory().unwrap();
        seed_if_empty(&a).unwrap();
        seed_if_empty(&b).unwrap();

        let names_a: Vec<_> = a
            .candidates()
            .list_all()
            .unwrap()
            .into_iter()
            .map(|c| (c.query_no, c.name, c.village))
            .collect();
        let names_b: Vec<_> = b
            .candidates()
            .list_all()
            .unwrap()
            .into_iter()
            .map(|c| (c.query_no, c.name, c.village))
            .collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn test_bootstrap_admin_once() {
        let db = Database::open_in_memory().unwrap();
        let config = AppConfig::default();
        bootstrap_admin(&db, &config).unwrap();
        bootstrap_admin(&db, &config).unwrap();
        assert!(db.operators().find_by_username("admin").unwrap().is_some());
    }
}
