use crate::ingest::ListLoad;
use crate::models::{SanctionRecord, SourceList};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreOrigin {
    /// Built from caller-supplied documents.
    Live { lists: usize },
    /// No document was supplied; the built-in sample records are in use.
    Seed,
}

/// The consolidated, read-only set of records for one screening session.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<SanctionRecord>,
    origin: StoreOrigin,
}

impl RecordStore {
    pub fn new(records: Vec<SanctionRecord>) -> Self {
        let mut sources = records.iter().map(|record| record.source).collect::<Vec<_>>();
        sources.sort_unstable();
        sources.dedup();
        Self {
            records,
            origin: StoreOrigin::Live {
                lists: sources.len(),
            },
        }
    }

    /// Concatenates the loaded lists in the order they were supplied. Falls
    /// back to the seed records only when no list was supplied at all; lists
    /// that were supplied but yielded nothing leave the store empty.
    pub fn from_loads(loads: &[ListLoad]) -> Self {
        if loads.is_empty() {
            return Self::seed();
        }

        Self {
            records: loads
                .iter()
                .flat_map(|load| load.records.iter().cloned())
                .collect(),
            origin: StoreOrigin::Live { lists: loads.len() },
        }
    }

    pub fn seed() -> Self {
        Self {
            records: seed_records(),
            origin: StoreOrigin::Seed,
        }
    }

    pub fn records(&self) -> &[SanctionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn origin(&self) -> StoreOrigin {
        self.origin
    }

    pub fn count_by_source(&self, source: SourceList) -> usize {
        self.records
            .iter()
            .filter(|record| record.source == source)
            .count()
    }

    pub fn status_line(&self) -> String {
        let database = match self.origin {
            StoreOrigin::Live { lists } => format!("Live Files ({lists} Lists Loaded)"),
            StoreOrigin::Seed => "Simulated Data (load list PDFs for a full check)".to_string(),
        };
        format!("Database: {database} | Total Records: {}", self.len())
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    source: SourceList,
    reference_no: &str,
    name: &str,
    aliases: &[&str],
    date_of_birth: &str,
    designation: &str,
    nationality: &str,
    raw_excerpt: &str,
) -> SanctionRecord {
    SanctionRecord {
        source,
        reference_no: reference_no.to_string(),
        name: name.to_string(),
        aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
        date_of_birth: date_of_birth.to_string(),
        designation: designation.to_string(),
        nationality: nationality.to_string(),
        raw_excerpt: raw_excerpt.to_string(),
    }
}

/// Sample entries covering all five lists, used when no document is loaded.
pub fn seed_records() -> Vec<SanctionRecord> {
    vec![
        seed(
            SourceList::Moha,
            "KDN.1.08-2014",
            "Halimah binti Hussein",
            &[],
            "9.12.1961",
            "Individual",
            "Malaysia",
            "ID: 611209-01-5514",
        ),
        seed(
            SourceList::Moha,
            "KDN.1.04-2016",
            "Nor Mahmudah binti Ahmad",
            &["Cik Mud"],
            "1.1.1989",
            "Individual",
            "Malaysia",
            "ID: 890101-26-5006",
        ),
        seed(
            SourceList::Unscr1267,
            "QDi.006",
            "AIMAN MUHAMMED RABI AL-ZAWAHIRI",
            &["Ayman Al-Zawahari"],
            "19 Jun. 1951",
            "Leader of Al-Qaida",
            "Egypt",
            "Reportedly deceased",
        ),
        seed(
            SourceList::Unscr1988,
            "TAi.144",
            "SIRAJUDDIN JALLALOUDINE HAQQANI",
            &["Siraj Haqqani", "Khalifa"],
            "1977-1978",
            "Deputy Commander",
            "Afghanistan",
            "Haqqani Network",
        ),
        seed(
            SourceList::Unscr1988,
            "TAi.173",
            "ABDUL BASIR NOORZAI",
            &["Haji Abdul Basir", "Haji Basir Noorzai"],
            "1965",
            "Haji",
            "Afghanistan",
            "Owner of Haji Basir and Zarjmil Company",
        ),
        seed(
            SourceList::Unscr1718,
            "KPi.033",
            "RI WON HO",
            &[],
            "17 Jul. 1964",
            "Official",
            "DPRK",
            "Ministry of State Security",
        ),
        seed(
            SourceList::Unscr2231,
            "IRi.039",
            "QASEM SOLEIMANI",
            &["Qasim Soleimani"],
            "11 Mar. 1957",
            "Major General",
            "Iran",
            "Commander of Qods Force",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ListLoad, LoadStatus};
    use crate::models::DocumentFingerprint;
    use chrono::Utc;

    fn load(source: SourceList, records: Vec<SanctionRecord>) -> ListLoad {
        ListLoad {
            fingerprint: DocumentFingerprint {
                source,
                source_path: None,
                checksum: "checksum".to_string(),
                byte_len: 0,
                ingested_at: Utc::now(),
            },
            status: LoadStatus::Loaded,
            records,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn seed_covers_every_list() {
        let store = RecordStore::seed();
        assert_eq!(store.origin(), StoreOrigin::Seed);
        assert_eq!(store.len(), 7);
        for source in SourceList::ALL {
            assert!(store.count_by_source(source) > 0, "{source} missing from seed");
        }
    }

    #[test]
    fn no_documents_fall_back_to_seed() {
        let store = RecordStore::from_loads(&[]);
        assert_eq!(store.origin(), StoreOrigin::Seed);
    }

    #[test]
    fn loads_concatenate_in_supplied_order() {
        let seed = seed_records();
        let store = RecordStore::from_loads(&[
            load(SourceList::Unscr1988, vec![seed[4].clone()]),
            load(SourceList::Unscr1718, Vec::new()),
            load(SourceList::Moha, vec![seed[0].clone(), seed[1].clone()]),
        ]);

        assert_eq!(store.origin(), StoreOrigin::Live { lists: 3 });
        let references = store
            .records()
            .iter()
            .map(|record| record.reference_no.as_str())
            .collect::<Vec<_>>();
        assert_eq!(references, vec!["TAi.173", "KDN.1.08-2014", "KDN.1.04-2016"]);
    }

    #[test]
    fn empty_loads_do_not_bring_back_the_seed() {
        let store = RecordStore::from_loads(&[load(SourceList::Unscr2231, Vec::new())]);
        assert!(store.is_empty());
        assert_eq!(store.status_line(), "Database: Live Files (1 Lists Loaded) | Total Records: 0");
    }

}
