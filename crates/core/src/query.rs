//! Query resolution
//!
//! The "fuzzy" lookup is a plain case-insensitive substring match over
//! order number, name, ID number and phone (the SQL lives in
//! `CandidateStore::search`). This module classifies the match set for
//! the query-and-proceed flow: a unique hit proceeds, several hits need
//! disambiguation, zero hits is a not-found condition. The first match
//! is never picked silently.

use crate::models::CandidateRecord;

/// Maximum number of rows a search returns
pub const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    NoMatch,
    Unique(Box<CandidateRecord>),
    Ambiguous(Vec<CandidateRecord>),
}

pub fn resolve(mut matches: Vec<CandidateRecord>) -> QueryOutcome {
    match matches.len() {
        0 => QueryOutcome::NoMatch,
        1 => QueryOutcome::Unique(Box::new(matches.remove(0))),
        _ => QueryOutcome::Ambiguous(matches),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(no: &str) -> CandidateRecord {
        CandidateRecord::new(no.into(), "某人".into(), "id".into(), "tel".into())
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(vec![]), QueryOutcome::NoMatch));
    }

    #[test]
    fn test_resolve_unique() {
        match resolve(vec![candidate("0001")]) {
            QueryOutcome::Unique(c) => assert_eq!(c.query_no, "0001"),
            other => panic!("expected unique, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_ambiguous_preserves_order() {
        match resolve(vec![candidate("0001"), candidate("0002")]) {
            QueryOutcome::Ambiguous(list) => {
                assert_eq!(list[0].query_no, "0001");
                assert_eq!(list[1].query_no, "0002");
            }
            other => panic!("expected ambiguous, got {other:?}"),
        }
    }
}
