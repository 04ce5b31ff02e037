//! Read-only tally derivation over the ballot ledger.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::model::ballot::BallotRecord;
use crate::model::candidate::{CandidateRoster, Position};

/// Per-candidate totals for one position.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: String,
    pub name: String,
    pub count: u64,
}

/// Vote counts per position, listing every rostered candidate (zero counts
/// included) in roster order. Pure function of its inputs: deterministic,
/// idempotent, and free of side effects. Callers obtain a consistent
/// snapshot by reading `records` under the ballot lock.
pub fn compute(
    records: &[BallotRecord],
    roster: &CandidateRoster,
) -> BTreeMap<Position, Vec<CandidateTally>> {
    let mut counts: HashMap<(Position, &str), u64> = HashMap::new();
    for record in records {
        for id in &record.candidate_ids {
            *counts.entry((record.position, id.as_str())).or_default() += 1;
        }
    }

    let mut tally: BTreeMap<Position, Vec<CandidateTally>> = BTreeMap::new();
    for candidate in roster.all() {
        tally
            .entry(candidate.position)
            .or_default()
            .push(CandidateTally {
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                count: counts
                    .get(&(candidate.position, candidate.id.as_str()))
                    .copied()
                    .unwrap_or(0),
            });
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(voter: &str, position: Position, candidates: &[&str]) -> BallotRecord {
        BallotRecord {
            voter_id: voter.to_string(),
            position,
            candidate_ids: candidates.iter().map(|c| c.to_string()).collect(),
            tx_ref: "0xtest".to_string(),
            epoch: 1,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn counts_group_by_position_with_zero_counts_listed() {
        let roster = CandidateRoster::with_sample_candidates();
        let records = vec![
            record("v1", Position::President, &["c_pres_1"]),
            record("v2", Position::President, &["c_pres_1"]),
            record("v3", Position::President, &["c_pres_2"]),
            record("v1", Position::Senator, &["c_sen_1", "c_sen_2"]),
        ];

        let tally = compute(&records, &roster);

        let presidents = &tally[&Position::President];
        assert_eq!(2, presidents.iter().find(|t| t.candidate_id == "c_pres_1").unwrap().count);
        assert_eq!(1, presidents.iter().find(|t| t.candidate_id == "c_pres_2").unwrap().count);

        let senators = &tally[&Position::Senator];
        assert_eq!(12, senators.len());
        assert_eq!(1, senators.iter().find(|t| t.candidate_id == "c_sen_1").unwrap().count);
        // Unvoted candidates still appear, at zero.
        assert_eq!(0, senators.iter().find(|t| t.candidate_id == "c_sen_12").unwrap().count);

        // Vice President received no ballots at all but is still listed.
        assert!(tally[&Position::VicePresident].iter().all(|t| t.count == 0));
    }

    #[test]
    fn empty_ledger_tallies_to_all_zeroes() {
        let roster = CandidateRoster::with_sample_candidates();
        let tally = compute(&[], &roster);
        assert_eq!(3, tally.len());
        assert!(tally.values().flatten().all(|t| t.count == 0));
    }
}
