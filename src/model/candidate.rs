//! Candidates and the elective positions they stand for.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::model::credentials::random_hex;

/// An elective position on the ballot. Ordering is the canonical display
/// order (President first, Senators last).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    President,
    #[serde(rename = "Vice President")]
    VicePresident,
    Senator,
}

impl Position {
    /// Inclusive selection bounds for one ballot item: President and Vice
    /// President take exactly one candidate, a Senator slate takes up to 12.
    pub fn cardinality(self) -> (usize, usize) {
        match self {
            Position::President | Position::VicePresident => (1, 1),
            Position::Senator => (0, 12),
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::President => "President",
            Position::VicePresident => "Vice President",
            Position::Senator => "Senator",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub position: Position,
}

/// The candidate list the submission engine validates selections against.
/// Append-only: admins add candidates, nothing removes them.
#[derive(Clone)]
pub struct CandidateRoster {
    candidates: Vec<Candidate>,
}

impl CandidateRoster {
    /// The prototype's sample slate: two presidential pairs and a dozen
    /// senators.
    pub fn with_sample_candidates() -> Self {
        let mut candidates = vec![
            sample("c_pres_1", "Candidate President A", Position::President),
            sample("c_pres_2", "Candidate President B", Position::President),
            sample("c_vp_1", "Candidate VP A", Position::VicePresident),
            sample("c_vp_2", "Candidate VP B", Position::VicePresident),
        ];
        for n in 1..=12 {
            candidates.push(sample(
                &format!("c_sen_{n}"),
                &format!("Senator {n}"),
                Position::Senator,
            ));
        }
        Self { candidates }
    }

    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Is this candidate id on the roster for the stated position?
    pub fn contains(&self, position: Position, candidate_id: &str) -> bool {
        self.candidates
            .iter()
            .any(|c| c.position == position && c.id == candidate_id)
    }

    /// Append a new candidate with a generated id (position prefix plus a
    /// random hex suffix).
    pub fn add(&mut self, name: String, position: Position) -> Candidate {
        let prefix: String = position
            .to_string()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(4)
            .collect();
        let candidate = Candidate {
            id: format!("{prefix}_{}", random_hex(8)),
            name,
            position,
        };
        self.candidates.push(candidate.clone());
        candidate
    }
}

fn sample(id: &str, name: &str, position: Position) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        position,
    }
}
