//! The public bulletin board.
//!
//! Every protocol event is appended here in arrival order and never changed
//! afterwards. Raw shares never appear on the board, only commitments.

use crate::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// A bulletin board entry, serialized as `{type, ...fields, ts}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum BoardEntry {
    TokenIssued {
        voter_id: String,
        token: String,
        ts: f64,
    },
    VoteSubmitted {
        voter_id: String,
        token: String,
        commits: Vec<Commitment>,
        ts: f64,
    },
    TallyPublished {
        local_sums: Vec<u64>,
        total: u64,
        ts: f64,
    },
}

impl BoardEntry {
    /// Name of the entry type, as it appears in the `type` field
    pub fn kind(&self) -> &'static str {
        match self {
            BoardEntry::TokenIssued { .. } => "token_issued",
            BoardEntry::VoteSubmitted { .. } => "vote_submitted",
            BoardEntry::TallyPublished { .. } => "tally_published",
        }
    }

    /// Seconds since the unix epoch at which the entry was appended
    pub fn ts(&self) -> f64 {
        match self {
            BoardEntry::TokenIssued { ts, .. }
            | BoardEntry::VoteSubmitted { ts, .. }
            | BoardEntry::TallyPublished { ts, .. } => *ts,
        }
    }

    fn set_ts(&mut self, new_ts: f64) {
        match self {
            BoardEntry::TokenIssued { ts, .. }
            | BoardEntry::VoteSubmitted { ts, .. }
            | BoardEntry::TallyPublished { ts, .. } => *ts = new_ts,
        }
    }
}

/// The bulletin board, backed by any append-only log.
///
/// Entries are stamped and appended under one lock, so timestamps on the board
/// never go backwards even when the clock does.
pub struct BulletinBoard {
    log: Box<dyn AppendLog<BoardEntry>>,
    clock: Arc<dyn Clock>,
    last_ts: Mutex<f64>,
}

impl Default for BulletinBoard {
    fn default() -> Self {
        BulletinBoard::new(Box::new(MemLog::<BoardEntry>::default()), Arc::new(SystemClock))
    }
}

impl BulletinBoard {
    pub fn new(log: Box<dyn AppendLog<BoardEntry>>, clock: Arc<dyn Clock>) -> Self {
        let last_ts = log
            .read_all()
            .last()
            .map(|e| e.ts())
            .unwrap_or(f64::NEG_INFINITY);
        BulletinBoard {
            log,
            clock,
            last_ts: Mutex::new(last_ts),
        }
    }

    /// Stamp a new entry with the current time and append it.
    ///
    /// Returns the entry's position on the board and its timestamp.
    pub fn post<F>(&self, make: F) -> (usize, f64)
    where
        F: FnOnce(f64) -> BoardEntry,
    {
        let mut last_ts = self.last_ts.lock().unwrap_or_else(PoisonError::into_inner);
        let ts = self.clock.now().max(*last_ts);
        let index = self.log.append(make(ts));
        *last_ts = ts;
        debug!(index, "bulletin board entry appended");
        (index, ts)
    }

    /// Append a pre-built entry, returning its position on the board.
    ///
    /// An entry stamped earlier than the last entry on the board is re-stamped
    /// with that entry's time.
    pub fn append(&self, mut entry: BoardEntry) -> usize {
        let mut last_ts = self.last_ts.lock().unwrap_or_else(PoisonError::into_inner);
        let ts = entry.ts().max(*last_ts);
        entry.set_ts(ts);
        *last_ts = ts;
        let index = self.log.append(entry);
        debug!(index, "bulletin board entry appended");
        index
    }

    /// Every entry in arrival order
    pub fn read_all(&self) -> Vec<BoardEntry> {
        self.log.read_all()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            board: self.read_all(),
        }
    }
}

/// A point-in-time copy of the board, for publishing and offline auditing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub board: Vec<BoardEntry>,
}

impl BoardSnapshot {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Unpack from bytes, either JSON or CBOR
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(serde_json::from_slice(bytes)?),
            Some(_) => Ok(serde_cbor::from_slice(bytes)?),
            None => Err(Error::DeserializationUnknownFormat),
        }
    }

    pub fn audit(&self) -> Result<AuditReport, AuditError> {
        audit(&self.board)
    }
}

/// Summary of a successful board audit
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AuditReport {
    pub tokens_issued: usize,
    pub votes_submitted: usize,
    pub tallies_published: usize,
    pub last_total: Option<u64>,
}

/// Independently re-verify a sequence of board entries.
///
/// Checks that:
///  - timestamps never go backwards
///  - every token is issued once, and used at most once by the voter it was issued to
///  - every published total is the sum of its local sums, mod M
pub fn audit(entries: &[BoardEntry]) -> Result<AuditReport, AuditError> {
    let mut report = AuditReport::default();

    // token -> (voter_id, used)
    let mut tokens: HashMap<&str, (&str, bool)> = HashMap::new();
    let mut last_ts = f64::NEG_INFINITY;

    for (index, entry) in entries.iter().enumerate() {
        if entry.ts() < last_ts {
            return Err(AuditError::TimestampRegression(index));
        }
        last_ts = entry.ts();

        match entry {
            BoardEntry::TokenIssued {
                voter_id, token, ..
            } => {
                if tokens.insert(token.as_str(), (voter_id.as_str(), false)).is_some() {
                    return Err(AuditError::DuplicateToken(index));
                }
                report.tokens_issued += 1;
            }
            BoardEntry::VoteSubmitted {
                voter_id, token, ..
            } => {
                let issued = tokens
                    .get_mut(token.as_str())
                    .ok_or(AuditError::UnissuedToken(index))?;
                if issued.0 != voter_id.as_str() {
                    return Err(AuditError::VoterMismatch(index));
                }
                if issued.1 {
                    return Err(AuditError::TokenReused(index));
                }
                issued.1 = true;
                report.votes_submitted += 1;
            }
            BoardEntry::TallyPublished {
                local_sums, total, ..
            } => {
                if *total >= MODULUS || local_sums.iter().any(|s| *s >= MODULUS) {
                    return Err(AuditError::OutOfField(index));
                }
                let expected = reconstruct_from_local_sums(local_sums);
                if expected != *total {
                    return Err(AuditError::TallyMismatch {
                        index,
                        expected,
                        published: *total,
                    });
                }
                report.tallies_published += 1;
                report.last_total = Some(*total);
            }
        }
    }

    Ok(report)
}
