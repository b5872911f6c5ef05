//! Storage abstractions for protocol state, with in-memory implementations.
//!
//! The protocol only talks to these traits, so a durable backend can be
//! swapped in without touching the protocol logic.

use crate::*;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

/// What one authority holds for one voter
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShareRecord {
    pub share: u64,
    pub commitment: Commitment,
}

/// Per-authority mapping from voter id to the share and commitment it received
pub trait AuthorityStore: Send + Sync {
    /// Store a voter's record, returning the record it replaced (if any)
    fn put(&self, voter_id: &str, record: ShareRecord) -> Option<ShareRecord>;

    /// Get the record for a voter
    fn get(&self, voter_id: &str) -> Option<ShareRecord>;

    /// All share values held by this authority
    fn shares(&self) -> Vec<u64>;

    /// Number of voters this authority holds a share for
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all held shares, mod M
    fn local_sum(&self) -> u64 {
        sum_mod(self.shares())
    }
}

/// An authority store backed by an in-memory IndexMap (arrival order)
#[derive(Default, Debug)]
pub struct MemAuthorityStore {
    inner: RwLock<IndexMap<String, ShareRecord>>,
}

impl AuthorityStore for MemAuthorityStore {
    fn put(&self, voter_id: &str, record: ShareRecord) -> Option<ShareRecord> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.insert(voter_id.to_owned(), record)
    }

    fn get(&self, voter_id: &str) -> Option<ShareRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.get(voter_id).cloned()
    }

    fn shares(&self) -> Vec<u64> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.values().map(|r| r.share).collect()
    }

    fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }
}

/// Metadata kept for every issued token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub voter_id: String,
    pub consumed: bool,
    pub issued_at: f64,
}

/// Outcome of an atomic claim on a token
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The token was unused and is now consumed
    Claimed(TokenRecord),
    AlreadyUsed,
    Unknown,
}

/// Issued-token storage
pub trait TokenStore: Send + Sync {
    fn insert(&self, token: &str, record: TokenRecord);

    fn get(&self, token: &str) -> Option<TokenRecord>;

    /// Atomically flip `consumed` from false to true.
    ///
    /// Exactly one caller can ever observe `Claim::Claimed` for a given token.
    fn claim(&self, token: &str) -> Claim;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A token store that uses an in-memory HashMap
#[derive(Default, Debug)]
pub struct MemTokenStore {
    inner: Mutex<HashMap<String, TokenRecord>>,
}

impl TokenStore for MemTokenStore {
    fn insert(&self, token: &str, record: TokenRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.insert(token.to_owned(), record);
    }

    fn get(&self, token: &str) -> Option<TokenRecord> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.get(token).cloned()
    }

    fn claim(&self, token: &str) -> Claim {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.get_mut(token) {
            None => Claim::Unknown,
            Some(record) if record.consumed => Claim::AlreadyUsed,
            Some(record) => {
                record.consumed = true;
                Claim::Claimed(record.clone())
            }
        }
    }

    fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }
}

/// An append-only log. Entries are never reordered or removed.
pub trait AppendLog<T>: Send + Sync {
    /// Append an entry, returning its index
    fn append(&self, item: T) -> usize;

    /// Snapshot of every entry in arrival order
    fn read_all(&self) -> Vec<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A simple log that uses an in-memory Vec
#[derive(Debug)]
pub struct MemLog<T> {
    inner: RwLock<Vec<T>>,
}

impl<T> Default for MemLog<T> {
    fn default() -> Self {
        MemLog {
            inner: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone + Send + Sync> AppendLog<T> for MemLog<T> {
    fn append(&self, item: T) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.push(item);
        inner.len() - 1
    }

    fn read_all(&self) -> Vec<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.clone()
    }

    fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }
}

impl<T> From<Vec<T>> for MemLog<T> {
    fn from(items: Vec<T>) -> Self {
        MemLog {
            inner: RwLock::new(items),
        }
    }
}

/// One voter's records, checked against the committee size and ready to write
#[derive(Debug, Clone, PartialEq)]
pub struct StagedShares(Vec<ShareRecord>);

/// The committee of authorities, one store each.
///
/// Writing a voter's shares is a single transaction across every store: the
/// write side of `txn` is held while all N records are written, and readers
/// computing sums hold the read side, so nobody observes a voter that is
/// present at some authorities and missing at others.
pub struct Committee {
    stores: Vec<Box<dyn AuthorityStore>>,
    txn: RwLock<()>,
}

impl Committee {
    /// A committee of `n` in-memory authorities
    pub fn in_memory(n: usize) -> Self {
        let stores = (0..n)
            .map(|_| Box::new(MemAuthorityStore::default()) as Box<dyn AuthorityStore>)
            .collect();
        Committee::from_stores(stores)
    }

    pub fn from_stores(stores: Vec<Box<dyn AuthorityStore>>) -> Self {
        Committee {
            stores,
            txn: RwLock::new(()),
        }
    }

    /// Number of authorities
    pub fn size(&self) -> usize {
        self.stores.len()
    }

    /// Get the store of authority `index`
    pub fn authority(&self, index: usize) -> Option<&dyn AuthorityStore> {
        self.stores.get(index).map(|s| s.as_ref())
    }

    /// Check a voter's shares and commitments against the committee size and
    /// reduce every share into the field.
    pub fn stage(
        &self,
        shares: &[u64],
        commitments: &[Commitment],
    ) -> Result<StagedShares, ProtocolError> {
        if shares.len() != self.size() || commitments.len() != self.size() {
            return Err(ProtocolError::MalformedSubmission(format!(
                "expected {} shares and commitments, got {} and {}",
                self.size(),
                shares.len(),
                commitments.len()
            )));
        }

        let records = shares
            .iter()
            .zip(commitments.iter())
            .map(|(share, commitment)| ShareRecord {
                share: reduce(*share as u128),
                commitment: commitment.clone(),
            })
            .collect();

        Ok(StagedShares(records))
    }

    /// Write staged record `i` to authority `i`, for every authority, then run
    /// `then` with the number of authorities that already held a record for
    /// this voter.
    ///
    /// `then` runs before the write lock is released, so anything it publishes
    /// is ordered before any tally that can see this voter.
    pub fn commit<F, R>(&self, voter_id: &str, staged: StagedShares, then: F) -> R
    where
        F: FnOnce(usize) -> R,
    {
        let _guard = self.txn.write().unwrap_or_else(PoisonError::into_inner);
        let mut replaced = 0;
        for (store, record) in self.stores.iter().zip(staged.0) {
            if store.put(voter_id, record).is_some() {
                replaced += 1;
            }
        }
        then(replaced)
    }

    /// Stage and commit in one step.
    ///
    /// Returns how many authorities already held a record for this voter.
    pub fn record(
        &self,
        voter_id: &str,
        shares: &[u64],
        commitments: &[Commitment],
    ) -> Result<usize, ProtocolError> {
        let staged = self.stage(shares, commitments)?;
        Ok(self.commit(voter_id, staged, |replaced| replaced))
    }

    /// Every authority's local sum, plus the number of voters recorded
    pub fn local_sums(&self) -> (Vec<u64>, usize) {
        self.with_local_sums(|sums, voters| (sums, voters))
    }

    /// Run `then` over the local sums while no voter can be written
    pub fn with_local_sums<F, R>(&self, then: F) -> R
    where
        F: FnOnce(Vec<u64>, usize) -> R,
    {
        let _guard = self.txn.read().unwrap_or_else(PoisonError::into_inner);
        let sums = self.stores.iter().map(|s| s.local_sum()).collect();
        let voters = self.stores.first().map(|s| s.len()).unwrap_or(0);
        then(sums, voters)
    }

    /// Check that the record authority `index` holds for a voter opens with `blinding`
    pub fn check_commitment(&self, index: usize, voter_id: &str, blinding: &str) -> bool {
        match self.authority(index).and_then(|s| s.get(voter_id)) {
            Some(record) => verify_commitment(record.share, blinding, &record.commitment),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_store_put_get() {
        let store = MemAuthorityStore::default();
        assert!(store.is_empty());

        let record = ShareRecord {
            share: 5,
            commitment: commit(5, "r"),
        };
        assert!(store.put("alice", record.clone()).is_none());
        assert_eq!(store.get("alice"), Some(record.clone()));
        assert_eq!(store.get("bob"), None);

        let replacement = ShareRecord {
            share: 7,
            commitment: commit(7, "r"),
        };
        assert_eq!(store.put("alice", replacement), Some(record));
        assert_eq!(store.len(), 1);
        assert_eq!(store.local_sum(), 7);
    }

    #[test]
    fn token_claim_is_single_shot() {
        let store = MemTokenStore::default();
        assert_eq!(store.claim("t"), Claim::Unknown);

        store.insert(
            "t",
            TokenRecord {
                voter_id: "alice".to_owned(),
                consumed: false,
                issued_at: 1.0,
            },
        );

        match store.claim("t") {
            Claim::Claimed(record) => assert!(record.consumed),
            other => panic!("unexpected claim {:?}", other),
        }
        assert_eq!(store.claim("t"), Claim::AlreadyUsed);
        assert!(store.get("t").unwrap().consumed);
    }

    #[test]
    fn mem_log_preserves_order() {
        let log: MemLog<&str> = MemLog::default();
        assert_eq!(log.append("a"), 0);
        assert_eq!(log.append("b"), 1);
        assert_eq!(log.append("c"), 2);
        assert_eq!(log.read_all(), vec!["a", "b", "c"]);
        assert_eq!(log.read_all(), vec!["a", "b", "c"]);

        let log = MemLog::from(vec![1, 2]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn committee_record_and_sum() {
        let committee = Committee::in_memory(3);
        let commitments: Vec<Commitment> = vec![commit(1, "a"), commit(2, "b"), commit(3, "c")];

        assert_eq!(committee.record("alice", &[1, 2, 3], &commitments).unwrap(), 0);
        assert_eq!(committee.record("bob", &[10, 20, 30], &commitments).unwrap(), 0);

        let (sums, voters) = committee.local_sums();
        assert_eq!(sums, vec![11, 22, 33]);
        assert_eq!(voters, 2);

        // Shares are reduced before storage
        committee
            .record("carol", &[MODULUS + 1, 0, 0], &commitments)
            .unwrap();
        assert_eq!(committee.authority(0).unwrap().get("carol").unwrap().share, 1);
    }

    #[test]
    fn committee_rejects_wrong_shape() {
        let committee = Committee::in_memory(3);
        let commitments: Vec<Commitment> = vec![commit(1, "a"), commit(2, "b")];
        let err = committee
            .record("alice", &[1, 2], &commitments)
            .unwrap_err();
        assert_eq!(err.kind(), "MalformedSubmission");
        assert!(committee.authority(0).unwrap().is_empty());
    }

    #[test]
    fn stage_then_commit() {
        let committee = Committee::in_memory(2);
        let commitments: Vec<Commitment> = vec![commit(4, "x"), commit(9, "y")];

        let err = committee.stage(&[4], &commitments).unwrap_err();
        assert_eq!(err.kind(), "MalformedSubmission");

        let staged = committee.stage(&[4, MODULUS + 9], &commitments).unwrap();
        assert!(committee.authority(1).unwrap().is_empty());

        // `then` runs while the write lock is held
        let seen = committee.commit("alice", staged, |replaced| {
            assert_eq!(replaced, 0);
            committee.authority(1).unwrap().get("alice").map(|r| r.share)
        });
        assert_eq!(seen, Some(9));
        assert_eq!(committee.local_sums(), (vec![4, 9], 1));
    }

    #[test]
    fn committee_check_commitment() {
        let committee = Committee::in_memory(2);
        let commitments: Vec<Commitment> = vec![commit(4, "x"), commit(9, "y")];
        committee.record("alice", &[4, 9], &commitments).unwrap();

        assert!(committee.check_commitment(0, "alice", "x"));
        assert!(committee.check_commitment(1, "alice", "y"));
        assert!(!committee.check_commitment(1, "alice", "x"));
        assert!(!committee.check_commitment(0, "bob", "x"));
        assert!(!committee.check_commitment(5, "alice", "x"));
    }
}
