use crate::*;
use tracing::info;

/// Per-authority partial sums and the reconstructed total
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TallyResult {
    pub local_sums: Vec<u64>,
    pub total: u64,

    /// Number of voters with shares recorded
    pub num_votes: usize,
}

/// Computes the tally from the authorities' stores. Never writes to them.
pub struct TallyEngine<'a> {
    committee: &'a Committee,
}

impl<'a> TallyEngine<'a> {
    pub fn new(committee: &'a Committee) -> Self {
        TallyEngine { committee }
    }

    /// Each authority sums its own shares; the total is the sum of those sums.
    pub fn compute(&self) -> TallyResult {
        let (local_sums, num_votes) = self.committee.local_sums();
        let total = reconstruct_from_local_sums(&local_sums);

        TallyResult {
            local_sums,
            total,
            num_votes,
        }
    }

    /// Compute the tally and publish it on the board.
    ///
    /// Publishing is not deduplicated: every call adds an entry.
    pub fn publish(&self, board: &BulletinBoard) -> TallyResult {
        // Hold the committee read side until the entry is posted, so every
        // vote counted here is already on the board
        let (result, index) = self.committee.with_local_sums(|local_sums, num_votes| {
            let total = reconstruct_from_local_sums(&local_sums);
            let (index, _ts) = board.post(|ts| BoardEntry::TallyPublished {
                local_sums: local_sums.clone(),
                total,
                ts,
            });
            let result = TallyResult {
                local_sums,
                total,
                num_votes,
            };
            (result, index)
        });
        info!(
            index,
            total = result.total,
            num_votes = result.num_votes,
            "tally published"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn empty_tally() {
        let committee = Committee::in_memory(3);
        let result = TallyEngine::new(&committee).compute();
        assert_eq!(result.local_sums, vec![0, 0, 0]);
        assert_eq!(result.total, 0);
        assert_eq!(result.num_votes, 0);
    }

    #[test]
    fn tally_is_additive() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let committee = Committee::in_memory(4);
        let votes = [1u64, 0, 1, 1, 0, 1, 7, MODULUS - 1];
        for (i, vote) in votes.iter().enumerate() {
            let ballot = Ballot::prepare(&mut rng, *vote, 4).unwrap();
            committee
                .record(&format!("voter-{}", i), &ballot.shares, &ballot.commits)
                .unwrap();
        }

        let result = TallyEngine::new(&committee).compute();
        assert_eq!(result.total, sum_mod(votes.iter().copied()));
        assert_eq!(result.num_votes, votes.len());
        assert!(result.local_sums.iter().all(|s| *s < MODULUS));
    }

    #[test]
    fn publish_appends_each_time() {
        let committee = Committee::in_memory(2);
        let commitments: Vec<Commitment> = vec![commit(3, "a"), commit(4, "b")];
        committee.record("alice", &[3, 4], &commitments).unwrap();

        let board = BulletinBoard::new(Box::new(MemLog::<BoardEntry>::default()), Arc::new(ManualClock::new(10.0)));
        let engine = TallyEngine::new(&committee);

        let first = engine.publish(&board);
        let second = engine.publish(&board);
        assert_eq!(first, second);
        assert_eq!(first.total, 7);
        assert_eq!(board.len(), 2);
        assert_eq!(
            board.read_all()[0],
            BoardEntry::TallyPublished {
                local_sums: vec![3, 4],
                total: 7,
                ts: 10.0
            }
        );

        // Stores are untouched
        assert_eq!(committee.authority(0).unwrap().len(), 1);
    }
}
