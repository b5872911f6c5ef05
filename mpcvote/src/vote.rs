use crate::*;
use digest::Digest;
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

/// A vote as submitted by a voter's client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VoteSubmission {
    pub token: String,
    pub voter_id: String,

    /// One share per authority, in authority order
    pub shares: Vec<u64>,

    /// One commitment per authority, in authority order
    pub commits: Vec<Commitment>,

    /// Placeholder proof, see `share_proof`
    pub proof: String,
}

impl VoteSubmission {
    /// Validate the shape and the proof.
    ///
    /// This has no side effects, so a submission rejected here leaves its
    /// token usable.
    pub fn validate(&self, committee_size: usize) -> Result<(), ProtocolError> {
        if self.shares.len() != committee_size || self.commits.len() != committee_size {
            return Err(ProtocolError::MalformedSubmission(format!(
                "expected {} shares and {} commitments, got {} and {}",
                committee_size,
                committee_size,
                self.shares.len(),
                self.commits.len()
            )));
        }

        let expected = share_proof(&self.shares);
        if !constant_time_eq(expected.as_bytes(), self.proof.as_bytes()) {
            return Err(ProtocolError::ProofMismatch(
                "proof was not computed over the submitted shares".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Placeholder for a zero-knowledge proof that the vote is 0 or 1.
///
/// `hex(SHA-256("s0|s1|...|sn"))` over the decimal share values. It only shows
/// the client used these exact shares; it says nothing about the vote itself.
pub fn share_proof(shares: &[u64]) -> String {
    let joined = shares
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("|");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

/// A voter's ballot, prepared client-side.
///
/// The blinding factors stay with the voter, they are needed to later open a
/// commitment at an authority.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ballot {
    pub shares: Vec<u64>,
    pub blindings: Vec<String>,
    pub commits: Vec<Commitment>,
    pub proof: String,
}

impl Ballot {
    /// Split a vote into `n` shares and commit to each share
    pub fn prepare<R: RngCore + CryptoRng>(rng: &mut R, vote: u64, n: usize) -> Result<Self, Error> {
        let shares = split(rng, vote, n)?;
        let blindings: Vec<String> = (0..n).map(|_| generate_blinding(rng)).collect();
        let commits = shares
            .iter()
            .zip(blindings.iter())
            .map(|(share, blinding)| commit(*share, blinding))
            .collect();
        let proof = share_proof(&shares);

        Ok(Ballot {
            shares,
            blindings,
            commits,
            proof,
        })
    }

    pub fn into_submission(self, token: &str, voter_id: &str) -> VoteSubmission {
        VoteSubmission {
            token: token.to_owned(),
            voter_id: voter_id.to_owned(),
            shares: self.shares,
            commits: self.commits,
            proof: self.proof,
        }
    }
}

/// A full record of an accepted submission. Never published.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub voter_id: String,
    pub token: String,
    pub shares: Vec<u64>,
    pub commits: Vec<Commitment>,
    pub proof: String,
    pub ts: f64,
}

/// Returned to the voter when a vote is accepted
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Receipt {
    pub status: String,

    /// Position of the `vote_submitted` entry on the bulletin board
    pub board_index: usize,
    pub note: String,
}

/// The vote submission protocol, over borrowed protocol state
pub struct SubmissionProtocol<'a> {
    pub authority: &'a TokenAuthority,
    pub committee: &'a Committee,
    pub board: &'a BulletinBoard,
    pub submissions: &'a dyn AppendLog<SubmissionRecord>,
}

impl<'a> SubmissionProtocol<'a> {
    /// Accept or reject a vote.
    ///
    /// The token is checked, then the shape and proof. Only once all of that
    /// passes is the token claimed, atomically; a concurrent submission with
    /// the same token loses the claim and gets `TokenAlreadyUsed`. After the
    /// claim the shares go to every authority in one transaction, and the
    /// board entry is posted inside it. The submission record comes last.
    #[instrument(level = "info", skip_all, fields(voter_id = %submission.voter_id))]
    pub fn submit(&self, submission: VoteSubmission) -> Result<Receipt, ProtocolError> {
        let result = self.try_submit(submission);
        if let Err(e) = &result {
            warn!(kind = e.kind(), reason = e.reason(), "vote rejected");
        }
        result
    }

    fn try_submit(&self, submission: VoteSubmission) -> Result<Receipt, ProtocolError> {
        self.authority
            .verify_and_authenticate(&submission.token, &submission.voter_id)?;
        submission.validate(self.committee.size())?;
        let staged = self
            .committee
            .stage(&submission.shares, &submission.commits)?;
        debug!("submission well-formed");

        self.authority.claim(&submission.token)?;

        // Nothing below can fail once the token is claimed
        let (board_index, ts) = self.committee.commit(&submission.voter_id, staged, |replaced| {
            if replaced > 0 {
                warn!(replaced, "voter already had shares recorded, overwriting");
            }
            self.board.post(|ts| BoardEntry::VoteSubmitted {
                voter_id: submission.voter_id.clone(),
                token: submission.token.clone(),
                commits: submission.commits.clone(),
                ts,
            })
        });

        self.submissions.append(SubmissionRecord {
            voter_id: submission.voter_id,
            token: submission.token,
            shares: submission.shares,
            commits: submission.commits,
            proof: submission.proof,
            ts,
        });
        info!(board_index, "vote recorded");

        Ok(Receipt {
            status: "ok".to_owned(),
            board_index,
            note: "Vote recorded. The proof is a placeholder and does not show the vote is 0 or 1."
                .to_owned(),
        })
    }
}
