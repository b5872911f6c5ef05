//! The election service: owns all protocol state and exposes the public
//! operations. Construct one per process and share it behind an `Arc`.

use crate::*;
use ed25519_dalek::PublicKey;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Storage backends for every piece of protocol state
pub struct Stores {
    pub tokens: Box<dyn TokenStore>,
    pub authorities: Vec<Box<dyn AuthorityStore>>,
    pub board: Box<dyn AppendLog<BoardEntry>>,
    pub submissions: Box<dyn AppendLog<SubmissionRecord>>,
}

impl Stores {
    pub fn in_memory(num_authorities: usize) -> Self {
        Stores {
            tokens: Box::new(MemTokenStore::default()),
            authorities: (0..num_authorities)
                .map(|_| Box::new(MemAuthorityStore::default()) as Box<dyn AuthorityStore>)
                .collect(),
            board: Box::new(MemLog::<BoardEntry>::default()),
            submissions: Box::new(MemLog::<SubmissionRecord>::default()),
        }
    }
}

/// Returned by `issue_token`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssuedToken {
    pub token: String,
    pub note: String,
}

pub struct Election {
    authority: TokenAuthority,
    committee: Committee,
    board: BulletinBoard,
    submissions: Box<dyn AppendLog<SubmissionRecord>>,
    admin_secret: String,
}

impl Election {
    /// An election with in-memory storage and the system clock
    pub fn new(config: Config) -> Result<Self, Error> {
        let stores = Stores::in_memory(config.num_authorities);
        Election::with_stores(config, stores, Arc::new(SystemClock))
    }

    pub fn with_stores(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        config.validate()?;
        if stores.authorities.len() != config.num_authorities {
            return Err(Error::CommitteeSizeMismatch(
                stores.authorities.len(),
                config.num_authorities,
            ));
        }

        let signing_key = match config.signing_key {
            Some(key) => key,
            None => {
                warn!("no signing key configured, generating an ephemeral one");
                let (secret, _public) = generate_keypair();
                secret
            }
        };

        let authority = TokenAuthority::new(
            signing_key,
            config.token_validity_secs,
            stores.tokens,
            clock.clone(),
        );
        info!(
            num_authorities = config.num_authorities,
            public_key = %hex::encode(authority.public_key().as_bytes()),
            "election started"
        );

        Ok(Election {
            authority,
            committee: Committee::from_stores(stores.authorities),
            board: BulletinBoard::new(stores.board, clock),
            submissions: stores.submissions,
            admin_secret: config.admin_secret,
        })
    }

    pub fn num_authorities(&self) -> usize {
        self.committee.size()
    }

    /// The key voters and auditors verify tokens against
    pub fn token_public_key(&self) -> PublicKey {
        self.authority.public_key()
    }

    /// Issue a one-time voting token.
    ///
    /// The caller is responsible for authenticating the voter first.
    #[instrument(level = "info", skip(self))]
    pub fn issue_token(&self, voter_id: &str) -> IssuedToken {
        let token = self.authority.issue(voter_id, &self.board);
        IssuedToken {
            token,
            note: "Token is not blind-signed; the authority can link it to the voter.".to_owned(),
        }
    }

    /// Submit a vote
    pub fn submit_vote(&self, submission: VoteSubmission) -> Result<Receipt, ProtocolError> {
        let protocol = SubmissionProtocol {
            authority: &self.authority,
            committee: &self.committee,
            board: &self.board,
            submissions: self.submissions.as_ref(),
        };
        protocol.submit(submission)
    }

    /// Compute the tally and publish it on the bulletin board
    #[instrument(level = "info", skip_all)]
    pub fn compute_tally(&self, admin_credential: &str) -> Result<TallyResult, ProtocolError> {
        if !constant_time_eq(admin_credential.as_bytes(), self.admin_secret.as_bytes()) {
            warn!("tally requested with a bad admin credential");
            return Err(ProtocolError::Unauthorized(
                "admin credential does not match".to_owned(),
            ));
        }

        Ok(TallyEngine::new(&self.committee).publish(&self.board))
    }

    /// Recompute the tally without publishing anything. Public.
    pub fn verify_reconstruction(&self) -> TallyResult {
        TallyEngine::new(&self.committee).compute()
    }

    /// The full bulletin board, in arrival order. Public.
    pub fn read_bulletin_board(&self) -> Vec<BoardEntry> {
        self.board.read_all()
    }

    pub fn board_snapshot(&self) -> BoardSnapshot {
        self.board.snapshot()
    }

    /// Every accepted submission, including raw shares. Not for publication.
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.submissions.read_all()
    }

    /// Check that a voter's commitment at one authority opens with `blinding`
    pub fn check_commitment(&self, authority: usize, voter_id: &str, blinding: &str) -> bool {
        self.committee.check_commitment(authority, voter_id, blinding)
    }
}
