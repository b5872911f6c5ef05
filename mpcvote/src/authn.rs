//! One-time eligibility tokens.
//!
//! A token is `"<voter_id>:<nonce>.<issued_ts>.<signature>"`, where the
//! signature is an ed25519 signature by the election authority over
//! `"<voter_id>:<nonce>.<issued_ts>"`. Tokens are not blind-signed: the
//! authority can link a token to the voter it was issued to.

use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;
use rand::Rng;
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TokenAuthority {
    secret: SecretKey,
    public_key: PublicKey,
    validity_secs: u64,
    tokens: Box<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    pub fn new(
        secret: SecretKey,
        validity_secs: u64,
        tokens: Box<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let public_key: PublicKey = (&secret).into();
        TokenAuthority {
            secret,
            public_key,
            validity_secs,
            tokens,
            clock,
        }
    }

    /// The public key tokens are verified against
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Number of tokens issued so far
    pub fn issued_count(&self) -> usize {
        self.tokens.len()
    }

    /// Look up the metadata of an issued token
    pub fn token_record(&self, token: &str) -> Option<TokenRecord> {
        self.tokens.get(token)
    }

    /// Issue a fresh token for a voter and announce it on the board.
    ///
    /// Issuing twice for the same voter yields two independent valid tokens.
    pub fn issue(&self, voter_id: &str, board: &BulletinBoard) -> String {
        let mut csprng = rand::rngs::OsRng {};
        let nonce: [u8; 8] = csprng.gen();

        let issued_at = self.clock.now();
        let payload = format!("{}:{}.{}", voter_id, hex::encode(nonce), issued_at as u64);

        let expanded: ExpandedSecretKey = (&self.secret).into();
        let signature = expanded.sign(payload.as_bytes(), &self.public_key);
        let token = format!("{}.{}", payload, hex::encode(signature.to_bytes()));

        self.tokens.insert(
            &token,
            TokenRecord {
                voter_id: voter_id.to_owned(),
                consumed: false,
                issued_at,
            },
        );
        board.post(|ts| BoardEntry::TokenIssued {
            voter_id: voter_id.to_owned(),
            token: token.clone(),
            ts,
        });
        info!(voter_id, "token issued");

        token
    }

    /// Check a token's signature and age, that it was issued here, that it is
    /// unused, and that it belongs to `voter_id`.
    ///
    /// This does not consume the token; see `claim`.
    pub fn verify_and_authenticate(
        &self,
        token: &str,
        voter_id: &str,
    ) -> Result<TokenRecord, ProtocolError> {
        let issued_ts = self.verify_signature(token)?;

        let age = self.clock.now() - issued_ts as f64;
        if age > self.validity_secs as f64 {
            return Err(ProtocolError::TokenExpired(format!(
                "token is {:.0}s old, maximum is {}s",
                age, self.validity_secs
            )));
        }

        let record = self.tokens.get(token).ok_or_else(|| {
            ProtocolError::UnknownToken("token was not issued by this authority".to_owned())
        })?;
        if record.consumed {
            return Err(ProtocolError::TokenAlreadyUsed(
                "a vote has already been submitted with this token".to_owned(),
            ));
        }
        if record.voter_id != voter_id {
            return Err(ProtocolError::IdentityMismatch(format!(
                "token was not issued to {}",
                voter_id
            )));
        }

        debug!(voter_id, "token authenticated");
        Ok(record)
    }

    /// Atomically consume a token. Only one caller can ever succeed.
    pub fn claim(&self, token: &str) -> Result<TokenRecord, ProtocolError> {
        match self.tokens.claim(token) {
            Claim::Claimed(record) => Ok(record),
            Claim::AlreadyUsed => Err(ProtocolError::TokenAlreadyUsed(
                "a vote has already been submitted with this token".to_owned(),
            )),
            Claim::Unknown => Err(ProtocolError::UnknownToken(
                "token was not issued by this authority".to_owned(),
            )),
        }
    }

    /// Verify the signature, returning the signed issue timestamp
    fn verify_signature(&self, token: &str) -> Result<u64, ProtocolError> {
        let malformed = || ProtocolError::InvalidSignature("malformed token".to_owned());

        let (signed, signature_hex) = token.rsplit_once('.').ok_or_else(malformed)?;
        let (_payload, issued_ts) = signed.rsplit_once('.').ok_or_else(malformed)?;

        let signature_bytes = hex::decode(signature_hex).map_err(|_| malformed())?;
        let signature = Signature::try_from(signature_bytes.as_slice()).map_err(|_| malformed())?;

        self.public_key
            .verify_strict(signed.as_bytes(), &signature)
            .map_err(|e| ProtocolError::InvalidSignature(e.to_string()))?;

        issued_ts.parse::<u64>().map_err(|_| malformed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 60 * 60 * 24;

    fn authority() -> (TokenAuthority, Arc<ManualClock>) {
        let (secret, _public) = generate_keypair();
        let clock = Arc::new(ManualClock::new(1_700_000_000.0));
        let authority = TokenAuthority::new(
            secret,
            DAY,
            Box::new(MemTokenStore::default()),
            clock.clone(),
        );
        (authority, clock)
    }

    #[test]
    fn issue_and_verify() {
        let (authority, _clock) = authority();
        let board = BulletinBoard::default();

        let token = authority.issue("alice", &board);
        assert!(token.starts_with("alice:"));

        let record = authority.verify_and_authenticate(&token, "alice").unwrap();
        assert_eq!(record.voter_id, "alice");
        assert!(!record.consumed);
        assert_eq!(authority.issued_count(), 1);

        match &board.read_all()[..] {
            [BoardEntry::TokenIssued {
                voter_id, token: t, ..
            }] => {
                assert_eq!(voter_id, "alice");
                assert_eq!(t, &token);
            }
            other => panic!("unexpected board {:?}", other),
        }
    }

    #[test]
    fn duplicate_issuance_gives_distinct_tokens() {
        let (authority, _clock) = authority();
        let board = BulletinBoard::default();
        let t1 = authority.issue("alice", &board);
        let t2 = authority.issue("alice", &board);
        assert_ne!(t1, t2);
        assert!(authority.verify_and_authenticate(&t1, "alice").is_ok());
        assert!(authority.verify_and_authenticate(&t2, "alice").is_ok());
    }

    #[test]
    fn voter_ids_with_separators() {
        let (authority, _clock) = authority();
        let board = BulletinBoard::default();
        let token = authority.issue("a.b:c", &board);
        assert!(authority.verify_and_authenticate(&token, "a.b:c").is_ok());
    }

    #[test]
    fn identity_mismatch() {
        let (authority, _clock) = authority();
        let token = authority.issue("alice", &BulletinBoard::default());
        let err = authority.verify_and_authenticate(&token, "bob").unwrap_err();
        assert_eq!(err.kind(), "IdentityMismatch");
    }

    #[test]
    fn tampered_and_malformed_tokens() {
        let (authority, _clock) = authority();
        let token = authority.issue("alice", &BulletinBoard::default());

        let tampered = token.replacen("alice", "mallory", 1);
        let err = authority.verify_and_authenticate(&tampered, "mallory").unwrap_err();
        assert_eq!(err.kind(), "InvalidSignature");

        for bad in &["", "no-dots", "a.b", "a.1.zz", "a.1.abcd"] {
            let err = authority.verify_and_authenticate(bad, "a").unwrap_err();
            assert_eq!(err.kind(), "InvalidSignature", "token {:?}", bad);
        }
    }

    #[test]
    fn token_from_another_authority() {
        let (authority, _clock) = authority();
        let (other, _clock) = self::authority();
        let token = other.issue("alice", &BulletinBoard::default());
        let err = authority.verify_and_authenticate(&token, "alice").unwrap_err();
        assert_eq!(err.kind(), "InvalidSignature");
    }

    #[test]
    fn unknown_token_with_valid_signature() {
        let (secret, _public) = generate_keypair();
        let secret_copy = SecretKey::from_bytes(secret.as_bytes()).unwrap();
        let clock = Arc::new(ManualClock::new(1_700_000_000.0));

        // Same signing key, different token store: a restarted process
        let issuer = TokenAuthority::new(secret, DAY, Box::new(MemTokenStore::default()), clock.clone());
        let verifier = TokenAuthority::new(secret_copy, DAY, Box::new(MemTokenStore::default()), clock);

        let token = issuer.issue("alice", &BulletinBoard::default());
        let err = verifier.verify_and_authenticate(&token, "alice").unwrap_err();
        assert_eq!(err.kind(), "UnknownToken");
    }

    #[test]
    fn expiry() {
        let (authority, clock) = authority();
        let token = authority.issue("alice", &BulletinBoard::default());

        clock.advance(DAY as f64 - 1.0);
        assert!(authority.verify_and_authenticate(&token, "alice").is_ok());

        clock.advance(2.0);
        let err = authority.verify_and_authenticate(&token, "alice").unwrap_err();
        assert_eq!(err.kind(), "TokenExpired");
    }

    #[test]
    fn claim_once() {
        let (authority, _clock) = authority();
        let token = authority.issue("alice", &BulletinBoard::default());

        assert!(authority.claim(&token).unwrap().consumed);
        assert_eq!(authority.claim(&token).unwrap_err().kind(), "TokenAlreadyUsed");
        assert_eq!(
            authority.verify_and_authenticate(&token, "alice").unwrap_err().kind(),
            "TokenAlreadyUsed"
        );
        assert_eq!(authority.claim("nope").unwrap_err().kind(), "UnknownToken");
    }
}
