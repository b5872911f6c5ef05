use crate::*;
use ed25519_dalek::SecretKey;
use std::env::var;
use tracing::warn;

pub const DEFAULT_AUTHORITIES: usize = 3;
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 60 * 60 * 24;
pub const DEFAULT_ADMIN_SECRET: &str = "admin-secret-demo";

pub struct Config {
    /// Number of tallying authorities
    pub num_authorities: usize,

    /// Shared secret that gates tally publication
    pub admin_secret: String,

    /// How long an issued token stays valid
    pub token_validity_secs: u64,

    /// The election authority's token signing key. Generated if not set.
    pub signing_key: Option<SecretKey>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            num_authorities: DEFAULT_AUTHORITIES,
            admin_secret: DEFAULT_ADMIN_SECRET.to_owned(),
            token_validity_secs: DEFAULT_TOKEN_VALIDITY_SECS,
            signing_key: None,
        }
    }
}

impl Config {
    /// Read the configuration from `MPCVOTE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_vars(|key| var(key).ok())
    }

    /// Read the configuration from any key lookup, falling back to defaults
    pub fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = get("MPCVOTE_AUTHORITIES") {
            config.num_authorities = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::BadNumber("MPCVOTE_AUTHORITIES", val))?;
        }

        if let Some(val) = get("MPCVOTE_TOKEN_VALIDITY_SECS") {
            config.token_validity_secs = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::BadNumber("MPCVOTE_TOKEN_VALIDITY_SECS", val))?;
        }

        match get("MPCVOTE_ADMIN_SECRET") {
            Some(val) => config.admin_secret = val,
            None => warn!("MPCVOTE_ADMIN_SECRET not set, using the demo admin secret"),
        }

        if let Some(val) = get("MPCVOTE_SIGNING_KEY") {
            let bytes =
                hex::decode(val.trim()).map_err(|_| ConfigError::BadHex("MPCVOTE_SIGNING_KEY"))?;
            config.signing_key = Some(SecretKey::from_bytes(&bytes)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_authorities < 2 {
            return Err(ConfigError::CommitteeTooSmall(self.num_authorities));
        }
        if self.token_validity_secs == 0 {
            return Err(ConfigError::ZeroValidity);
        }
        if self.admin_secret.is_empty() {
            return Err(ConfigError::EmptyAdminSecret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.num_authorities, 3);
        assert_eq!(config.token_validity_secs, 86400);
        assert_eq!(config.admin_secret, "admin-secret-demo");
        assert!(config.signing_key.is_none());
    }

    #[test]
    fn overrides() {
        let (secret, _public) = generate_keypair();
        let key_hex = hex::encode(secret.as_bytes());
        let config = from_map(&[
            ("MPCVOTE_AUTHORITIES", "5"),
            ("MPCVOTE_TOKEN_VALIDITY_SECS", " 60 "),
            ("MPCVOTE_ADMIN_SECRET", "hunter2"),
            ("MPCVOTE_SIGNING_KEY", key_hex.as_str()),
        ])
        .unwrap();
        assert_eq!(config.num_authorities, 5);
        assert_eq!(config.token_validity_secs, 60);
        assert_eq!(config.admin_secret, "hunter2");
        assert_eq!(
            config.signing_key.unwrap().as_bytes(),
            secret.as_bytes()
        );
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            from_map(&[("MPCVOTE_AUTHORITIES", "three")]),
            Err(ConfigError::BadNumber("MPCVOTE_AUTHORITIES", _))
        ));
        assert!(matches!(
            from_map(&[("MPCVOTE_AUTHORITIES", "1")]),
            Err(ConfigError::CommitteeTooSmall(1))
        ));
        assert!(matches!(
            from_map(&[("MPCVOTE_TOKEN_VALIDITY_SECS", "0")]),
            Err(ConfigError::ZeroValidity)
        ));
        assert!(matches!(
            from_map(&[("MPCVOTE_ADMIN_SECRET", "")]),
            Err(ConfigError::EmptyAdminSecret)
        ));
        assert!(matches!(
            from_map(&[("MPCVOTE_SIGNING_KEY", "xyz")]),
            Err(ConfigError::BadHex(_))
        ));
        assert!(matches!(
            from_map(&[("MPCVOTE_SIGNING_KEY", "abcd")]),
            Err(ConfigError::BadSigningKey(_))
        ));
    }
}
