//! Server configuration.
//!
//! Everything comes from environment variables with sensible defaults;
//! CLI flags override. `.env` files are honored by `main`.

use std::net::SocketAddr;

use pokerroom::{Chips, StakeDef, Variant};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// One dev credential: `token:player:display`.
#[derive(Clone, Debug)]
pub struct DevToken {
    pub token: String,
    pub player: String,
    pub display_name: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address.
    pub bind: SocketAddr,
    /// Stake sheet for system tables.
    pub stakes: Vec<StakeDef>,
    /// Variants the lobby provisions system tables for.
    pub variants: Vec<Variant>,
    /// Dev-wallet starting balance per player.
    pub starting_balance: Chips,
    /// Static identities for the dev resolver.
    pub dev_tokens: Vec<DevToken>,
}

impl ServerConfig {
    /// Load configuration from the environment.
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => std::env::var("PR_BIND")
                .unwrap_or_else(|_| "127.0.0.1:7070".to_string())
                .parse()
                .map_err(|e| ConfigError::Invalid {
                    var: "PR_BIND".to_string(),
                    reason: format!("{e}"),
                })?,
        };

        let stakes = match std::env::var("PR_STAKES") {
            Ok(raw) => parse_stakes(&raw)?,
            Err(_) => vec![StakeDef::new(1, 2), StakeDef::new(5, 10), StakeDef::new(25, 50)],
        };

        let variants = match std::env::var("PR_VARIANTS") {
            Ok(raw) => parse_variants(&raw)?,
            Err(_) => Variant::ALL.to_vec(),
        };

        let starting_balance = match std::env::var("PR_STARTING_BALANCE") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::Invalid {
                var: "PR_STARTING_BALANCE".to_string(),
                reason: format!("{e}"),
            })?,
            Err(_) => 10_000,
        };

        let dev_tokens = match std::env::var("PR_DEV_TOKENS") {
            Ok(raw) => parse_dev_tokens(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            bind,
            stakes,
            variants,
            starting_balance,
            dev_tokens,
        })
    }
}

/// `"1/2,5/10"` → stake defs.
fn parse_stakes(raw: &str) -> Result<Vec<StakeDef>, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "PR_STAKES".to_string(),
        reason: reason.to_string(),
    };
    let mut stakes = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (small, big) = entry
            .split_once('/')
            .ok_or_else(|| invalid("expected small/big pairs"))?;
        let small: Chips = small.parse().map_err(|_| invalid("bad small blind"))?;
        let big: Chips = big.parse().map_err(|_| invalid("bad big blind"))?;
        if small == 0 || big <= small {
            return Err(invalid("blinds must satisfy 0 < small < big"));
        }
        stakes.push(StakeDef::new(small, big));
    }
    if stakes.is_empty() {
        return Err(invalid("no stakes configured"));
    }
    Ok(stakes)
}

/// `"texas,omaha_hi_lo"` → variants, matching the wire labels.
fn parse_variants(raw: &str) -> Result<Vec<Variant>, ConfigError> {
    let mut variants = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let variant = Variant::ALL
            .into_iter()
            .find(|v| v.to_string() == entry)
            .ok_or_else(|| ConfigError::Invalid {
                var: "PR_VARIANTS".to_string(),
                reason: format!("unknown variant {entry}"),
            })?;
        variants.push(variant);
    }
    Ok(variants)
}

/// `"tok1:alice:Alice,tok2:bob:Bob"` → dev credentials.
fn parse_dev_tokens(raw: &str) -> Result<Vec<DevToken>, ConfigError> {
    let mut tokens = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut parts = entry.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(token), Some(player), Some(display_name))
                if !token.is_empty() && !player.is_empty() =>
            {
                tokens.push(DevToken {
                    token: token.to_string(),
                    player: player.to_string(),
                    display_name: display_name.to_string(),
                });
            }
            _ => {
                return Err(ConfigError::Invalid {
                    var: "PR_DEV_TOKENS".to_string(),
                    reason: format!("expected token:player:display, got {entry}"),
                });
            }
        }
    }
    Ok(tokens)
}
