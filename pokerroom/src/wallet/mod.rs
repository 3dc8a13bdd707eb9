//! Wallet seam.
//!
//! Money lives outside the room. The engine's chips are play-state;
//! the [`WalletAdapter`] is consulted at seat join (reserve the
//! buy-in), at cash-out and pot settlement (credit), and at hand end
//! (rake attribution). The core never persists balances itself.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::game::entities::{Chips, PlayerId, TableId};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum WalletError {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Chips, available: Chips },
    #[error("unknown player")]
    UnknownPlayer,
    #[error("wallet backend unavailable: {0}")]
    Unavailable(String),
}

/// What the rake accounting needs to attribute one hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HandMeta {
    pub table: TableId,
    pub hand_number: u64,
    pub pot: Chips,
}

/// External money operations, implemented by the payment stack.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Hold `amount` for a buy-in. Failure rejects the seat.
    async fn reserve(&self, player: &PlayerId, amount: Chips) -> Result<(), WalletError>;

    /// Return chips to the player's balance (cash-out or winnings).
    async fn credit(&self, player: &PlayerId, amount: Chips) -> Result<(), WalletError>;

    /// Report per-seat pot contributions for weighted-contributed-rake
    /// accounting. Advisory; failures are logged, not retried.
    async fn rake_contribution(
        &self,
        meta: &HandMeta,
        per_seat_shares: &[(PlayerId, Chips)],
    ) -> Result<(), WalletError>;
}

/// In-memory wallet for tests and single-node development. Every
/// player starts with the configured balance on first contact.
pub struct InMemoryWallet {
    starting_balance: Chips,
    balances: RwLock<HashMap<PlayerId, Chips>>,
}

impl InMemoryWallet {
    #[must_use]
    pub fn new(starting_balance: Chips) -> Self {
        Self {
            starting_balance,
            balances: RwLock::new(HashMap::new()),
        }
    }

    pub async fn balance(&self, player: &PlayerId) -> Chips {
        *self
            .balances
            .read()
            .await
            .get(player)
            .unwrap_or(&self.starting_balance)
    }
}

#[async_trait]
impl WalletAdapter for InMemoryWallet {
    async fn reserve(&self, player: &PlayerId, amount: Chips) -> Result<(), WalletError> {
        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(player.clone())
            .or_insert(self.starting_balance);
        if *balance < amount {
            return Err(WalletError::InsufficientFunds {
                needed: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    async fn credit(&self, player: &PlayerId, amount: Chips) -> Result<(), WalletError> {
        let mut balances = self.balances.write().await;
        let balance = balances
            .entry(player.clone())
            .or_insert(self.starting_balance);
        *balance += amount;
        Ok(())
    }

    async fn rake_contribution(
        &self,
        meta: &HandMeta,
        per_seat_shares: &[(PlayerId, Chips)],
    ) -> Result<(), WalletError> {
        log::debug!(
            "rake attribution for {} hand #{}: {} contributors",
            meta.table,
            meta.hand_number,
            per_seat_shares.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_and_credit_round_trip() {
        let wallet = InMemoryWallet::new(1000);
        let alice: PlayerId = "alice".into();

        wallet.reserve(&alice, 300).await.unwrap();
        assert_eq!(wallet.balance(&alice).await, 700);

        wallet.credit(&alice, 450).await.unwrap();
        assert_eq!(wallet.balance(&alice).await, 1150);
    }

    #[tokio::test]
    async fn reserve_fails_over_balance() {
        let wallet = InMemoryWallet::new(100);
        let bob: PlayerId = "bob".into();

        assert_eq!(
            wallet.reserve(&bob, 200).await,
            Err(WalletError::InsufficientFunds {
                needed: 200,
                available: 100
            })
        );
        // A failed reserve holds nothing.
        assert_eq!(wallet.balance(&bob).await, 100);
    }
}
