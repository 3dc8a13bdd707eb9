//! Dynamic lobby: the table registry and its replenishment policy.
//!
//! At startup the lobby opens one system table per (variant, stake)
//! pair from the configured stake sheet. Whenever a join fills the
//! last open seat of a class, a fresh system table is provisioned so
//! every stake always has somewhere to sit. User-created tables are
//! registered alongside but never replenished.
//!
//! Table ids encode origin, class, and a per-class counter:
//! `sys-texas-1/2-0`, `usr-omaha_hi_lo-5/10-3`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::game::entities::{BettingType, Blinds, Chips, TableId, TableSummary};
use crate::game::variant::Variant;
use crate::table::{TableActor, TableConfig, TableHandle};
use crate::wallet::WalletAdapter;

/// One row of the stake sheet.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StakeDef {
    pub label: String,
    pub small: Chips,
    pub big: Chips,
}

impl StakeDef {
    #[must_use]
    pub fn new(small: Chips, big: Chips) -> Self {
        Self {
            label: format!("{small}/{big}"),
            small,
            big,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LobbyConfig {
    pub stakes: Vec<StakeDef>,
    pub variants: Vec<Variant>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            stakes: vec![StakeDef::new(1, 2), StakeDef::new(5, 10), StakeDef::new(25, 50)],
            variants: Variant::ALL.to_vec(),
        }
    }
}

/// Registry of live tables, keyed by id.
pub struct Lobby {
    config: LobbyConfig,
    wallet: Arc<dyn WalletAdapter>,
    /// Actors report summary changes through this channel.
    lobby_tx: mpsc::Sender<TableSummary>,
    tables: RwLock<HashMap<TableId, TableHandle>>,
    /// Monotonic id counter per `{variant}-{stake}` class.
    counters: Mutex<HashMap<String, u64>>,
}

impl Lobby {
    /// Build the registry and open the initial system tables.
    pub async fn start(
        config: LobbyConfig,
        wallet: Arc<dyn WalletAdapter>,
        lobby_tx: mpsc::Sender<TableSummary>,
    ) -> Arc<Self> {
        let lobby = Arc::new(Self {
            config,
            wallet,
            lobby_tx,
            tables: RwLock::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        });
        for variant in lobby.config.variants.clone() {
            for stake in lobby.config.stakes.clone() {
                lobby.provision_system_table(variant, &stake).await;
            }
        }
        let count = lobby.tables.read().await.len();
        info!("lobby: opened {count} system tables");
        lobby
    }

    /// Pot-limit for the Omaha family, no-limit for everything else.
    fn default_betting(variant: Variant) -> BettingType {
        if variant.must_use_two() {
            BettingType::PotLimit
        } else {
            BettingType::NoLimit
        }
    }

    fn next_table_id(&self, prefix: &str, variant: Variant, stake_label: &str) -> TableId {
        let class = format!("{variant}-{stake_label}");
        let mut counters = self.counters.lock().expect("counter lock");
        let counter = counters.entry(class.clone()).or_insert(0);
        let id = format!("{prefix}-{class}-{counter}");
        *counter += 1;
        id
    }

    async fn provision_system_table(&self, variant: Variant, stake: &StakeDef) -> TableId {
        let id = self.next_table_id("sys", variant, &stake.label);
        let config = TableConfig {
            variant,
            betting: Self::default_betting(variant),
            blinds: Blinds::new(stake.small, stake.big),
            stake_label: stake.label.clone(),
            system: true,
        };
        let handle = TableActor::spawn(
            id.clone(),
            &config,
            self.wallet.clone(),
            self.lobby_tx.clone(),
        );
        self.tables.write().await.insert(id.clone(), handle);
        info!("lobby: provisioned system table {id}");
        id
    }

    /// Open a user table. Registered like any other but exempt from
    /// replenishment.
    pub async fn create_user_table(
        &self,
        variant: Variant,
        stake_label: String,
        blinds: Blinds,
        betting: BettingType,
    ) -> Result<TableId, String> {
        let config = TableConfig {
            variant,
            betting,
            blinds,
            stake_label: stake_label.clone(),
            system: false,
        };
        config.validate()?;

        let id = self.next_table_id("usr", variant, &stake_label);
        let handle = TableActor::spawn(
            id.clone(),
            &config,
            self.wallet.clone(),
            self.lobby_tx.clone(),
        );
        self.tables.write().await.insert(id.clone(), handle);
        info!("lobby: user table {id} created");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Option<TableHandle> {
        self.tables.read().await.get(id).cloned()
    }

    /// Current summaries for every registered table, ordered by id.
    pub async fn summaries(&self) -> Vec<TableSummary> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(summary) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// After a join: if every system table of this class is at its
    /// seat cap, open another so the stake stays seatable. Classes
    /// outside the stake sheet (user stakes) are left alone.
    pub async fn ensure_capacity(&self, variant: Variant, stake_label: &str) {
        let Some(stake) = self
            .config
            .stakes
            .iter()
            .find(|s| s.label == stake_label)
            .cloned()
        else {
            return;
        };
        if !self.config.variants.contains(&variant) {
            return;
        }

        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();
        for handle in handles {
            if let Ok(summary) = handle.summary().await
                && summary.system
                && summary.variant == variant
                && summary.stake == stake_label
                && summary.seats_taken < summary.max_seats
            {
                return;
            }
        }
        info!("lobby: class {variant}-{stake_label} is full, replenishing");
        self.provision_system_table(variant, &stake).await;
    }
}
