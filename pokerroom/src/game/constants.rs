//! Game-wide tunables.

use std::time::Duration;

/// Seat cap for Texas and short-deck tables.
pub const MAX_SEATS: usize = 9;

/// Seat cap for every other variant.
pub const COMPACT_MAX_SEATS: usize = 6;

/// Raises allowed per betting round.
pub const MAX_RAISES_PER_ROUND: u8 = 4;

/// Time a player has to act before the server acts for them.
pub const TURN_TIMEOUT: Duration = Duration::from_secs(30);

/// Window a disconnected player has to re-attach before losing the seat.
pub const DISCONNECT_GRACE: Duration = Duration::from_secs(30);

/// Pause between the showdown broadcast and the next deal.
pub const NEXT_HAND_DELAY: Duration = Duration::from_secs(5);

/// Hands retained per table.
pub const HAND_HISTORY_CAPACITY: usize = 100;

/// Actions allowed per rolling window per (player, table).
pub const ACTION_RATE_LIMIT: usize = 5;

/// Rolling window for the action rate limit.
pub const ACTION_RATE_WINDOW: Duration = Duration::from_secs(1);

/// Hard floor between consecutive actions from one player. Anything
/// faster is automation, not a human.
pub const MIN_ACTION_INTERVAL: Duration = Duration::from_millis(100);

/// Deltas above the floor but under this get flagged at low severity.
pub const SUSPECT_ACTION_INTERVAL: Duration = Duration::from_millis(200);

/// Suspicious-activity events retained across all tables.
pub const ACTIVITY_LOG_CAPACITY: usize = 1000;

/// Attempts to push winnings to the wallet before queuing reconciliation.
pub const WALLET_CREDIT_RETRIES: u32 = 3;
