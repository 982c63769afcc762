//! Constant variables.

/// Wire protocol version carried in every header.
pub const PROTOCOL_VERSION: u8 = 1;
/// Bits in an identifier, and so the number of fingers.
pub const NFINGERS: usize = 160;
/// Successors kept as backups.
pub const NSUCCESSORS: usize = 8;
/// Predecessors kept as backups.
pub const NPREDECESSORS: usize = 3;
/// Upper bound of unconfirmed fingers.
pub const MAX_PASSIVE_FINGERS: usize = 20;
/// Unanswered pings before a finger is evicted.
pub const PING_THRESH: u32 = 5;
/// Initial hop budget of find-successor and data messages.
pub const DEFAULT_TTL: u8 = 64;
/// Tickets older than this are rejected, in ms.
pub const TICKET_TIMEOUT_MS: u64 = 30 * 1000;
/// Bytes of salt behind every ticket.
pub const TICKET_SALT_LEN: usize = 16;
/// Bytes of digest kept in a ticket.
pub const TICKET_HASH_LEN: usize = 12;
/// Default period of stabilization and address discovery, in seconds.
pub const DEFAULT_STABILIZE_INTERVAL: u64 = 3;
/// Ping the predecessor every this many ticks.
pub const PRED_PING_TICKS: u64 = 5;
/// Garbage collect the finger list every this many ticks.
pub const CLEAN_UP_TICKS: u64 = 60;
