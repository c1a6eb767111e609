//! Alert delivery for the Pendle market monitor.
//!
//! This crate provides:
//! - JSON-file notification cache with per-entry TTLs (repeat-alert dedup)
//! - Telegram channel for outbound messages
//! - `Notifier` that gates alert dispatch through the cache

pub mod cache;
pub mod notifier;
pub mod telegram;

pub use cache::{CacheEntry, CacheError, CacheStats, NotificationCache};
pub use notifier::{DispatchOutcome, Notifier};
pub use telegram::{AlertChannel, NotificationError, TelegramChannel};
