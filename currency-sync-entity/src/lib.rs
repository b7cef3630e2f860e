pub mod cached_reply;
pub mod dedup_entry;
pub mod exchange_rate;
pub mod payload_ledger;

pub use cached_reply::Entity as CachedReply;
pub use dedup_entry::Entity as DedupEntry;
pub use exchange_rate::Entity as ExchangeRate;
pub use payload_ledger::Entity as PayloadLedger;
