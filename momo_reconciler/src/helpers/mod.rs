mod currency;
mod fingerprint;
mod notification_extractor;

pub use currency::CurrencyGrammar;
pub use fingerprint::{notification_fingerprint, recent_fingerprints};
pub use notification_extractor::{
    extract_sender_name,
    extract_transaction_id,
    ExtractError,
    NotificationCandidate,
    NotificationExtractor,
};
