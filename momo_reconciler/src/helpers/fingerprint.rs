use blake2::{Blake2s256, Digest};
use chrono::{DateTime, Duration, Utc};
use momo_common::helpers::normalize_whitespace_lowercase;

/// A stable identifier for "the same notification delivered again".
///
/// The fingerprint hashes the whitespace-normalised text together with the arrival-time bucket it falls in, so
/// a webhook retry that lands in the same bucket produces the same fingerprint, while the same text arriving
/// much later (e.g. a second, genuine payment of the same amount from the same person) does not.
pub fn notification_fingerprint(raw_text: &str, received_at: DateTime<Utc>, bucket: Duration) -> String {
    let bucket_secs = bucket.num_seconds().max(1);
    let bucket_index = received_at.timestamp().div_euclid(bucket_secs);
    let mut hasher = Blake2s256::new();
    hasher.update(bucket_index.to_le_bytes());
    hasher.update(normalize_whitespace_lowercase(raw_text).as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// The fingerprints a replay of `raw_text` arriving at `received_at` could carry: the one for its own bucket (first)
/// and the one for the bucket before it. Checking both turns the fixed buckets into a sliding window, so a retry
/// that straddles a bucket boundary is still recognised.
pub fn recent_fingerprints(raw_text: &str, received_at: DateTime<Utc>, bucket: Duration) -> [String; 2] {
    [
        notification_fingerprint(raw_text, received_at, bucket),
        notification_fingerprint(raw_text, received_at - bucket, bucket),
    ]
}
