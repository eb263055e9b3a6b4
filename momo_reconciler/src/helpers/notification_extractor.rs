//! Turns the free text of a mobile-money notification into a [`NotificationCandidate`].
//!
//! Extraction is pure: no I/O and no shared mutable state. The same text always yields the same candidate.
//!
//! Three things are looked for:
//! * **Amount** (required). A number written in the locale's [`CurrencyGrammar`], adjacent to a currency marker
//!   (`MMK 500,000`, `10,000 Ks`) or directly after an amount label (`Amount: 5,000`). Digits inside alphanumeric
//!   tokens such as `TXN882` are never amounts, and numbers introduced by an ignored label (`Balance: MMK 20,000`)
//!   are skipped. The first remaining amount in the text wins.
//! * **Transaction id** (optional). A labelled reference such as `Ref: TXN882`, `Txn# 55A1` or `Ref No. 42`. The code
//!   must contain at least one digit.
//! * **Sender name** (optional). A labelled sender such as `from KO AUNG.` or `Sender: Daw Hla`. The `Sender` label
//!   needs a colon; `from` and `sent by` do not.
use chrono::{DateTime, Utc};
use log::*;
use momo_common::MinorUnits;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::helpers::{currency::MAX_MINOR_DIGITS, CurrencyGrammar};

static TRANSACTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:ref(?:erence)?|txn(?:\s*id)?|tx\s*id|trans(?:action)?(?:\s*id)?)(?:\s*no\.?\s*|\s*[:#]\s*)+(?P<id>[a-z0-9]*\d[a-z0-9]*)\b",
    )
    .expect("transaction id pattern is valid")
});

static SENDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\b(?:from|sent\s+by)(?:\s*:\s*|\s+)|\bsender(?:\s+name)?\s*:\s*)(?P<name>\p{L}[\p{L} .'\-]*)")
        .expect("sender pattern is valid")
});

/// Words that end a sender name.
const NAME_TERMINATORS: [&str; 24] = [
    "on", "at", "via", "to", "for", "with", "ref", "reference", "txn", "transaction", "trans", "amount", "amt",
    "account", "wallet", "has", "have", "is", "was", "sent", "successfully", "received", "and", "into",
];

/// A sender "name" starting with one of these is a phrase, not a person.
const NOT_A_NAME: [&str; 9] = ["your", "the", "a", "an", "my", "our", "this", "mobile", "bank"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Invalid notification format: {0}")]
    InvalidFormat(String),
}

/// The structured reading of one inbound notification. Transient; owned by the processing call that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCandidate {
    pub amount: MinorUnits,
    pub transaction_id: Option<String>,
    pub sender_name: Option<String>,
    pub raw_text: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NotificationExtractor {
    grammar: CurrencyGrammar,
    prefixed_amount: Regex,
    suffixed_amount: Regex,
    labelled_amount: Option<Regex>,
}

impl Default for NotificationExtractor {
    fn default() -> Self {
        Self::new(CurrencyGrammar::default()).expect("the default currency grammar compiles")
    }
}

impl NotificationExtractor {
    /// Compiles the amount patterns for the given grammar. Fails only if the grammar has no currency markers, asks for
    /// more than [`MAX_MINOR_DIGITS`] minor digits, or contains text that cannot form a pattern.
    pub fn new(grammar: CurrencyGrammar) -> Result<Self, ExtractError> {
        if grammar.markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ExtractError::InvalidFormat("The currency grammar has no markers".into()));
        }
        if grammar.minor_digits > MAX_MINOR_DIGITS {
            let digits = grammar.minor_digits;
            let msg = format!("{digits} minor digits is more than the {MAX_MINOR_DIGITS} an amount can hold");
            return Err(ExtractError::InvalidFormat(msg));
        }
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| ExtractError::InvalidFormat(format!("Bad currency grammar: {e}")))
        };
        let prefixed_amount = compile(format!(r"{}\s*{}\b", grammar.marker_pattern(false), grammar.number_pattern("num")))?;
        let suffixed_amount = compile(format!(r"\b{}\s*{}", grammar.number_pattern("num"), grammar.marker_pattern(true)))?;
        let labelled_amount = if grammar.amount_labels.iter().any(|l| !l.trim().is_empty()) {
            Some(compile(format!(
                r"{}\s*[:=]?\s*(?:{}\s*)?{}\b",
                grammar.label_pattern(),
                grammar.marker_pattern(false),
                grammar.number_pattern("num")
            ))?)
        } else {
            None
        };
        Ok(Self { grammar, prefixed_amount, suffixed_amount, labelled_amount })
    }

    pub fn grammar(&self) -> &CurrencyGrammar {
        &self.grammar
    }

    /// Extracts a candidate from the raw notification text.
    ///
    /// Fails with [`ExtractError::InvalidFormat`] if the text contains no plausible, positive amount.
    pub fn extract(&self, raw_text: &str, received_at: DateTime<Utc>) -> Result<NotificationCandidate, ExtractError> {
        let amount = self.extract_amount(raw_text)?;
        let transaction_id = extract_transaction_id(raw_text);
        let sender_name = extract_sender_name(raw_text, &self.grammar.markers);
        trace!("🔎️ Extracted {amount} (txid: {transaction_id:?}, sender: {sender_name:?})");
        Ok(NotificationCandidate { amount, transaction_id, sender_name, raw_text: raw_text.to_string(), received_at })
    }

    pub fn extract_amount(&self, text: &str) -> Result<MinorUnits, ExtractError> {
        let mut found = [Some(&self.prefixed_amount), Some(&self.suffixed_amount), self.labelled_amount.as_ref()]
            .into_iter()
            .flatten()
            .flat_map(|re| re.captures_iter(text))
            .filter_map(|c| Some((c.get(0)?.start(), c.name("num")?)))
            .collect::<Vec<_>>();
        found.sort_by_key(|(start, num)| (*start, num.start()));
        let (_, number) = found
            .into_iter()
            .find(|(start, _)| !self.is_ignored(&text[..*start]))
            .ok_or_else(|| ExtractError::InvalidFormat("No amount found in the notification".into()))?;
        let amount = self.grammar.parse_number(number.as_str())?;
        if !amount.is_positive() {
            return Err(ExtractError::InvalidFormat(format!("Amount must be positive, found {}", number.as_str())));
        }
        Ok(amount)
    }

    /// True if one of the last few words before an amount, within the same sentence, is an ignored label such as
    /// "balance". A label directly followed by a full stop is an abbreviation (`Bal. 20,000 Ks`), not a sentence end.
    fn is_ignored(&self, preceding: &str) -> bool {
        let is_label = |w: &str| self.grammar.ignored_labels.iter().any(|l| l.eq_ignore_ascii_case(w));
        let mut rest = preceding;
        for _ in 0..IGNORED_LABEL_LOOKBACK {
            let head = rest.trim_end_matches(|c: char| !c.is_alphanumeric());
            let gap = &rest[head.len()..];
            let before = head.trim_end_matches(|c: char| c.is_alphanumeric());
            let word = &head[before.len()..];
            if word.is_empty() {
                return false;
            }
            let labelled = is_label(word);
            if ends_sentence(gap) && !(labelled && gap.starts_with('.')) {
                return false;
            }
            if labelled {
                return true;
            }
            rest = before;
        }
        false
    }
}

/// How many words before an amount are searched for an ignored label.
const IGNORED_LABEL_LOOKBACK: usize = 3;

/// A full stop counts only when followed by a space, so decimal points inside numbers do not end a sentence.
fn ends_sentence(gap: &str) -> bool {
    gap.contains(['!', '?', ';']) || gap.contains(". ") || gap.contains(".\n") || gap.ends_with('.')
}

pub fn extract_transaction_id(text: &str) -> Option<String> {
    TRANSACTION_ID.captures(text).and_then(|c| c.name("id")).map(|m| m.as_str().to_string())
}

pub fn extract_sender_name(text: &str, currency_markers: &[String]) -> Option<String> {
    SENDER.captures_iter(text).filter_map(|c| c.name("name")).find_map(|m| clean_name(m.as_str(), currency_markers))
}

fn clean_name(raw: &str, currency_markers: &[String]) -> Option<String> {
    // A full stop followed by a space ends the sentence, and so the name
    let head = raw.split(". ").next().unwrap_or(raw);
    let words = head
        .split_whitespace()
        .map(|w| w.trim_end_matches(['.', '-', '\'']))
        .take_while(|w| {
            let lower = w.to_lowercase();
            !NAME_TERMINATORS.contains(&lower.as_str()) && !currency_markers.iter().any(|m| m.eq_ignore_ascii_case(w))
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>();
    let first = words.first()?.to_lowercase();
    if NOT_A_NAME.contains(&first.as_str()) {
        return None;
    }
    Some(words.join(" "))
}
