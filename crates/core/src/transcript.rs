//! Live transcript accumulation
//!
//! Streaming partials of the same role grow the open item in place;
//! a final marker or a turn boundary seals it and the next partial opens a
//! new one. The list is bounded; nothing here persists past the session.

use serde::Serialize;
use uuid::Uuid;

const MAX_ITEMS: usize = 50;

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    User,
    Model,
}

/// One line of the live transcript
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptItem {
    pub id: Uuid,
    pub role: TranscriptRole,
    pub text: String,
    pub is_final: bool,
}

/// Bounded streaming transcript
#[derive(Debug, Default)]
pub struct TranscriptLog {
    items: Vec<TranscriptItem>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a partial: grows the open same-role item, otherwise starts a
    /// new one
    pub fn append(&mut self, role: TranscriptRole, text: &str) {
        match self.items.last_mut() {
            Some(last) if last.role == role && !last.is_final => {
                last.text.push_str(text);
            }
            _ => {
                self.items.push(TranscriptItem {
                    id: Uuid::new_v4(),
                    role,
                    text: text.to_string(),
                    is_final: false,
                });
                if self.items.len() > MAX_ITEMS {
                    self.items.remove(0);
                }
            }
        }
    }

    /// Seal the open item (turn complete or interruption)
    pub fn finalize_turn(&mut self) {
        if let Some(last) = self.items.last_mut() {
            last.is_final = true;
        }
    }

    pub fn items(&self) -> &[TranscriptItem] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partials_grow_in_place() {
        let mut log = TranscriptLog::new();
        log.append(TranscriptRole::User, "god ");
        log.append(TranscriptRole::User, "morgon");
        assert_eq!(log.items().len(), 1);
        assert_eq!(log.items()[0].text, "god morgon");
    }

    #[test]
    fn test_role_change_opens_new_item() {
        let mut log = TranscriptLog::new();
        log.append(TranscriptRole::User, "hej");
        log.append(TranscriptRole::Model, "hello");
        assert_eq!(log.items().len(), 2);
    }

    #[test]
    fn test_finalize_seals_item() {
        let mut log = TranscriptLog::new();
        log.append(TranscriptRole::User, "hej");
        log.finalize_turn();
        log.append(TranscriptRole::User, "då");
        assert_eq!(log.items().len(), 2);
        assert!(log.items()[0].is_final);
        assert!(!log.items()[1].is_final);
    }

    #[test]
    fn test_bounded_length() {
        let mut log = TranscriptLog::new();
        for i in 0..60 {
            log.append(TranscriptRole::User, &format!("line {i}"));
            log.finalize_turn();
        }
        assert_eq!(log.items().len(), 50);
        assert_eq!(log.items()[0].text, "line 10");
    }
}
