use serde::{Deserialize, Serialize};

use crate::simulation::StationId;

use super::packet::Tag;

/// A request to put `total_length` consecutive packets on the wire towards
/// one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    to: StationId,
    total_length: u32,
    sent_count: u32,
    tag: Tag,
}

impl Telegram {
    #[must_use]
    pub const fn new(to: StationId, total_length: u32, tag: Tag) -> Telegram {
        Telegram {
            to,
            total_length,
            sent_count: 0,
            tag,
        }
    }

    #[must_use]
    pub const fn to(&self) -> StationId {
        self.to
    }

    #[must_use]
    pub const fn total_length(&self) -> u32 {
        self.total_length
    }

    #[must_use]
    pub const fn sent_count(&self) -> u32 {
        self.sent_count
    }

    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.sent_count >= self.total_length
    }

    pub(crate) fn record_sent(&mut self) {
        self.sent_count += 1;
    }

    /// Contention wipes out whatever was already sent.
    pub(crate) fn restart(&mut self) {
        self.sent_count = 0;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelegramLengths {
    pub short: u32,
    pub long: u32,
}

impl Default for TelegramLengths {
    fn default() -> Self {
        TelegramLengths {
            short: 15,
            long: 100,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TelegramLengthPreset {
    Short,
    #[default]
    Long,
}

/// Hands out telegrams of the currently selected length, cycling through
/// [`Tag::PALETTE`].
#[derive(Debug, Clone)]
pub struct TelegramBuilder {
    lengths: TelegramLengths,
    preset: TelegramLengthPreset,
    next_tag: usize,
}

impl TelegramBuilder {
    #[must_use]
    pub const fn new(lengths: TelegramLengths, preset: TelegramLengthPreset) -> TelegramBuilder {
        TelegramBuilder {
            lengths,
            preset,
            next_tag: 0,
        }
    }

    pub fn use_preset(&mut self, preset: TelegramLengthPreset) {
        self.preset = preset;
    }

    #[must_use]
    pub const fn preset(&self) -> TelegramLengthPreset {
        self.preset
    }

    #[must_use]
    pub const fn length(&self) -> u32 {
        match self.preset {
            TelegramLengthPreset::Short => self.lengths.short,
            TelegramLengthPreset::Long => self.lengths.long,
        }
    }

    pub fn create(&mut self, to: StationId) -> Telegram {
        self.create_with_length(to, self.length())
    }

    pub fn create_with_length(&mut self, to: StationId, length: u32) -> Telegram {
        let tag = Tag::PALETTE[self.next_tag];
        self.next_tag = (self.next_tag + 1) % Tag::PALETTE.len();
        Telegram::new(to, length, tag)
    }
}
