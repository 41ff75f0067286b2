// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};
use trinity_app::{Item, ItemDraft, ItemId};

const FIELDS: [&str; 8] = [
    "Economics",
    "Computer Science",
    "Management",
    "Energy",
    "Politics",
    "Engineering",
    "Physics",
    "Life",
];

const QUALITIES: [&str; 24] = [
    "Speed",
    "Cost",
    "Quality",
    "Security",
    "Privacy",
    "Convenience",
    "Scale",
    "Simplicity",
    "Flexibility",
    "Latency",
    "Throughput",
    "Durability",
    "Consistency",
    "Availability",
    "Autonomy",
    "Equality",
    "Liberty",
    "Efficiency",
    "Accuracy",
    "Coverage",
    "Stability",
    "Growth",
    "Openness",
    "Control",
];

const NOUNS: [&str; 12] = [
    "Trilemma",
    "Triangle",
    "Trinity",
    "Paradox",
    "Tradeoff",
    "Bind",
    "Triad",
    "Constraint",
    "Dilemma",
    "Balance",
    "Frontier",
    "Limit",
];

const WORDS: [&str; 24] = [
    "any",
    "two",
    "of",
    "three",
    "goals",
    "can",
    "hold",
    "while",
    "the",
    "third",
    "gives",
    "way",
    "under",
    "pressure",
    "from",
    "markets",
    "systems",
    "people",
    "design",
    "policy",
    "choice",
    "always",
    "costs",
    "something",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of catalog entries. The same seed always yields the
/// same sequence.
#[derive(Debug, Clone)]
pub struct TrinityFaker {
    rng: DeterministicRng,
}

impl TrinityFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn field(&mut self) -> &'static str {
        self.pick(&FIELDS)
    }

    pub fn draft(&mut self) -> ItemDraft {
        let field = self.field();
        self.draft_in_field(field)
    }

    pub fn draft_in_field(&mut self, field: &str) -> ItemDraft {
        let elements = self.three_distinct_qualities();
        let mut draft = ItemDraft::new(
            &format!("{} {}", elements[0], self.pick(&NOUNS)),
            field,
            elements,
        );
        draft.name_en = format!("The {} {}", field, self.pick(&NOUNS));
        if self.rng.bool() {
            draft.description = self.sentence(6, 30);
        }
        draft.element1_sacrifice_explanation = self.maybe_sentence();
        draft.element2_sacrifice_explanation = self.maybe_sentence();
        draft.element3_sacrifice_explanation = self.maybe_sentence();
        if self.rng.bool() {
            draft.hyperlink = format!(
                "https://en.wikipedia.org/wiki/{}",
                draft.name.replace(' ', "_")
            );
        }
        draft
    }

    /// A list record with the given id, created `age_minutes` before the
    /// fixture instant.
    pub fn item(&mut self, id: i64, age_minutes: i64) -> Item {
        let draft = self.draft();
        Item {
            id: ItemId::new(id),
            name: draft.name,
            field: Some(draft.field),
            element1: draft.element1,
            element2: draft.element2,
            element3: draft.element3,
            element1_sacrifice_explanation: non_empty(draft.element1_sacrifice_explanation),
            element2_sacrifice_explanation: non_empty(draft.element2_sacrifice_explanation),
            element3_sacrifice_explanation: non_empty(draft.element3_sacrifice_explanation),
            description: non_empty(draft.description),
            agree_count: self.rng.int_n(50) as u64,
            comments_count: self.rng.int_n(10) as u64,
            created_at: fixture_instant() - Duration::minutes(age_minutes),
        }
    }

    /// `count` items with consecutive ids starting at `first_id`, newest
    /// first, the way the list endpoint orders them.
    pub fn page(&mut self, first_id: i64, count: usize) -> Vec<Item> {
        (0..count as i64)
            .map(|offset| self.item(first_id + offset, first_id + offset))
            .collect()
    }

    fn three_distinct_qualities(&mut self) -> [&'static str; 3] {
        let first = self.rng.int_n(QUALITIES.len());
        let second = (first + 1 + self.rng.int_n(QUALITIES.len() - 1)) % QUALITIES.len();
        let mut third = self.rng.int_n(QUALITIES.len());
        while third == first || third == second {
            third = (third + 1) % QUALITIES.len();
        }
        [QUALITIES[first], QUALITIES[second], QUALITIES[third]]
    }

    fn maybe_sentence(&mut self) -> String {
        if self.rng.bool() {
            self.sentence(4, 12)
        } else {
            String::new()
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let count = min_words + self.rng.int_n(max_words.saturating_sub(min_words) + 1);
        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            parts.push(self.pick(&WORDS).to_owned());
        }
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

/// A string of exactly `chars` characters, mixing ASCII and multi-byte text.
pub fn text_of_len(chars: usize) -> String {
    "取舍ab".chars().cycle().take(chars).collect()
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("trinity.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn fixture_instant() -> OffsetDateTime {
    time::macros::datetime!(2026-02-19 12:34:56 UTC)
}

pub fn fields() -> &'static [&'static str] {
    &FIELDS
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
