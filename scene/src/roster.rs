//! Token hydration from roster data: party members, encounter monsters,
//! dropped statblocks and loosely-typed character records.

#[cfg(test)]
#[path = "roster_test.rs"]
mod roster_test;

use serde::{Deserialize, Serialize};

use crate::camera::GridCell;
use crate::doc::{CreatureSize, Token, new_id};

/// What a token stands for; drives its default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Player,
    Sidekick,
    Companion,
    Npc,
    Monster,
}

impl TokenKind {
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Player => "#3B5998",
            Self::Sidekick | Self::Companion => "#2E5D4B",
            Self::Npc => "#6B4C9A",
            Self::Monster => "#C84B31",
        }
    }
}

/// Loosely-typed token source. Every field is optional; [`TokenSeed::hydrate`]
/// fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSeed {
    pub id: Option<String>,
    pub instance_id: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
    pub size: Option<f64>,
    pub hp: Option<i32>,
    pub max_hp: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<TokenKind>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub combatant_id: Option<String>,
}

impl TokenSeed {
    /// A seed carrying only a name and slug, as produced by dragging a
    /// statblock onto the map.
    #[must_use]
    pub fn named(name: impl Into<String>, slug: Option<String>) -> Self {
        Self { name: Some(name.into()), slug, ..Self::default() }
    }

    /// Build a normalized token.
    #[must_use]
    pub fn hydrate(self) -> Token {
        let id = self.id.unwrap_or_else(new_id);
        Token {
            instance_id: self.instance_id.unwrap_or_else(|| id.clone()),
            id,
            name: self.name.unwrap_or_else(|| "Unknown".to_owned()),
            color: self
                .color
                .unwrap_or_else(|| self.kind.unwrap_or(TokenKind::Monster).color().to_owned()),
            size: self.size.unwrap_or(1.0),
            x: self.x.unwrap_or(0),
            y: self.y.unwrap_or(0),
            slug: self.slug,
            hp: self.hp,
            max_hp: self.max_hp,
            combatant_id: self.combatant_id,
        }
        .normalized()
    }
}

/// Subset of a monster record the scene cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterRecord {
    pub slug: String,
    pub name: String,
    /// Size category name, e.g. `"Large"`.
    pub size: String,
    pub hit_points: Option<i32>,
}

impl MonsterRecord {
    #[must_use]
    pub fn grid_size(&self) -> f64 {
        CreatureSize::multiplier_for(&self.size)
    }
}

/// Party member as provided by the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMember {
    pub id: String,
    pub name: String,
}

/// One line of an encounter: `qty` copies of a monster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterMonster {
    pub slug: String,
    pub name: String,
    #[serde(default = "default_qty")]
    pub qty: u32,
}

fn default_qty() -> u32 {
    1
}

impl EncounterMonster {
    /// Token names for every copy; numbered from 1 when there is more than one.
    #[must_use]
    pub fn token_names(&self) -> Vec<String> {
        match self.qty {
            0 => return Vec::new(),
            1 => return vec![self.name.clone()],
            _ => {}
        }
        (1..=self.qty).map(|i| format!("{} {i}", self.name)).collect()
    }
}

/// Token for a statblock dropped on `cell`. Size and HP come from the monster
/// record when one was found; the color is derived from the name.
#[must_use]
pub fn drop_token(seed: TokenSeed, monster: Option<&MonsterRecord>, cell: GridCell) -> Token {
    let name = seed.name.clone().unwrap_or_else(|| "Unknown".to_owned());
    let hit_points = monster.and_then(|m| m.hit_points);
    TokenSeed {
        color: Some(name_hash_color(&name)),
        size: Some(monster.map_or(1.0, MonsterRecord::grid_size)),
        hp: hit_points,
        max_hp: hit_points,
        x: Some(cell.col),
        y: Some(cell.row),
        name: Some(name),
        ..seed
    }
    .hydrate()
}

/// Deterministic `hsl()` color from a name.
///
/// Uses the classic `hash = c + (hash << 5) - hash` string hash over UTF-16
/// code units with 32-bit shifts, so the hue matches colors stored by earlier
/// sessions.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn name_hash_color(name: &str) -> String {
    let mut hash: i64 = 0;
    for unit in name.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5);
        hash = i64::from(unit) + i64::from(shifted) - hash;
    }
    let hue = (hash % 360).abs();
    format!("hsl({hue}, 70%, 45%)")
}
