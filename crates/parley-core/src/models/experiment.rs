//! Experiments - server-assigned feature rollouts
//!
//! The platform sends experiments as positional arrays keyed by a 32-bit
//! murmur3 hash of the experiment name. Names are not sent, so callers that
//! know a name match it with [`experiment_hash`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::value_objects::Snowflake;

/// 32-bit murmur3 (x86) hash
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut hash = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        hash ^= k;
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, byte) in tail.iter().enumerate() {
            k |= u32::from(*byte) << (8 * i);
        }
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        hash ^= k;
    }

    // Length is mixed in modulo 2^32
    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^ (hash >> 16)
}

/// Hash used to identify an experiment by name
#[inline]
pub fn experiment_hash(name: &str) -> u32 {
    murmur3_32(name.as_bytes(), 0)
}

/// Rollout position (0..10000) of a guild in an experiment
pub fn rollout_position(key: &str, guild_id: Snowflake) -> u32 {
    murmur3_32(format!("{key}:{guild_id}").as_bytes(), 0) % 10_000
}

fn field<T: serde::de::DeserializeOwned>(array: &[Value], index: usize) -> Option<T> {
    array
        .get(index)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

/// Experiment assignment for the current user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserExperiment {
    pub hash: u32,
    pub revision: u32,
    /// -1 means not eligible
    pub bucket: i32,
    pub is_override: bool,
    pub population: i32,
    pub hash_result: Option<u32>,
    pub aa_mode: bool,
    /// Filled in when the caller knows the name
    pub name: Option<String>,
}

impl UserExperiment {
    /// Whether the user is in a treatment bucket
    #[inline]
    pub fn is_treatment(&self) -> bool {
        self.bucket > 0
    }

    /// Attach `name` if it hashes to this experiment
    pub fn try_name(&mut self, name: &str) -> bool {
        if experiment_hash(name) == self.hash {
            self.name = Some(name.to_string());
            true
        } else {
            false
        }
    }
}

impl<'de> Deserialize<'de> for UserExperiment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let array = Vec::<Value>::deserialize(deserializer)?;
        let hash = field(&array, 0).ok_or_else(|| D::Error::custom("experiment hash missing"))?;
        Ok(Self {
            hash,
            revision: field(&array, 1).unwrap_or(0),
            bucket: field(&array, 2).unwrap_or(-1),
            is_override: field::<i64>(&array, 3).is_some_and(|v| v != 0),
            population: field(&array, 4).unwrap_or(0),
            hash_result: field(&array, 5),
            aa_mode: field::<i64>(&array, 6).is_some_and(|v| v != 0),
            name: None,
        })
    }
}

/// Half-open rollout range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutRange {
    #[serde(rename = "s")]
    pub start: u32,
    #[serde(rename = "e")]
    pub end: u32,
}

impl RolloutRange {
    #[inline]
    pub fn contains(&self, position: u32) -> bool {
        (self.start..self.end).contains(&position)
    }
}

/// A bucket and the ranges assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rollout {
    pub bucket: i32,
    pub ranges: Vec<RolloutRange>,
}

/// One population: rollouts plus eligibility filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Population {
    pub rollouts: Vec<Rollout>,
    /// Raw filter tuples; not evaluated
    pub filters: Vec<Value>,
}

impl<'de> Deserialize<'de> for Population {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (rollouts, filters) = <(Vec<(i32, Vec<RolloutRange>)>, Vec<Value>)>::deserialize(deserializer)?;
        Ok(Self {
            rollouts: rollouts
                .into_iter()
                .map(|(bucket, ranges)| Rollout { bucket, ranges })
                .collect(),
            filters,
        })
    }
}

/// Explicit bucket assignment for specific guilds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentOverride {
    #[serde(rename = "b")]
    pub bucket: i32,
    #[serde(rename = "k", default)]
    pub ids: Vec<Snowflake>,
}

/// Guild experiment rollout definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildExperiment {
    pub hash: u32,
    pub hash_key: Option<String>,
    pub revision: u32,
    pub populations: Vec<Population>,
    pub overrides: Vec<ExperimentOverride>,
    pub aa_mode: bool,
    pub name: Option<String>,
}

impl GuildExperiment {
    pub fn try_name(&mut self, name: &str) -> bool {
        if experiment_hash(name) == self.hash {
            self.name = Some(name.to_string());
            true
        } else {
            false
        }
    }

    /// Bucket assigned to a guild, if it is in the rollout
    ///
    /// Overrides win. Otherwise the guild's rollout position is matched
    /// against every population in order. Needs the name or hash key.
    pub fn bucket_for(&self, guild_id: Snowflake) -> Option<i32> {
        if let Some(ov) = self.overrides.iter().find(|o| o.ids.contains(&guild_id)) {
            return Some(ov.bucket);
        }
        let key = self.hash_key.as_deref().or(self.name.as_deref())?;
        let position = rollout_position(key, guild_id);
        self.populations.iter().find_map(|population| {
            population
                .rollouts
                .iter()
                .find(|rollout| rollout.ranges.iter().any(|r| r.contains(position)))
                .map(|rollout| rollout.bucket)
        })
    }
}

impl<'de> Deserialize<'de> for GuildExperiment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let array = Vec::<Value>::deserialize(deserializer)?;
        let hash = field(&array, 0).ok_or_else(|| D::Error::custom("experiment hash missing"))?;
        Ok(Self {
            hash,
            hash_key: field(&array, 1),
            revision: field(&array, 2).unwrap_or(0),
            populations: field(&array, 3).unwrap_or_default(),
            overrides: field(&array, 4).unwrap_or_default(),
            aa_mode: field::<i64>(&array, 8).is_some_and(|v| v != 0),
            name: None,
        })
    }
}

/// Response of the experiments endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentsResponse {
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub assignments: Vec<UserExperiment>,
    #[serde(default)]
    pub guild_experiments: Vec<GuildExperiment>,
}
