//! Heuristic scoring unit.
//!
//! A heuristic's score is derived either from the signatures that fired
//! (each weighted by a per-signature score and its hit count) or, when no
//! signature was named, from the catalog default times a raw frequency. The
//! per-signature score is resolved in three tiers: the catalog's own
//! signature score map, then scores submitted by the caller, then the
//! catalog default. The result is clamped to the catalog's `max_score`.

use crate::core::{ResultContext, ResultError};
use crate::heuristics::attack::{AttackIdentifierResolver, AttackResolution};
use crate::heuristics::catalog::{HeuristicDefinition, HeuristicId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Optional construction arguments for [`Heuristic::with_options`].
#[derive(Debug, Clone)]
pub struct HeuristicOptions {
    pub attack_id: Option<String>,
    pub signature: Option<String>,
    pub attack_ids: Vec<String>,
    pub signatures: BTreeMap<String, i64>,
    pub frequency: i64,
    pub score_map: BTreeMap<String, i64>,
}

impl Default for HeuristicOptions {
    fn default() -> Self {
        Self {
            attack_id: None,
            signature: None,
            attack_ids: Vec::new(),
            signatures: BTreeMap::new(),
            frequency: 1,
            score_map: BTreeMap::new(),
        }
    }
}

impl HeuristicOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attack_id(mut self, attack_id: impl Into<String>) -> Self {
        self.attack_id = Some(attack_id.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_attack_ids<I, S>(mut self, attack_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attack_ids.extend(attack_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_signatures(mut self, signatures: BTreeMap<String, i64>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_frequency(mut self, frequency: i64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_score_map(mut self, score_map: BTreeMap<String, i64>) -> Self {
        self.score_map = score_map;
        self
    }
}

/// Scoring rule attached to at most one section.
#[derive(Clone)]
pub struct Heuristic {
    heur_id: HeuristicId,
    definition: HeuristicDefinition,
    attack_ids: Vec<String>,
    signatures: BTreeMap<String, i64>,
    frequency: i64,
    score_map: BTreeMap<String, i64>,
    resolver: Arc<dyn AttackIdentifierResolver>,
}

impl Heuristic {
    pub fn new(ctx: &ResultContext, heur_id: HeuristicId) -> Result<Self, ResultError> {
        Self::with_options(ctx, heur_id, HeuristicOptions::default())
    }

    pub fn with_options(
        ctx: &ResultContext,
        heur_id: HeuristicId,
        options: HeuristicOptions,
    ) -> Result<Self, ResultError> {
        let definition = ctx
            .catalog()
            .lookup(heur_id)
            .cloned()
            .ok_or_else(|| ResultError::unknown_heuristic(heur_id))?;

        let HeuristicOptions {
            attack_id,
            signature,
            mut attack_ids,
            signatures,
            frequency,
            score_map,
        } = options;

        if let Some(attack_id) = attack_id.filter(|id| !id.is_empty()) {
            attack_ids.push(attack_id);
        }
        if attack_ids.is_empty() {
            attack_ids.extend(definition.attack_id.iter().cloned());
        }

        let mut heuristic = Self {
            heur_id,
            definition,
            attack_ids: Vec::new(),
            signatures,
            frequency: 0,
            score_map,
            resolver: ctx.attack_resolver_handle(),
        };

        for attack_id in &attack_ids {
            heuristic.add_attack_id(attack_id);
        }

        if let Some(signature) = signature.filter(|s| !s.is_empty()) {
            let hits = heuristic.signatures.entry(signature).or_insert(0);
            *hits = hits.saturating_add(frequency);
        }

        if heuristic.signatures.is_empty() {
            heuristic.frequency = frequency;
        }

        Ok(heuristic)
    }

    pub fn heur_id(&self) -> HeuristicId {
        self.heur_id
    }

    pub fn definition(&self) -> &HeuristicDefinition {
        &self.definition
    }

    pub fn attack_ids(&self) -> &[String] {
        &self.attack_ids
    }

    pub fn signatures(&self) -> &BTreeMap<String, i64> {
        &self.signatures
    }

    pub fn frequency(&self) -> i64 {
        self.frequency
    }

    pub fn score_map(&self) -> &BTreeMap<String, i64> {
        &self.score_map
    }

    pub fn score(&self) -> i64 {
        let score = if self.signatures.is_empty() {
            self.definition.score.saturating_mul(self.frequency.max(1))
        } else {
            self.signatures
                .iter()
                .map(|(signature, frequency)| self.signature_score(signature).saturating_mul(*frequency))
                .fold(0i64, i64::saturating_add)
        };

        match self.definition.effective_max_score() {
            Some(max_score) => score.min(max_score),
            None => score,
        }
    }

    fn signature_score(&self, signature: &str) -> i64 {
        self.definition
            .signature_score_map
            .get(signature)
            .or_else(|| self.score_map.get(signature))
            .copied()
            .unwrap_or(self.definition.score)
    }

    pub fn add_attack_id(&mut self, attack_id: &str) {
        if self.attack_ids.iter().any(|id| id == attack_id) {
            return;
        }

        match self.resolver.resolve(attack_id) {
            AttackResolution::Known => self.attack_ids.push(attack_id.to_string()),
            AttackResolution::Deprecated(replacement) => {
                debug!(
                    heur_id = self.heur_id,
                    attack_id,
                    replacement = %replacement,
                    "Remapping deprecated attack_id"
                );
                if !self.attack_ids.contains(&replacement) {
                    self.attack_ids.push(replacement);
                }
            }
            AttackResolution::Unknown => {
                warn!(
                    heur_id = self.heur_id,
                    attack_id, "Invalid attack_id for heuristic. Ignoring it."
                );
            }
        }
    }

    /// Records `frequency` more hits of `signature`; a given `score` replaces
    /// any score previously submitted for it.
    pub fn add_signature_id(&mut self, signature: impl Into<String>, score: Option<i64>, frequency: i64) {
        let signature = signature.into();
        let hits = self.signatures.entry(signature.clone()).or_insert(0);
        *hits = hits.saturating_add(frequency);

        if let Some(score) = score {
            self.score_map.insert(signature, score);
        }
    }

    pub fn increment_frequency(&mut self, frequency: i64) {
        self.frequency = self.frequency.saturating_add(frequency);
    }

    pub fn snapshot(&self) -> HeuristicSnapshot {
        HeuristicSnapshot {
            heur_id: self.heur_id,
            score: self.score(),
            attack_ids: self.attack_ids.clone(),
            signatures: self.signatures.clone(),
            frequency: self.frequency,
            score_map: self.score_map.clone(),
        }
    }
}

impl fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heuristic")
            .field("heur_id", &self.heur_id)
            .field("attack_ids", &self.attack_ids)
            .field("signatures", &self.signatures)
            .field("frequency", &self.frequency)
            .field("score_map", &self.score_map)
            .field("score", &self.score())
            .finish_non_exhaustive()
    }
}

/// Immutable copy of a heuristic taken when a section is flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicSnapshot {
    pub heur_id: HeuristicId,
    pub score: i64,
    pub attack_ids: Vec<String>,
    pub signatures: BTreeMap<String, i64>,
    pub frequency: i64,
    pub score_map: BTreeMap<String, i64>,
}
