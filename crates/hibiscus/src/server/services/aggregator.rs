//! Score aggregation across attribute lookups
//!
//! Folds per-attribute matches into one entry per species title, then ranks
//! titles by total score. Both sorts are stable, so equal totals keep the
//! order in which titles were first seen (attributes are visited in
//! canonical order) and equal detail scores keep attribute order.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::{BTreeMap, HashMap};

use crate::attributes::Attribute;
use crate::server::services::classifier::PartialMatchResult;

/// Accumulated evidence for one species
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesScore {
  pub total_score: f32,
  /// Per-attribute score, highest first
  pub details: Vec<(Attribute, f32)>,
}

impl SpeciesScore {
  fn new() -> Self {
    Self { total_score: 0.0, details: Vec::new() }
  }

  fn record(&mut self, attribute: Attribute, score: f32) {
    match self.details.iter_mut().find(|(existing, _)| *existing == attribute) {
      Some(entry) => {
        self.total_score -= entry.1;
        entry.1 = score;
      }
      None => self.details.push((attribute, score)),
    }
    self.total_score += score;
  }
}

/// Species ranked by descending total score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedSpeciesResult {
  species: Vec<(String, SpeciesScore)>,
}

impl RankedSpeciesResult {
  pub fn is_empty(&self) -> bool {
    self.species.is_empty()
  }

  pub fn len(&self) -> usize {
    self.species.len()
  }

  pub fn get(&self, title: &str) -> Option<&SpeciesScore> {
    self.species.iter().find(|(t, _)| t == title).map(|(_, score)| score)
  }

  pub fn titles(&self) -> impl Iterator<Item = &str> {
    self.species.iter().map(|(title, _)| title.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &SpeciesScore)> {
    self.species.iter().map(|(title, score)| (title.as_str(), score))
  }
}

/// Merge partial results into a ranked, explained species list
pub fn aggregate(partials: &BTreeMap<Attribute, PartialMatchResult>) -> RankedSpeciesResult {
  let mut positions: HashMap<&str, usize> = HashMap::new();
  let mut species: Vec<(String, SpeciesScore)> = Vec::new();

  for (attribute, partial) in partials {
    for m in &partial.matches {
      let position = *positions.entry(m.title.as_str()).or_insert_with(|| {
        species.push((m.title.clone(), SpeciesScore::new()));
        species.len() - 1
      });
      species[position].1.record(*attribute, m.score);
    }
  }

  for (_, score) in &mut species {
    score.details.sort_by(|a, b| b.1.total_cmp(&a.1));
  }
  species.sort_by(|a, b| b.1.total_score.total_cmp(&a.1.total_score));

  RankedSpeciesResult { species }
}

struct Details<'a>(&'a [(Attribute, f32)]);

impl Serialize for Details<'_> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(self.0.iter().map(|(attribute, score)| (attribute.column(), score)))
  }
}

impl Serialize for SpeciesScore {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut state = serializer.serialize_struct("SpeciesScore", 2)?;
    state.serialize_field("totalScore", &self.total_score)?;
    state.serialize_field("details", &Details(&self.details))?;
    state.end()
  }
}

impl Serialize for RankedSpeciesResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(self.species.iter().map(|(title, score)| (title, score)))
  }
}
