//! The closed vocabulary of morphological attributes
//!
//! Every attribute is stored in the index under its Korean column name and
//! queried through an English snake_case parameter. Categorical attributes
//! carry a fixed label table whose 1-based positions are the numeric codes
//! used by the source spreadsheets; range attributes carry numeric bounds
//! where any negative value means "not recorded".

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{HibiscusError, Result};

/// Label meaning "the observer could not tell"
pub const UNKNOWN_LABEL: &str = "모름";

const PRESENCE: &[&str] = &["있음", "없음", UNKNOWN_LABEL];
const SHAPE: &[&str] = &["단엽", "복엽"];
const LEAF_TIP: &[&str] = &["점첨두", "예두", "급첨두", "둔두", "원두", "요두", "평두", "미두", UNKNOWN_LABEL];
const LEAF_BLADE: &[&str] = &[
  "침형", "선형", "피침형", "도피침형", "심장형", "신장형", "원형", "타원형", "난형", "도란형", "삼각형",
  "민들레형", "주걱형", "능형", UNKNOWN_LABEL,
];
const LEAF_BASE: &[&str] = &[
  "유저", "설저", "둔저", "왜저", "예저", "순저", "심장저", "원저", "관천저", "평저", "극저", UNKNOWN_LABEL,
];
const LEAF_ARRANGEMENT: &[&str] = &["어긋나기", "마주나기", "돌려나기", "모여나기", UNKNOWN_LABEL];

/// One of the twelve recognized leaf traits, in canonical order
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
  Serration,
  Shape,
  LeafletCount,
  LeafLength,
  LeafTip,
  LeafWidth,
  LeafUndersideHair,
  LeafBlade,
  LeafBase,
  LeafTopsideHair,
  LeafArrangement,
  Tooth,
}

/// How an attribute's values are represented
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeKind {
  /// Closed label set; code N is the N-th label
  Categorical(&'static [&'static str]),
  /// Bounded interval; negative values encode "unknown"
  Range { min: f64, max: f64 },
}

impl Attribute {
  pub const ALL: [Attribute; 12] = [
    Attribute::Serration,
    Attribute::Shape,
    Attribute::LeafletCount,
    Attribute::LeafLength,
    Attribute::LeafTip,
    Attribute::LeafWidth,
    Attribute::LeafUndersideHair,
    Attribute::LeafBlade,
    Attribute::LeafBase,
    Attribute::LeafTopsideHair,
    Attribute::LeafArrangement,
    Attribute::Tooth,
  ];

  /// Query-string parameter name
  pub fn param(self) -> &'static str {
    match self {
      Attribute::Serration => "serration",
      Attribute::Shape => "shape",
      Attribute::LeafletCount => "leaflet_count",
      Attribute::LeafLength => "leaf_length",
      Attribute::LeafTip => "leaf_tip",
      Attribute::LeafWidth => "leaf_width",
      Attribute::LeafUndersideHair => "leaf_underside_hair",
      Attribute::LeafBlade => "leaf_blade",
      Attribute::LeafBase => "leaf_base",
      Attribute::LeafTopsideHair => "leaf_topside_hair",
      Attribute::LeafArrangement => "leaf_arrangement",
      Attribute::Tooth => "tooth",
    }
  }

  /// Column tag stored in index metadata; also the natural-language name
  pub fn column(self) -> &'static str {
    match self {
      Attribute::Serration => "결각",
      Attribute::Shape => "생김새",
      Attribute::LeafletCount => "소엽갯수",
      Attribute::LeafLength => "잎길이",
      Attribute::LeafTip => "잎끝",
      Attribute::LeafWidth => "잎너비",
      Attribute::LeafUndersideHair => "잎뒷면털",
      Attribute::LeafBlade => "잎날",
      Attribute::LeafBase => "잎밑부분",
      Attribute::LeafTopsideHair => "잎앞면털",
      Attribute::LeafArrangement => "잎차례",
      Attribute::Tooth => "톱니",
    }
  }

  /// PascalCase suffix of the spreadsheet upload route
  pub fn route_suffix(self) -> &'static str {
    match self {
      Attribute::Serration => "Serration",
      Attribute::Shape => "Shape",
      Attribute::LeafletCount => "LeafletCount",
      Attribute::LeafLength => "LeafLength",
      Attribute::LeafTip => "LeafTip",
      Attribute::LeafWidth => "LeafWidth",
      Attribute::LeafUndersideHair => "LeafUndersideHair",
      Attribute::LeafBlade => "LeafBlade",
      Attribute::LeafBase => "LeafBase",
      Attribute::LeafTopsideHair => "LeafTopsideHair",
      Attribute::LeafArrangement => "LeafArrangement",
      Attribute::Tooth => "Tooth",
    }
  }

  pub fn kind(self) -> AttributeKind {
    match self {
      Attribute::Serration
      | Attribute::LeafUndersideHair
      | Attribute::LeafTopsideHair
      | Attribute::Tooth => AttributeKind::Categorical(PRESENCE),
      Attribute::Shape => AttributeKind::Categorical(SHAPE),
      Attribute::LeafTip => AttributeKind::Categorical(LEAF_TIP),
      Attribute::LeafBlade => AttributeKind::Categorical(LEAF_BLADE),
      Attribute::LeafBase => AttributeKind::Categorical(LEAF_BASE),
      Attribute::LeafArrangement => AttributeKind::Categorical(LEAF_ARRANGEMENT),
      Attribute::LeafletCount => AttributeKind::Range { min: -1.0, max: 25.0 },
      Attribute::LeafLength => AttributeKind::Range { min: -1.0, max: 50.0 },
      Attribute::LeafWidth => AttributeKind::Range { min: -1.0, max: 30.0 },
    }
  }

  pub fn is_range(self) -> bool {
    matches!(self.kind(), AttributeKind::Range { .. })
  }

  pub fn from_column(column: &str) -> Option<Attribute> {
    Self::ALL.into_iter().find(|attribute| attribute.column() == column.trim())
  }

  pub fn from_param(param: &str) -> Option<Attribute> {
    Self::ALL.into_iter().find(|attribute| attribute.param() == param.trim())
  }

  /// Map a spreadsheet code ("1", "2", ...) to its canonical label
  pub fn label_for_code(self, code: &str) -> Result<&'static str> {
    let AttributeKind::Categorical(labels) = self.kind() else {
      return Err(HibiscusError::validation(self.column(), "range attributes have no code table"));
    };

    code
      .trim()
      .parse::<usize>()
      .ok()
      .and_then(|n| n.checked_sub(1))
      .and_then(|index| labels.get(index).copied())
      .ok_or_else(|| {
        HibiscusError::validation(
          self.column(),
          format!("code '{}' is not defined (expected 1-{})", code.trim(), labels.len()),
        )
      })
  }

  /// Parse a raw query value into a typed attribute value
  pub fn parse_value(self, raw: &str) -> Result<AttributeValue> {
    let raw = raw.trim();
    match self.kind() {
      AttributeKind::Categorical(labels) => {
        if raw == UNKNOWN_LABEL {
          return Ok(AttributeValue::Unknown);
        }
        match labels.iter().find(|label| **label == raw) {
          Some(label) => Ok(AttributeValue::Categorical(label.to_string())),
          None => Err(HibiscusError::validation(
            self.param(),
            format!("'{raw}' is not one of {}", labels.join(", ")),
          )),
        }
      }
      AttributeKind::Range { min, max } => {
        let value: f64 = raw
          .parse()
          .map_err(|_| {
            HibiscusError::validation(self.param(), format!("'{raw}' is not a number"))
          })?;
        if !value.is_finite() || value < min || value > max {
          return Err(HibiscusError::validation(
            self.param(),
            format!("{value} is outside {min} ~ {max}"),
          ));
        }
        if value < 0.0 {
          Ok(AttributeValue::Unknown)
        } else {
          Ok(AttributeValue::Numeric(value))
        }
      }
    }
  }

  /// Value used when the caller omits this attribute
  fn default_value(self) -> AttributeValue {
    match self {
      Attribute::Shape => AttributeValue::Categorical(SHAPE[0].to_string()),
      _ => AttributeValue::Unknown,
    }
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.column())
  }
}

/// One trait measurement
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
  Categorical(String),
  Numeric(f64),
  Unknown,
}

impl AttributeValue {
  pub fn is_unknown(&self) -> bool {
    matches!(self, AttributeValue::Unknown)
  }
}

impl fmt::Display for AttributeValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AttributeValue::Categorical(label) => f.write_str(label),
      AttributeValue::Numeric(value) => write!(f, "{value}"),
      AttributeValue::Unknown => f.write_str(UNKNOWN_LABEL),
    }
  }
}

/// A full classification query: exactly one value per attribute
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeQuery {
  values: BTreeMap<Attribute, AttributeValue>,
}

impl AttributeQuery {
  /// Every attribute unknown
  pub fn all_unknown() -> Self {
    Self { values: Attribute::ALL.into_iter().map(|a| (a, AttributeValue::Unknown)).collect() }
  }

  /// Replace one attribute's value
  pub fn with(mut self, attribute: Attribute, value: AttributeValue) -> Self {
    self.values.insert(attribute, value);
    self
  }

  /// Build from query-string parameters, applying the surface defaults
  ///
  /// Unrecognized parameter names are ignored.
  pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
    let mut values = BTreeMap::new();
    for attribute in Attribute::ALL {
      let value = match params.get(attribute.param()) {
        Some(raw) if !raw.trim().is_empty() => attribute.parse_value(raw)?,
        _ => attribute.default_value(),
      };
      values.insert(attribute, value);
    }
    Ok(Self { values })
  }

  pub fn get(&self, attribute: Attribute) -> &AttributeValue {
    self.values.get(&attribute).unwrap_or(&AttributeValue::Unknown)
  }

  /// Attributes with a known value, in canonical order
  pub fn known(&self) -> impl Iterator<Item = (Attribute, &AttributeValue)> {
    self.values.iter().filter(|(_, value)| !value.is_unknown()).map(|(a, v)| (*a, v))
  }
}
