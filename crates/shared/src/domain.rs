use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(PerfumeId);

pub const NAME_MAX_CHARS: usize = 100;
pub const BRAND_MAX_CHARS: usize = 100;
pub const TYPE_MAX_CHARS: usize = 50;
pub const GENDER_MAX_CHARS: usize = 20;

/// Prices are stored as NUMERIC(10,2): two fractional digits, eight integral.
pub const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perfume {
    pub id: PerfumeId,
    pub name: String,
    pub brand: String,
    pub kind: Option<String>,
    pub gender: Option<String>,
    pub volume_ml: Option<i32>,
    pub price: Decimal,
}

/// Every column of a perfume except its id. Inserts and updates both assign
/// the full set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerfume {
    pub name: String,
    pub brand: String,
    pub kind: Option<String>,
    pub gender: Option<String>,
    pub volume_ml: Option<i32>,
    pub price: Decimal,
}

/// Raw urlencoded form body as submitted by the create and update pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfumeForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub volume_ml: String,
    #[serde(default)]
    pub price: String,
}

/// JSON view of a perfume. The price is a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfumeSummary {
    pub id: PerfumeId,
    pub name: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub gender: Option<String>,
    pub volume_ml: Option<i32>,
    pub price: f64,
}

impl PerfumeForm {
    pub fn into_new_perfume(self) -> Result<NewPerfume, FieldError> {
        Ok(NewPerfume {
            name: required(&self.name, "name", NAME_MAX_CHARS)?,
            brand: required(&self.brand, "brand", BRAND_MAX_CHARS)?,
            kind: optional(&self.kind, "type", TYPE_MAX_CHARS)?,
            gender: optional(&self.gender, "gender", GENDER_MAX_CHARS)?,
            volume_ml: parse_volume(&self.volume_ml)?,
            price: parse_price(&self.price)?,
        })
    }
}

impl Perfume {
    pub fn from_parts(id: PerfumeId, fields: NewPerfume) -> Self {
        Self {
            id,
            name: fields.name,
            brand: fields.brand,
            kind: fields.kind,
            gender: fields.gender,
            volume_ml: fields.volume_ml,
            price: fields.price,
        }
    }

    pub fn to_form(&self) -> PerfumeForm {
        PerfumeForm {
            name: self.name.clone(),
            brand: self.brand.clone(),
            kind: self.kind.clone().unwrap_or_default(),
            gender: self.gender.clone().unwrap_or_default(),
            volume_ml: self
                .volume_ml
                .map(|volume| volume.to_string())
                .unwrap_or_default(),
            price: self.price.to_string(),
        }
    }

    pub fn summary(&self) -> PerfumeSummary {
        PerfumeSummary {
            id: self.id,
            name: self.name.clone(),
            brand: self.brand.clone(),
            kind: self.kind.clone(),
            gender: self.gender.clone(),
            volume_ml: self.volume_ml,
            price: self.price.to_f64().unwrap_or_default(),
        }
    }
}

fn required(raw: &str, field: &'static str, max: usize) -> Result<String, FieldError> {
    optional(raw, field, max)?.ok_or(FieldError::Missing { field })
}

fn optional(raw: &str, field: &'static str, max: usize) -> Result<Option<String>, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max {
        return Err(FieldError::TooLong { field, max });
    }
    Ok(Some(value.to_string()))
}

fn parse_volume(raw: &str) -> Result<Option<i32>, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.parse::<i32>() {
        Ok(volume) if volume >= 0 => Ok(Some(volume)),
        _ => Err(FieldError::InvalidVolume),
    }
}

/// Parses a submitted price into the stored NUMERIC(10,2) shape.
pub fn parse_price(raw: &str) -> Result<Decimal, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::Missing { field: "price" });
    }
    let parsed = Decimal::from_str(value).map_err(|_| overflow_or_invalid(value))?;

    let mut price =
        parsed.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if price.is_sign_negative() && !price.is_zero() {
        return Err(FieldError::NegativePrice);
    }
    if price >= Decimal::from(PRICE_LIMIT) {
        return Err(FieldError::PriceOutOfRange);
    }
    if price.is_zero() {
        price = Decimal::ZERO;
    }
    price.rescale(PRICE_SCALE);
    Ok(price)
}

/// A plain decimal literal that `Decimal` cannot hold is out of range, not
/// malformed.
fn overflow_or_invalid(value: &str) -> FieldError {
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let numeric = !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit());
    match (numeric, negative) {
        (false, _) => FieldError::InvalidPrice,
        (true, true) => FieldError::NegativePrice,
        (true, false) => FieldError::PriceOutOfRange,
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
