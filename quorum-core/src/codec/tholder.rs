use std::cmp::Ordering;
use std::collections::HashSet;

use rst_common::standard::serde_json::Value;

use super::types::CodecError;

/// Exact non negative rational weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weight {
    num: u64,
    den: u64,
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl Weight {
    pub fn new(num: u64, den: u64) -> Result<Self, CodecError> {
        if den == 0 {
            return Err(CodecError::InvalidThreshold(
                "zero denominator".to_string(),
            ));
        }

        let divisor = gcd(num, den).max(1);
        Ok(Self {
            num: num / divisor,
            den: den / divisor,
        })
    }

    pub fn zero() -> Self {
        Self { num: 0, den: 1 }
    }

    pub fn one() -> Self {
        Self { num: 1, den: 1 }
    }

    pub fn add(&self, other: &Weight) -> Result<Weight, CodecError> {
        let overflow = || CodecError::InvalidThreshold("weight overflow".to_string());

        let den = self.den.checked_mul(other.den).ok_or_else(overflow)?;
        let left = self.num.checked_mul(other.den).ok_or_else(overflow)?;
        let right = other.num.checked_mul(self.den).ok_or_else(overflow)?;
        Weight::new(left.checked_add(right).ok_or_else(overflow)?, den)
    }

    /// Parse `"1/2"`, `"1"` or `"0"`
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let parse_part = |part: &str| -> Result<u64, CodecError> {
            part.trim()
                .parse::<u64>()
                .map_err(|_| CodecError::InvalidThreshold(format!("invalid weight: {text}")))
        };

        match text.split_once('/') {
            Some((num, den)) => Weight::new(parse_part(num)?, parse_part(den)?),
            None => Weight::new(parse_part(text)?, 1),
        }
    }
}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = self.num as u128 * other.den as u128;
        let right = other.num as u128 * self.den as u128;
        left.cmp(&right)
    }
}

/// `Tholder` is a signing threshold over an ordered list of keys
///
/// A simple threshold is a minimum number of distinct signatures. A weighted
/// threshold assigns a fractional weight to each key position, grouped into
/// one or more clauses. Every clause must reach a weight of at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct Tholder {
    sith: Value,
    thold: Thold,
}

#[derive(Debug, Clone, PartialEq)]
enum Thold {
    Simple(u64),
    Weighted(Vec<Vec<Weight>>),
}

impl Tholder {
    pub fn new(sith: &Value) -> Result<Self, CodecError> {
        let thold = match sith {
            Value::Number(num) => Thold::Simple(
                num.as_u64()
                    .ok_or(CodecError::InvalidThreshold(format!("invalid threshold: {num}")))?,
            ),
            Value::String(text) => Thold::Simple(
                u64::from_str_radix(text, 16)
                    .map_err(|_| CodecError::InvalidThreshold(format!("invalid threshold: {text}")))?,
            ),
            Value::Array(items) if items.is_empty() => {
                return Err(CodecError::InvalidThreshold(
                    "empty weighted threshold".to_string(),
                ))
            }
            Value::Array(items) if items.iter().all(|item| item.is_string()) => {
                Thold::Weighted(vec![Self::parse_clause(items)?])
            }
            Value::Array(items) => {
                let mut clauses = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(clause) if !clause.is_empty() => {
                            clauses.push(Self::parse_clause(clause)?)
                        }
                        _ => {
                            return Err(CodecError::InvalidThreshold(format!(
                                "invalid weighted clause: {item}"
                            )))
                        }
                    }
                }

                Thold::Weighted(clauses)
            }
            other => {
                return Err(CodecError::InvalidThreshold(format!(
                    "unsupported threshold: {other}"
                )))
            }
        };

        Ok(Self {
            sith: sith.clone(),
            thold,
        })
    }

    fn parse_clause(items: &[Value]) -> Result<Vec<Weight>, CodecError> {
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or(CodecError::InvalidThreshold(format!("invalid weight: {item}")))
                    .and_then(Weight::parse)
            })
            .collect()
    }

    pub fn weighted(&self) -> bool {
        matches!(self.thold, Thold::Weighted(_))
    }

    /// Required number of signatures of a simple threshold
    pub fn num(&self) -> Option<u64> {
        match self.thold {
            Thold::Simple(num) => Some(num),
            Thold::Weighted(_) => None,
        }
    }

    pub fn sith(&self) -> &Value {
        &self.sith
    }

    /// Number of key positions covered by a weighted threshold, or the count
    /// of a simple one
    pub fn size(&self) -> usize {
        match &self.thold {
            Thold::Simple(num) => *num as usize,
            Thold::Weighted(clauses) => clauses.iter().map(|clause| clause.len()).sum(),
        }
    }

    /// Weight text per key position, aligned with the signing member list
    pub fn weights(&self) -> Vec<String> {
        match &self.sith {
            Value::Array(items) => items
                .iter()
                .flat_map(|item| match item {
                    Value::Array(clause) => clause.clone(),
                    other => vec![other.clone()],
                })
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Check whether signatures from the key positions in `indices` satisfy the threshold
    ///
    /// Duplicate indices are counted once.
    pub fn satisfy(&self, indices: &[u32]) -> bool {
        let distinct: HashSet<u32> = indices.iter().copied().collect();

        match &self.thold {
            Thold::Simple(num) => *num > 0 && distinct.len() as u64 >= *num,
            Thold::Weighted(clauses) => {
                let mut offset = 0u32;
                for clause in clauses {
                    let mut sum = Weight::zero();
                    for (pos, weight) in clause.iter().enumerate() {
                        if distinct.contains(&(offset + pos as u32)) {
                            sum = match sum.add(weight) {
                                Ok(val) => val,
                                Err(_) => return false,
                            };
                        }
                    }

                    if sum < Weight::one() {
                        return false;
                    }

                    offset += clause.len() as u32;
                }

                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;
    use table_test::table_test;

    #[test]
    fn test_simple_threshold() {
        let tholder = Tholder::new(&json!("2")).unwrap();
        assert!(!tholder.weighted());
        assert_eq!(tholder.num(), Some(2));
        assert!(!tholder.satisfy(&[0]));
        assert!(!tholder.satisfy(&[1, 1]));
        assert!(tholder.satisfy(&[0, 2]));
        assert!(tholder.satisfy(&[0, 1, 2]));
    }

    #[test]
    fn test_simple_threshold_from_hex() {
        let tholder = Tholder::new(&json!("a")).unwrap();
        assert_eq!(tholder.num(), Some(10));
    }

    #[test]
    fn test_weighted_threshold_all_required() {
        let tholder = Tholder::new(&json!(["1/3", "1/3", "1/3"])).unwrap();
        assert!(tholder.weighted());
        assert_eq!(tholder.num(), None);
        assert_eq!(tholder.weights(), vec!["1/3", "1/3", "1/3"]);

        let table = vec![
            (vec![0u32, 1], false),
            (vec![0, 2], false),
            (vec![1, 2], false),
            (vec![0, 1, 2], true),
            (vec![0, 0, 1, 1], false),
        ];

        for (validator, input, expected) in table_test!(table) {
            validator
                .given(&format!("{:?}", input))
                .when("satisfy")
                .then("weights summed exactly")
                .assert_eq(expected, tholder.satisfy(&input));
        }
    }

    #[test]
    fn test_weighted_threshold_multi_clause() {
        let tholder = Tholder::new(&json!([["1/2", "1/2", "1/2"], ["1", "1"]])).unwrap();
        assert_eq!(tholder.size(), 5);
        assert_eq!(tholder.weights(), vec!["1/2", "1/2", "1/2", "1", "1"]);

        assert!(!tholder.satisfy(&[0, 1]));
        assert!(!tholder.satisfy(&[3]));
        assert!(tholder.satisfy(&[0, 2, 4]));
        assert!(tholder.satisfy(&[1, 2, 3]));
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(Tholder::new(&json!("zz")).is_err());
        assert!(Tholder::new(&json!(["1/0"])).is_err());
        assert!(Tholder::new(&json!([])).is_err());
        assert!(Tholder::new(&json!({"k": 1})).is_err());
    }

    #[test]
    fn test_weight_ordering() {
        let half = Weight::parse("1/2").unwrap();
        let sum = half.add(&half).unwrap();
        assert_eq!(sum, Weight::one());
        assert!(Weight::parse("2/3").unwrap() > half);
    }
}
