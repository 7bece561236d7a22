//! Serde adapters for float arrays that may contain NaN.
//!
//! JSON has no NaN; `serde_json` writes non-finite floats as `null` and then
//! refuses to read them back. These adapters make the mapping explicit:
//! non-finite values serialize as `null` and `null` deserializes as NaN.
//!
//! Use with `#[serde(with = "sl_common::float_serde::vec")]` and friends.

use serde::de::Deserializer;
use serde::ser::{SerializeSeq, Serializer};
use serde::Deserialize;

fn write_seq<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for v in values {
        if v.is_finite() {
            seq.serialize_element(v)?;
        } else {
            seq.serialize_element(&Option::<f32>::None)?;
        }
    }
    seq.end()
}

fn from_nullable(raw: Vec<Option<f32>>) -> Vec<f32> {
    raw.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect()
}

/// `Vec<f32>` with NaN ⇄ `null`.
pub mod vec {
    use super::*;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(values: &Vec<f32>, serializer: S) -> Result<S::Ok, S::Error> {
        write_seq(values, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        Ok(from_nullable(Vec::deserialize(deserializer)?))
    }
}

/// `Option<Vec<f32>>` with NaN ⇄ `null`.
pub mod opt_vec {
    use super::*;

    pub fn serialize<S: Serializer>(
        values: &Option<Vec<f32>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match values {
            Some(v) => write_seq(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<f32>>, D::Error> {
        let raw: Option<Vec<Option<f32>>> = Option::deserialize(deserializer)?;
        Ok(raw.map(from_nullable))
    }
}

struct Row<'a>(&'a [f32]);

impl serde::Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        write_seq(self.0, serializer)
    }
}

fn write_rows<S: Serializer>(rows: &[Vec<f32>], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(rows.len()))?;
    for row in rows {
        seq.serialize_element(&Row(row))?;
    }
    seq.end()
}

/// `Vec<Vec<f32>>` (frame stacks) with NaN ⇄ `null`.
pub mod nested_vec {
    use super::*;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(
        rows: &Vec<Vec<f32>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        write_rows(rows, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<f32>>, D::Error> {
        let raw: Vec<Vec<Option<f32>>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(from_nullable).collect())
    }
}

/// `Option<Vec<Vec<f32>>>` with NaN ⇄ `null`.
pub mod opt_nested_vec {
    use super::*;

    pub fn serialize<S: Serializer>(
        rows: &Option<Vec<Vec<f32>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match rows {
            Some(rows) => write_rows(rows, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<Vec<f32>>>, D::Error> {
        let raw: Option<Vec<Vec<Option<f32>>>> = Option::deserialize(deserializer)?;
        Ok(raw.map(|rows| rows.into_iter().map(from_nullable).collect()))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::vec")]
        values: Vec<f32>,
        #[serde(with = "super::opt_vec", default)]
        maybe: Option<Vec<f32>>,
        #[serde(with = "super::nested_vec")]
        frames: Vec<Vec<f32>>,
    }

    #[test]
    fn nan_becomes_null_and_back() {
        let h = Holder {
            values: vec![1.0, f32::NAN, 3.0],
            maybe: Some(vec![f32::NAN]),
            frames: vec![vec![0.5, f32::NAN]],
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(
            json,
            r#"{"values":[1.0,null,3.0],"maybe":[null],"frames":[[0.5,null]]}"#
        );
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], 1.0);
        assert!(back.values[1].is_nan());
        assert!(back.maybe.unwrap()[0].is_nan());
        assert!(back.frames[0][1].is_nan());
    }

    #[test]
    fn missing_optional_is_none() {
        let back: Holder = serde_json::from_str(r#"{"values":[],"frames":[]}"#).unwrap();
        assert!(back.maybe.is_none());
    }

    #[test]
    fn optional_frames() {
        #[derive(Deserialize)]
        struct Frames {
            #[serde(with = "super::opt_nested_vec", default)]
            frames: Option<Vec<Vec<f32>>>,
        }
        let back: Frames = serde_json::from_str(r#"{"frames":[[1.0,null]]}"#).unwrap();
        let frames = back.frames.unwrap();
        assert_eq!(frames[0][0], 1.0);
        assert!(frames[0][1].is_nan());
        let back: Frames = serde_json::from_str("{}").unwrap();
        assert!(back.frames.is_none());
    }

    #[test]
    fn null_optional_is_none() {
        let back: Holder =
            serde_json::from_str(r#"{"values":[],"maybe":null,"frames":[]}"#).unwrap();
        assert!(back.maybe.is_none());
    }
}
