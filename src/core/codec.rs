//! Purpose: Convert keys and values to and from cell text.
//! Exports: `Encode`, `Decode`, `Codec`, and the `Opaque`, `Json`, `PlainText` strategies.
//! Role: Injected policy that decides which key/value types a mapping supports.
//! Invariants: Equal values encode to equal cells; key lookup compares encoded cells only.
//! Invariants: `Opaque` output never contains whitespace, quotes, or separators.
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::error::{Error, ErrorKind, Result};

pub trait Encode<T: ?Sized> {
    fn encode(&self, value: &T) -> Result<String>;
}

pub trait Decode<T> {
    fn decode(&self, cell: &str) -> Result<T>;
}

/// Both directions of a serialization strategy for `T`.
pub trait Codec<T>: Encode<T> + Decode<T> {}

impl<C, T> Codec<T> for C where C: Encode<T> + Decode<T> {}

/// Strategy name, for diagnostics and CLI output.
pub trait Describe {
    fn describe(&self) -> &'static str;
}

/// serde → JSON bytes → standard base64.
///
/// Supports any serde type, including sequences and tuples as keys. Keys are
/// compared by their encoded form: `1` and `1.0` stay distinct, while a `Vec`
/// and a tuple with the same elements collide because both encode as JSON arrays.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Opaque;

/// serde → JSON text, stored as-is so the sheet stays readable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Json;

/// Identity mapping for text keys and values.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlainText;

impl<T: Serialize + ?Sized> Encode<T> for Opaque {
    fn encode(&self, value: &T) -> Result<String> {
        let bytes = serde_json::to_vec(value).map_err(encode_error)?;
        Ok(STANDARD.encode(bytes))
    }
}

impl<T: DeserializeOwned> Decode<T> for Opaque {
    fn decode(&self, cell: &str) -> Result<T> {
        let compact: String = cell.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact.as_bytes()).map_err(|err| {
            Error::new(ErrorKind::Codec)
                .with_message("cell is not valid base64")
                .with_source(err)
        })?;
        serde_json::from_slice(&bytes).map_err(decode_error)
    }
}

impl<T: Serialize + ?Sized> Encode<T> for Json {
    fn encode(&self, value: &T) -> Result<String> {
        serde_json::to_string(value).map_err(encode_error)
    }
}

impl<T: DeserializeOwned> Decode<T> for Json {
    fn decode(&self, cell: &str) -> Result<T> {
        serde_json::from_str(cell).map_err(decode_error)
    }
}

impl Encode<str> for PlainText {
    fn encode(&self, value: &str) -> Result<String> {
        Ok(value.to_string())
    }
}

impl Encode<String> for PlainText {
    fn encode(&self, value: &String) -> Result<String> {
        Ok(value.clone())
    }
}

impl Decode<String> for PlainText {
    fn decode(&self, cell: &str) -> Result<String> {
        Ok(cell.to_string())
    }
}

impl Describe for Opaque {
    fn describe(&self) -> &'static str {
        "opaque"
    }
}

impl Describe for Json {
    fn describe(&self) -> &'static str {
        "json"
    }
}

impl Describe for PlainText {
    fn describe(&self) -> &'static str {
        "plain"
    }
}

fn encode_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("value cannot be serialized")
        .with_source(err)
}

fn decode_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Codec)
        .with_message("cell does not decode to the expected type")
        .with_source(err)
}
