//! Typed access to a request's parameter map.
//!
//! `null` and the empty string count as absent, so a caller that forwards
//! an unset field gets the same treatment as one that leaves it out.

use chrono::{DateTime, FixedOffset};
use gcal_core::parse_instant;
use serde_json::{Map, Value};

use crate::error::{CommandError, CommandResult};

pub struct Params<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        match self.map.get(name)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            value => Some(value),
        }
    }

    pub fn required_str(&self, name: &'static str) -> CommandResult<&'a str> {
        self.optional_str(name)?
            .ok_or(CommandError::MissingParameter(name))
    }

    pub fn optional_str(&self, name: &'static str) -> CommandResult<Option<&'a str>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(CommandError::invalid(name, "expected a string")),
        }
    }

    pub fn required_i64(&self, name: &'static str) -> CommandResult<i64> {
        match self.get(name) {
            None => Err(CommandError::MissingParameter(name)),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| CommandError::invalid(name, "expected an integer")),
        }
    }

    /// A non-negative integer, or `default` when absent.
    pub fn u32_or(&self, name: &'static str, default: u32) -> CommandResult<u32> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| CommandError::invalid(name, "expected a non-negative integer")),
        }
    }

    /// An array of strings; absent means empty.
    pub fn string_list(&self, name: &'static str) -> CommandResult<Vec<String>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(String::from)
                        .ok_or_else(|| CommandError::invalid(name, "expected an array of strings"))
                })
                .collect(),
            Some(_) => Err(CommandError::invalid(name, "expected an array of strings")),
        }
    }

    pub fn required_instant(
        &self,
        name: &'static str,
        offset: FixedOffset,
    ) -> CommandResult<DateTime<FixedOffset>> {
        let raw = self.required_str(name)?;
        instant(name, raw, offset)
    }

    pub fn optional_instant(
        &self,
        name: &'static str,
        offset: FixedOffset,
    ) -> CommandResult<Option<DateTime<FixedOffset>>> {
        self.optional_str(name)?
            .map(|raw| instant(name, raw, offset))
            .transpose()
    }
}

fn instant(
    name: &'static str,
    raw: &str,
    offset: FixedOffset,
) -> CommandResult<DateTime<FixedOffset>> {
    parse_instant(raw, offset).map_err(|e| CommandError::invalid(name, e.to_string()))
}
