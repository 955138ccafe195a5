//! The method catalogue served by the daemon and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Parameter names shared by callers and the dispatcher.
pub mod param {
    pub const DAYS: &str = "days";
    pub const LIMIT: &str = "limit";
    pub const QUERY: &str = "query";
    pub const SUMMARY: &str = "summary";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const DESCRIPTION: &str = "description";
    pub const LOCATION: &str = "location";
    pub const ATTENDEES: &str = "attendees";
    pub const DURATION_MINUTES: &str = "duration_minutes";
    pub const EVENT_ID: &str = "event_id";
    pub const TEXT: &str = "text";
}

pub const DEFAULT_UPCOMING_DAYS: u32 = 7;
pub const DEFAULT_UPCOMING_LIMIT: u32 = 20;
pub const DEFAULT_SEARCH_DAYS: u32 = 30;
pub const DEFAULT_FREE_SLOT_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Today,
    Upcoming,
    Search,
    Create,
    FreeSlots,
    Get,
    Delete,
    Update,
    Quick,
    Methods,
    Health,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown method: {0}")]
pub struct UnknownMethod(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    String,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<u32>,
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        default: None,
    }
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        default: None,
    }
}

const fn defaulted(name: &'static str, default: u32) -> ParamSpec {
    ParamSpec {
        name,
        kind: ParamKind::Integer,
        required: false,
        default: Some(default),
    }
}

static UPCOMING_PARAMS: [ParamSpec; 2] = [
    defaulted(param::DAYS, DEFAULT_UPCOMING_DAYS),
    defaulted(param::LIMIT, DEFAULT_UPCOMING_LIMIT),
];

static SEARCH_PARAMS: [ParamSpec; 2] = [
    required(param::QUERY, ParamKind::String),
    defaulted(param::DAYS, DEFAULT_SEARCH_DAYS),
];

static CREATE_PARAMS: [ParamSpec; 6] = [
    required(param::SUMMARY, ParamKind::String),
    required(param::START, ParamKind::String),
    required(param::END, ParamKind::String),
    optional(param::DESCRIPTION, ParamKind::String),
    optional(param::LOCATION, ParamKind::String),
    optional(param::ATTENDEES, ParamKind::Array),
];

static FREE_SLOT_PARAMS: [ParamSpec; 2] = [
    required(param::DURATION_MINUTES, ParamKind::Integer),
    defaulted(param::DAYS, DEFAULT_FREE_SLOT_DAYS),
];

static EVENT_ID_PARAMS: [ParamSpec; 1] = [required(param::EVENT_ID, ParamKind::String)];

static UPDATE_PARAMS: [ParamSpec; 6] = [
    required(param::EVENT_ID, ParamKind::String),
    optional(param::SUMMARY, ParamKind::String),
    optional(param::START, ParamKind::String),
    optional(param::END, ParamKind::String),
    optional(param::DESCRIPTION, ParamKind::String),
    optional(param::LOCATION, ParamKind::String),
];

static QUICK_PARAMS: [ParamSpec; 1] = [required(param::TEXT, ParamKind::String)];

/// Entry in the `methods` listing.
#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl Method {
    pub const ALL: [Method; 11] = [
        Self::Today,
        Self::Upcoming,
        Self::Search,
        Self::Create,
        Self::FreeSlots,
        Self::Get,
        Self::Delete,
        Self::Update,
        Self::Quick,
        Self::Methods,
        Self::Health,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Today => "calendar.today",
            Self::Upcoming => "calendar.upcoming",
            Self::Search => "calendar.search",
            Self::Create => "calendar.create",
            Self::FreeSlots => "calendar.free_slots",
            Self::Get => "calendar.get",
            Self::Delete => "calendar.delete",
            Self::Update => "calendar.update",
            Self::Quick => "calendar.quick",
            Self::Methods => "methods",
            Self::Health => "health",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Today => "Get today's events",
            Self::Upcoming => "Get upcoming events",
            Self::Search => "Search events by query",
            Self::Create => "Create a new event",
            Self::FreeSlots => "Find available time slots",
            Self::Get => "Get a specific event by ID",
            Self::Delete => "Delete an event",
            Self::Update => "Update an existing event",
            Self::Quick => "Quick add event from natural language",
            Self::Methods => "List available methods",
            Self::Health => "Report service health",
        }
    }

    pub fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::Today | Self::Methods | Self::Health => &[],
            Self::Upcoming => &UPCOMING_PARAMS,
            Self::Search => &SEARCH_PARAMS,
            Self::Create => &CREATE_PARAMS,
            Self::FreeSlots => &FREE_SLOT_PARAMS,
            Self::Get | Self::Delete => &EVENT_ID_PARAMS,
            Self::Update => &UPDATE_PARAMS,
            Self::Quick => &QUICK_PARAMS,
        }
    }

    pub fn info(self) -> MethodInfo {
        MethodInfo {
            name: self.name(),
            description: self.description(),
            params: self.params(),
        }
    }

    pub fn catalogue() -> Vec<MethodInfo> {
        Self::ALL.iter().map(|m| m.info()).collect()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for method in Method::ALL {
            assert_eq!(method.name().parse::<Method>(), Ok(method));
        }
        assert_eq!(
            "calendar.nope".parse::<Method>(),
            Err(UnknownMethod("calendar.nope".to_string()))
        );
    }

    #[test]
    fn every_method_is_listed_once() {
        let catalogue = Method::catalogue();
        assert_eq!(catalogue.len(), Method::ALL.len());
        let mut names: Vec<_> = catalogue.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Method::ALL.len());
    }

    #[test]
    fn free_slots_listing() {
        insta::assert_json_snapshot!(Method::FreeSlots.info(), @r#"
        {
          "name": "calendar.free_slots",
          "description": "Find available time slots",
          "params": [
            {
              "name": "duration_minutes",
              "type": "integer",
              "required": true
            },
            {
              "name": "days",
              "type": "integer",
              "required": false,
              "default": 7
            }
          ]
        }
        "#);
    }
}
