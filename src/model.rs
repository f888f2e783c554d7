use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A chat model offered by the service.
///
/// Each model has a short, user-facing alias and a provider-specific
/// identifier that goes on the wire.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Model {
    /// OpenAI GPT-4o mini
    #[default]
    Gpt4oMini,

    /// Anthropic Claude 3 Haiku (2024-03-07 version)
    Claude3Haiku,

    /// Meta Llama 3.1 70B Instruct Turbo
    Llama,

    /// Mistral Mixtral 8x7B Instruct
    Mixtral,
}

impl Model {
    /// Every model, in menu order.
    pub const ALL: [Model; 4] = [
        Model::Gpt4oMini,
        Model::Claude3Haiku,
        Model::Llama,
        Model::Mixtral,
    ];

    /// The short alias users type to select this model.
    pub fn alias(&self) -> &'static str {
        match self {
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Claude3Haiku => "claude-3-haiku",
            Model::Llama => "llama",
            Model::Mixtral => "mixtral",
        }
    }

    /// The provider-specific identifier sent in chat requests.
    pub fn identifier(&self) -> &'static str {
        match self {
            Model::Gpt4oMini => "gpt-4o-mini",
            Model::Claude3Haiku => "claude-3-haiku-20240307",
            Model::Llama => "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo",
            Model::Mixtral => "mistralai/Mixtral-8x7B-Instruct-v0.1",
        }
    }

    /// A human-readable name for menus.
    pub fn display_name(&self) -> &'static str {
        match self {
            Model::Gpt4oMini => "GPT-4o mini",
            Model::Claude3Haiku => "Claude 3 Haiku",
            Model::Llama => "Llama 3.1 70B",
            Model::Mixtral => "Mixtral 8x7B",
        }
    }

    /// Looks up a model by its alias.
    pub fn from_alias(alias: &str) -> Option<Model> {
        Model::ALL
            .into_iter()
            .find(|model| model.alias().eq_ignore_ascii_case(alias))
    }

    /// Looks up a model by its 1-based position in [`Model::ALL`].
    pub fn from_menu_index(index: usize) -> Option<Model> {
        index
            .checked_sub(1)
            .and_then(|index| Model::ALL.get(index).copied())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alias())
    }
}

impl FromStr for Model {
    type Err = Error;

    /// Parses an alias such as `llama` or a menu number such as `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(model) = Model::from_alias(s) {
            return Ok(model);
        }
        if let Some(model) = s.parse::<usize>().ok().and_then(Model::from_menu_index) {
            return Ok(model);
        }
        let known = Model::ALL
            .iter()
            .map(Model::alias)
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::validation(
            format!("unknown model {s:?} (expected one of: {known})"),
            Some("model".to_string()),
        ))
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.identifier())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Model::ALL
            .into_iter()
            .find(|model| model.identifier() == s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown model identifier: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_provider_identifier() {
        let json = serde_json::to_string(&Model::Claude3Haiku).unwrap();
        assert_eq!(json, r#""claude-3-haiku-20240307""#);

        let json = serde_json::to_string(&Model::Mixtral).unwrap();
        assert_eq!(json, r#""mistralai/Mixtral-8x7B-Instruct-v0.1""#);
    }

    #[test]
    fn deserializes_provider_identifier() {
        let json = r#""meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo""#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model, Model::Llama);

        assert!(serde_json::from_str::<Model>(r#""llama""#).is_err());
    }

    #[test]
    fn parse_alias() {
        assert_eq!("gpt-4o-mini".parse::<Model>().unwrap(), Model::Gpt4oMini);
        assert_eq!(" Claude-3-Haiku ".parse::<Model>().unwrap(), Model::Claude3Haiku);
        assert_eq!("mixtral".parse::<Model>().unwrap(), Model::Mixtral);
    }

    #[test]
    fn parse_menu_index() {
        assert_eq!("1".parse::<Model>().unwrap(), Model::Gpt4oMini);
        assert_eq!("3".parse::<Model>().unwrap(), Model::Llama);
        assert!("0".parse::<Model>().is_err());
        assert!("5".parse::<Model>().is_err());
    }

    #[test]
    fn parse_unknown() {
        let err = "gpt-5".parse::<Model>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("llama"));
    }

    #[test]
    fn display_is_alias() {
        assert_eq!(Model::Claude3Haiku.to_string(), "claude-3-haiku");
        assert_eq!(Model::default(), Model::Gpt4oMini);
    }
}
