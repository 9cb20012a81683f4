use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a backend model identifier.
///
/// This can be a predefined model version or a custom string value
/// for models that may be added in the future.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier (for future models or private models)
    Custom(String),
}

/// Known backend model versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// The default free-tier rendering model.
    #[serde(rename = "text-davinci-002-render")]
    TextDavinci002Render,

    /// The sha-pinned rendering model.
    #[serde(rename = "text-davinci-002-render-sha")]
    TextDavinci002RenderSha,

    /// The paid-tier rendering model.
    #[serde(rename = "text-davinci-002-render-paid")]
    TextDavinci002RenderPaid,

    /// GPT-4.
    #[serde(rename = "gpt-4")]
    Gpt4,
}

impl Model {
    /// Returns the string identifier sent over the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Model::Known(KnownModel::TextDavinci002Render) => "text-davinci-002-render",
            Model::Known(KnownModel::TextDavinci002RenderSha) => "text-davinci-002-render-sha",
            Model::Known(KnownModel::TextDavinci002RenderPaid) => "text-davinci-002-render-paid",
            Model::Known(KnownModel::Gpt4) => "gpt-4",
            Model::Custom(custom) => custom,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::TextDavinci002Render)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Model::Known(self.clone()))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Model::from(s))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::from(model.as_str())
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model {
            "text-davinci-002-render" => Model::Known(KnownModel::TextDavinci002Render),
            "text-davinci-002-render-sha" => Model::Known(KnownModel::TextDavinci002RenderSha),
            "text-davinci-002-render-paid" => Model::Known(KnownModel::TextDavinci002RenderPaid),
            "gpt-4" => Model::Known(KnownModel::Gpt4),
            custom => Model::Custom(custom.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = Model::Known(KnownModel::TextDavinci002Render);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""text-davinci-002-render""#);

        let model = Model::Known(KnownModel::Gpt4);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""gpt-4""#);
    }

    #[test]
    fn custom_model_serialization() {
        let model = Model::Custom("text-davinci-003-experimental".to_string());
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""text-davinci-003-experimental""#);
    }

    #[test]
    fn model_deserialization() {
        let json = r#""text-davinci-002-render""#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model, Model::Known(KnownModel::TextDavinci002Render));

        let json = r#""text-davinci-003-experimental""#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(
            model,
            Model::Custom("text-davinci-003-experimental".to_string())
        );
    }

    #[test]
    fn parse_known_and_custom() {
        let model: Model = "gpt-4".parse().unwrap();
        assert_eq!(model, Model::Known(KnownModel::Gpt4));

        let model: Model = "gpt-5-preview".parse().unwrap();
        assert_eq!(model, Model::Custom("gpt-5-preview".to_string()));
    }

    #[test]
    fn display() {
        let model = Model::default();
        assert_eq!(model.to_string(), "text-davinci-002-render");

        let model = Model::Custom("gpt-5-preview".to_string());
        assert_eq!(model.to_string(), "gpt-5-preview");
    }
}
