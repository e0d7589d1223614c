use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys a provider may use for the stable user identifier, in lookup order.
const ID_KEYS: [&str; 3] = ["sub", "id", "user_id"];

/// Provider-issued user attributes.
///
/// The provider owns the shape, so this is a thin wrapper around the JSON
/// object it returns. The only thing enforced is that some identifier is present.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    /// Accepts a user-info payload if it is an object carrying an identifier.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(map) => {
                let profile = Profile(map);
                if profile.id().is_none() {
                    return Err(format!(
                        "profile has none of the identifier fields {:?}",
                        ID_KEYS
                    ));
                }
                Ok(profile)
            }
            other => Err(format!("profile is not a JSON object: {}", other)),
        }
    }

    /// Parses a profile previously serialized with [`Profile::to_json`].
    pub fn from_json(text: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| format!("Error parsing profile JSON: {}", e))?;
        Self::from_value(value)
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// The provider's identifier for this user.
    pub fn id(&self) -> Option<String> {
        ID_KEYS.iter().find_map(|key| match self.0.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_any_identifier_key() {
        for payload in [
            json!({"sub": "auth0|1"}),
            json!({"id": "u1"}),
            json!({"user_id": 42}),
        ] {
            let profile = Profile::from_value(payload).unwrap();
            assert!(profile.id().is_some());
        }
    }

    #[test]
    fn sub_wins_over_id() {
        let profile = Profile::from_value(json!({"id": "u1", "sub": "auth0|1"})).unwrap();
        assert_eq!(profile.id().as_deref(), Some("auth0|1"));
    }

    #[test]
    fn rejects_payload_without_identifier() {
        assert!(Profile::from_value(json!({"email": "a@b.com"})).is_err());
        assert!(Profile::from_value(json!({"id": ""})).is_err());
        assert!(Profile::from_value(json!(["u1"])).is_err());
    }

    #[test]
    fn keeps_unknown_attributes() {
        let profile = Profile::from_json(
            r#"{"id":"u1","email":"a@b.com","picture":"https://x/y.png","email_verified":true}"#,
        )
        .unwrap();
        assert_eq!(profile.email(), Some("a@b.com"));
        assert_eq!(profile.get("email_verified"), Some(&json!(true)));
        assert_eq!(Profile::from_json(&profile.to_json()).unwrap(), profile);
    }

    #[test]
    fn garbage_text_is_an_error() {
        assert!(Profile::from_json("not json").is_err());
    }
}
