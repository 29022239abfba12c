use serde::Deserialize;

/// JWT payload claims this gate cares about.
///
/// NOTE:
/// - `id` / `_id` are the internal identity claims minted by our own issuer.
/// - `sub` is the standard subject claim; external IdP tokens carry identity here.
/// - Everything is optional: the token format is not under our control, so the
///   decision of what counts as a usable identity lives in the resolvers.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "_id", default)]
    pub legacy_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,

    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub nbf: Option<u64>,
}

impl Claims {
    /// Internal identity: prefer `id`, fall back to `_id`. Empty strings don't count.
    pub fn identity(&self) -> Option<&str> {
        non_empty(self.id.as_deref()).or_else(|| non_empty(self.legacy_id.as_deref()))
    }

    /// Standard `sub` claim, if present and non-empty.
    pub fn subject(&self) -> Option<&str> {
        non_empty(self.sub.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
