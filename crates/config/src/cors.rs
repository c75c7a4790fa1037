//! Cross-origin settings for browser clients of the chat and enhancer endpoints.

use std::fmt;

use serde::{
    Deserialize, Deserializer,
    de::{self, SeqAccess, Visitor},
};
use url::Url;

/// Configuration for CORS (Cross-Origin Resource Sharing)
#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins from which we allow requests. Either `"*"` or a list of origins.
    pub allow_origins: Option<AllowedOrigins>,
    /// If false (or not defined), credentials are not allowed in requests
    pub allow_credentials: bool,
}

/// Either any origin, or an explicit list of origins.
#[derive(Clone, Debug, PartialEq)]
pub enum AllowedOrigins {
    /// `*`
    Any,
    /// Only the listed origins.
    Explicit(Vec<Url>),
}

impl<'de> Deserialize<'de> for AllowedOrigins {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OriginsVisitor;

        impl<'de> Visitor<'de> for OriginsVisitor {
            type Value = AllowedOrigins;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(r#""*" or an array of origin URLs"#)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value == "*" {
                    Ok(AllowedOrigins::Any)
                } else {
                    Url::parse(value)
                        .map(|url| AllowedOrigins::Explicit(vec![url]))
                        .map_err(|e| E::custom(format!("invalid origin '{value}': {e}")))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut origins = Vec::new();

                while let Some(origin) = seq.next_element::<Url>()? {
                    origins.push(origin);
                }

                Ok(AllowedOrigins::Explicit(origins))
            }
        }

        deserializer.deserialize_any(OriginsVisitor)
    }
}
