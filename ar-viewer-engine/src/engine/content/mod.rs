//! Content records pushed by the host page and the viewer routes that name them.
//!
//! The engine never fetches records itself: it reads the content id from
//! the page route, asks the host for it (`content_requested`), and receives
//! the record through the `load_content` RPC.

use std::fmt;

use constants::path::{VIEWER_ROUTE_PREFIXES, WEB_MODEL_URL_SCHEMES};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::engine::error::ContentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(Uuid);

impl ContentId {
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| ContentError::InvalidId(raw.to_string()))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A published model as stored by the content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model_url: String,
    #[serde(default)]
    pub is_public: bool,
}

impl ContentRecord {
    /// Check the record can be shown and return its model URL.
    ///
    /// The web build only follows HTTP(S) URLs; native builds also read
    /// `file://` models from disk.
    pub fn viewable_model_url(&self) -> Result<&str, ContentError> {
        let schemes: &[&str] = if cfg!(target_arch = "wasm32") {
            WEB_MODEL_URL_SCHEMES
        } else {
            &["https", "http", "file"]
        };
        self.model_url_with_schemes(schemes)
    }

    fn model_url_with_schemes(&self, schemes: &[&str]) -> Result<&str, ContentError> {
        if !self.is_public {
            return Err(ContentError::NotPublic(self.id.to_string()));
        }
        let url = self.model_url.trim();
        if url.is_empty() {
            return Err(ContentError::MissingModelUrl(self.id.to_string()));
        }
        let allowed = Url::parse(url).is_ok_and(|parsed| schemes.contains(&parsed.scheme()));
        if !allowed {
            return Err(ContentError::UnsupportedModelUrl {
                id: self.id.to_string(),
                url: url.to_string(),
            });
        }
        Ok(url)
    }
}

/// Content id named by a viewer route such as `/view/<uuid>` or `/ar/<uuid>`.
///
/// Returns `Ok(None)` for paths that are not viewer routes.
pub fn parse_route(path: &str) -> Result<Option<ContentId>, ContentError> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let Some(rest) = VIEWER_ROUTE_PREFIXES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
    else {
        return Ok(None);
    };
    let raw = rest.trim_end_matches('/');
    ContentId::parse(raw).map(Some)
}

/// Content id from the page location, on the web.
pub fn route_content_id() -> Result<Option<ContentId>, ContentError> {
    #[cfg(target_arch = "wasm32")]
    {
        let path = web_sys::window()
            .and_then(|window| window.location().pathname().ok())
            .unwrap_or_default();
        parse_route(&path)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f1c2a4e-8d3b-4f5a-9c7e-1b2d3e4f5a6b";

    fn record(is_public: bool, model_url: &str) -> ContentRecord {
        ContentRecord {
            id: ContentId::parse(ID).unwrap(),
            title: "Chair".to_string(),
            description: None,
            model_url: model_url.to_string(),
            is_public,
        }
    }

    #[test]
    fn viewer_routes_carry_a_uuid() {
        let expected = ContentId::parse(ID).unwrap();
        assert_eq!(parse_route(&format!("/view/{ID}")), Ok(Some(expected)));
        assert_eq!(parse_route(&format!("/ar/{ID}/?mode=ar")), Ok(Some(expected)));
        assert_eq!(parse_route("/dashboard"), Ok(None));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert_eq!(
            parse_route("/view/not-a-uuid"),
            Err(ContentError::InvalidId("not-a-uuid".to_string()))
        );
        assert!(parse_route("/view/").is_err());
    }

    #[test]
    fn only_public_records_with_models_are_viewable() {
        assert_eq!(
            record(true, " https://cdn.example/chair.glb ").viewable_model_url(),
            Ok("https://cdn.example/chair.glb")
        );
        assert!(matches!(
            record(false, "https://cdn.example/chair.glb").viewable_model_url(),
            Err(ContentError::NotPublic(_))
        ));
        assert!(matches!(
            record(true, "").viewable_model_url(),
            Err(ContentError::MissingModelUrl(_))
        ));
    }

    #[test]
    fn web_records_must_use_http() {
        let web = |url: &str| {
            Box::leak(Box::new(record(true, url))).model_url_with_schemes(WEB_MODEL_URL_SCHEMES)
        };
        assert_eq!(web("http://cdn.example/chair.glb"), Ok("http://cdn.example/chair.glb"));
        for rejected in [
            "file:///etc/chair.glb",
            "javascript:alert(1)",
            "ftp://cdn.example/chair.glb",
            "/models/chair.glb",
        ] {
            assert!(
                matches!(web(rejected), Err(ContentError::UnsupportedModelUrl { .. })),
                "{rejected} was accepted"
            );
        }

        // Every build refuses non-fetchable schemes.
        assert!(record(true, "data:model/gltf+json,{}").viewable_model_url().is_err());
    }

    #[test]
    fn records_deserialize_from_host_json() {
        let json = serde_json::json!({
            "id": ID,
            "title": "Chair",
            "model_url": "https://cdn.example/chair.gltf",
            "is_public": true
        });
        let parsed: ContentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record(true, "https://cdn.example/chair.gltf"));
    }
}
