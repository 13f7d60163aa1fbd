/// Runtime configuration file, relative to the asset root.
pub const VIEWER_CONFIG_PATH: &str = "config/viewer.json";

/// Asset source that holds fetched model files.
pub const MODEL_CACHE_SOURCE: &str = "model-cache";

/// Route prefixes that carry a content identifier.
pub const VIEWER_ROUTE_PREFIXES: &[&str] = &["/view/", "/ar/"];

/// URL schemes a content record may point its model at on the web.
pub const WEB_MODEL_URL_SCHEMES: &[&str] = &["https", "http"];
