use routekit_core::ApiConfig;
use serde::Serialize;

pub const OPENAPI_VERSION: &str = "3.1.0";

/// One entry of the document's `servers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// Configuration for the generated OpenAPI document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub servers: Vec<Server>,
    /// Value of the top-level `openapi` field.
    pub openapi: String,
}

impl OpenApiConfig {
    pub fn new(title: &str, version: &str) -> Self {
        Self {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
            servers: Vec::new(),
            openapi: OPENAPI_VERSION.to_string(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    pub fn with_openapi_version(mut self, version: &str) -> Self {
        self.openapi = version.to_string();
        self
    }

    pub(crate) fn info(&self) -> Info<'_> {
        Info {
            title: &self.title,
            version: &self.version,
            description: self.description.as_deref(),
        }
    }
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self::new("API", "0.1.0")
    }
}

impl From<&ApiConfig> for OpenApiConfig {
    fn from(config: &ApiConfig) -> Self {
        let section = &config.openapi;
        Self {
            title: section.title.clone(),
            version: section.version.clone(),
            description: section.description.clone(),
            servers: section.servers.iter().map(Server::new).collect(),
            openapi: OPENAPI_VERSION.to_string(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct Info<'a> {
    pub title: &'a str,
    pub version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_api_config_copies_the_openapi_section() {
        let config = ApiConfig::from_yaml_str(
            "openapi:\n  title: Shop\n  version: 2.1.0\n  description: Orders and users\n  servers:\n    - https://api.example.com\n",
        )
        .unwrap();
        let openapi = OpenApiConfig::from(&config);
        assert_eq!(openapi.title, "Shop");
        assert_eq!(openapi.version, "2.1.0");
        assert_eq!(openapi.description.as_deref(), Some("Orders and users"));
        assert_eq!(openapi.servers, vec![Server::new("https://api.example.com")]);
        assert_eq!(openapi.openapi, "3.1.0");
    }
}
