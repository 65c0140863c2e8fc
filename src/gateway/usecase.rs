// HTTP client for usecase parameters (traffic scale lookup).

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::instrument;

use super::UsecaseParams;
use crate::config::UsecaseConfig;
use crate::error::{ConductorError, Result};

pub struct HttpUsecaseParams {
    client: Client,
    base_url: Url,
}

impl HttpUsecaseParams {
    pub fn new(config: &UsecaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ConductorError::Validation(format!(
                "invalid usecase base url {:?}: {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConductorError::Validation(format!(
                "usecase base url {:?} cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// `{base}/usecases/{usecase}/{network}/params` with both names sent as single,
    /// percent-encoded path segments.
    pub(crate) fn params_url(&self, usecase: &str, network: &str) -> Result<Url> {
        for (what, name) in [("usecase", usecase), ("network", network)] {
            if matches!(name, "" | "." | "..") {
                return Err(ConductorError::Validation(format!(
                    "invalid {} name {:?}",
                    what, name
                )));
            }
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConductorError::Gateway("usecase base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["usecases", usecase, network, "params"]);
        Ok(url)
    }
}

/// `traffic_scale` must be present, numeric and > 0.
pub(crate) fn parse_traffic_scale(params: &serde_json::Value) -> Option<f64> {
    params
        .get("traffic_scale")
        .and_then(|v| v.as_f64())
        .filter(|s| s.is_finite() && *s > 0.0)
}

#[async_trait]
impl UsecaseParams for HttpUsecaseParams {
    #[instrument(skip(self), fields(gateway = "usecase"))]
    async fn traffic_scale(&self, usecase: &str, network: &str) -> Result<f64> {
        let url = self.params_url(usecase, network)?;
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(ConductorError::NotFound(format!(
                    "usecase parameters for {}/{} not found",
                    usecase, network
                )));
            }
            status => {
                return Err(ConductorError::Gateway(format!(
                    "usecase service returned {}",
                    status
                )));
            }
        }
        let params: serde_json::Value = response.json().await?;
        parse_traffic_scale(&params).ok_or_else(|| {
            ConductorError::Gateway(format!(
                "usecase parameters for {}/{} missing a positive traffic_scale",
                usecase, network
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn traffic_scale_must_be_positive_number() {
        assert_eq!(parse_traffic_scale(&json!({"traffic_scale": 2.0})), Some(2.0));
        assert_eq!(parse_traffic_scale(&json!({"traffic_scale": 3})), Some(3.0));
        assert_eq!(parse_traffic_scale(&json!({"traffic_scale": 0})), None);
        assert_eq!(parse_traffic_scale(&json!({"traffic_scale": -1.5})), None);
        assert_eq!(parse_traffic_scale(&json!({"traffic_scale": "2"})), None);
        assert_eq!(parse_traffic_scale(&json!({"other": 1})), None);
    }

    fn params(base_url: &str) -> HttpUsecaseParams {
        HttpUsecaseParams::new(&UsecaseConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn params_url_keeps_base_path() {
        let p = params("http://usecases:8080/api/");
        assert_eq!(
            p.params_url("uc1", "net-a").unwrap().as_str(),
            "http://usecases:8080/api/usecases/uc1/net-a/params"
        );
        let p = params("http://usecases:8080");
        assert_eq!(
            p.params_url("uc1", "net-a").unwrap().as_str(),
            "http://usecases:8080/usecases/uc1/net-a/params"
        );
    }

    #[test]
    fn params_url_encodes_separators() {
        let p = params("http://usecases:8080");
        let url = p.params_url("uc", "../../admin/x?y=").unwrap();
        assert_eq!(url.query(), None);
        assert!(url.path().starts_with("/usecases/uc/"));
        assert!(url.path().ends_with("/params"));
        assert!(!url.path().contains("/admin"));
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn dot_segments_are_rejected() {
        let p = params("http://usecases:8080");
        for (usecase, network) in [("..", "a"), ("uc", "."), ("uc", "")] {
            assert!(matches!(
                p.params_url(usecase, network),
                Err(ConductorError::Validation(_))
            ));
        }
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let result = HttpUsecaseParams::new(&UsecaseConfig {
            base_url: "not a url".into(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(ConductorError::Validation(_))));
    }
}
