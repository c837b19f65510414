//! HTTP clients for the external data services: geocoding, web search,
//! weather forecasts and the generative reasoning endpoint.

use super::{Coordinates, Geocoder, Reasoner, WeatherSource, WebSearch};
use crate::config::{ServicesConfig, WeatherProvider};
use crate::error::ProducerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const SERP_URL: &str = "https://serpapi.com/search.json";
const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";
const WEATHERAPI_URL: &str = "http://api.weatherapi.com/v1/forecast.json";
const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const SEARCH_ATTEMPTS: u32 = 3;
const SEARCH_BACKOFF_MAX: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub link: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

pub struct HttpServices {
    config: ServicesConfig,
    client: reqwest::Client,
}

impl HttpServices {
    pub fn new(config: ServicesConfig, http_timeout: Duration) -> Result<Self, ProducerError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ProducerError::external("http", e))?;
        Ok(Self { config, client })
    }

    async fn get_json(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, ProducerError> {
        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProducerError::external(service, e))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ProducerError::external(service, format!("{} {}", status, text)));
        }
        res.json::<Value>()
            .await
            .map_err(|e| ProducerError::malformed(service, e))
    }

    async fn search_once(&self, query: &str, num: usize) -> Result<Vec<SearchHit>, ProducerError> {
        let params = [
            ("engine", "google".to_string()),
            ("q", query.to_string()),
            ("num", num.to_string()),
            ("api_key", self.config.serp_api_key.clone()),
            ("hl", "en".to_string()),
            ("gl", "us".to_string()),
        ];
        let body = self.get_json("search", SERP_URL, &params).await?;
        let hits = body
            .get("organic_results")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value::<SearchHit>(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(hits)
    }
}

#[async_trait]
impl Geocoder for HttpServices {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, ProducerError> {
        let params = [
            ("address", address.to_string()),
            ("key", self.config.google_maps_api_key.clone()),
        ];
        let body = self.get_json("geocoding", GEOCODE_URL, &params).await?;
        let loc = body
            .get("results")
            .and_then(|r| r.get(0))
            .and_then(|r| r.pointer("/geometry/location"));
        Ok(loc.and_then(|l| Some((l.get("lat")?.as_f64()?, l.get("lng")?.as_f64()?))))
    }
}

#[async_trait]
impl WebSearch for HttpServices {
    /// Retries with exponential backoff (1s, 2s, capped at 4s).
    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchHit>, ProducerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.search_once(query, num).await {
                Ok(hits) => return Ok(hits),
                Err(e) if attempt < SEARCH_ATTEMPTS => {
                    let wait = Duration::from_secs(1u64 << (attempt - 1)).min(SEARCH_BACKOFF_MAX);
                    debug!(attempt, error = %e, "search failed; retrying");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl WeatherSource for HttpServices {
    async fn forecast(&self, coords: Coordinates) -> Result<Value, ProducerError> {
        let (lat, lon) = coords;
        match self.config.weather_provider {
            WeatherProvider::OpenWeather => {
                let params = [
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("appid", self.config.weather_api_key.clone()),
                    ("exclude", "minutely,hourly,alerts".to_string()),
                ];
                self.get_json("weather", OPENWEATHER_URL, &params).await
            }
            WeatherProvider::WeatherApi => {
                let params = [
                    ("key", self.config.weather_api_key.clone()),
                    ("q", format!("{},{}", lat, lon)),
                    ("days", "7".to_string()),
                    ("aqi", "no".to_string()),
                    ("alerts", "no".to_string()),
                ];
                self.get_json("weather", WEATHERAPI_URL, &params).await
            }
        }
    }

    fn provider(&self) -> &'static str {
        match self.config.weather_provider {
            WeatherProvider::OpenWeather => "openweather",
            WeatherProvider::WeatherApi => "weatherapi",
        }
    }
}

#[async_trait]
impl Reasoner for HttpServices {
    async fn generate(&self, prompt: &str) -> Result<String, ProducerError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE, self.config.gemini_model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });
        let res = self
            .client
            .post(&url)
            .query(&[("key", self.config.gemini_api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProducerError::external("reasoning", e))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            warn!(%status, "reasoning request rejected");
            return Err(ProducerError::external("reasoning", format!("{} {}", status, text)));
        }
        let payload: Value = res
            .json()
            .await
            .map_err(|e| ProducerError::malformed("reasoning", e))?;
        payload
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProducerError::malformed("reasoning", "no candidate text"))
    }
}
