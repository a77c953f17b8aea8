//! Passage endpoint client.

use lectio_core::{DayKey, Passage, PassageProvider, StoreError};
use reqwest::{Client, Url};
use serde::Deserialize;

/// Error body the endpoint sends with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// `GET <url>[?day=MM-DD]` returning `{dayKey, formattedDate, passageHtml}`.
#[derive(Debug, Clone)]
pub struct HttpPassageProvider {
    client: Client,
    url: Url,
}

impl HttpPassageProvider {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn request_url(&self, day: Option<&DayKey>) -> Url {
        let mut url = self.url.clone();
        if let Some(day) = day {
            url.query_pairs_mut().append_pair("day", day.as_str());
        }
        url
    }
}

impl PassageProvider for HttpPassageProvider {
    async fn passage(&self, day: Option<&DayKey>) -> Result<Passage, StoreError> {
        let url = self.request_url(day);
        tracing::debug!(target: "lectio::passage", %url, "fetching passage");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        parse_response(status.as_u16(), &body, day)
    }
}

fn parse_response(status: u16, body: &str, day: Option<&DayKey>) -> Result<Passage, StoreError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("passage endpoint returned {}", status));
        return Err(match (status, day) {
            (404, Some(day)) => StoreError::PassageNotFound(day.to_string()),
            _ => StoreError::Backend(message),
        });
    }

    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return Err(StoreError::Backend(error));
    }
    serde_json::from_str::<Passage>(body)
        .map_err(|e| StoreError::Backend(format!("malformed passage: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_adds_day() {
        let provider =
            HttpPassageProvider::new(Url::parse("http://localhost:3001/api/get-passage").unwrap());
        assert_eq!(
            provider.request_url(None).as_str(),
            "http://localhost:3001/api/get-passage"
        );
        let day = DayKey::new("11-12").unwrap();
        assert_eq!(
            provider.request_url(Some(&day)).as_str(),
            "http://localhost:3001/api/get-passage?day=11-12"
        );
    }

    #[test]
    fn test_parse_passage_body() {
        let body = r#"{"dayKey":"11-12","formattedDate":"November 12","passageHtml":"<p>grace</p>"}"#;
        let passage = parse_response(200, body, None).unwrap();
        assert_eq!(passage.day_key.as_str(), "11-12");
        assert_eq!(passage.formatted_date, "November 12");
        assert_eq!(passage.html, "<p>grace</p>");
    }

    #[test]
    fn test_error_body_becomes_backend_error() {
        let err = parse_response(500, r#"{"error":"SJCAC scrape failed"}"#, None).unwrap_err();
        assert_eq!(err, StoreError::Backend("SJCAC scrape failed".into()));
    }

    #[test]
    fn test_missing_day_is_not_found() {
        let day = DayKey::new("02-30").unwrap();
        let err = parse_response(404, "", Some(&day)).unwrap_err();
        assert_eq!(err, StoreError::PassageNotFound("02-30".into()));
    }

    #[test]
    fn test_malformed_body() {
        let err = parse_response(200, r#"{"dayKey":"11-12"}"#, None).unwrap_err();
        assert!(matches!(err, StoreError::Backend(m) if m.starts_with("malformed passage")));
    }
}
