//! Hosted store backed by the Supabase REST (`PostgREST`) API.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::ConfessionStore;
use crate::error::{Error, Result};
use crate::models::{Confession, ConfessionId, Identity, LikeRecord};
use crate::util::{compact_text, is_http_url};

const CONFESSIONS_TABLE: &str = "confessions";
const LIKES_TABLE: &str = "likes";
const CONFESSION_COLUMNS: &str = "id,text,created_at,likes_count";
const FEED_ORDER: &str = "created_at.desc,id.desc";
const REQUEST_TIMEOUT_SECS: u64 = 20;
const UNIQUE_VIOLATION_CODE: &str = "23505";
const FOREIGN_KEY_VIOLATION_CODE: &str = "23503";

#[derive(Clone)]
pub struct SupabaseStore {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl fmt::Debug for SupabaseStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseStore")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseStore {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> Result<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::InvalidInput(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(map_api_error(status, &body))
    }
}

impl ConfessionStore for SupabaseStore {
    async fn insert_confession(&self, text: &str) -> Result<Confession> {
        let payload = serde_json::json!({
            "text": text,
            "is_anonymous": true,
        });
        let request = self
            .client
            .post(self.table_url(CONFESSIONS_TABLE))
            .query(&[("select", CONFESSION_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(&payload);

        let rows = self.send(request).await?.json::<Vec<ConfessionRow>>().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Api("Insert response did not include the new confession".to_string()))?
            .try_into()
    }

    async fn list_confessions(&self, limit: usize) -> Result<Vec<Confession>> {
        let request = self.client.get(self.table_url(CONFESSIONS_TABLE)).query(&[
            ("select", CONFESSION_COLUMNS.to_string()),
            ("order", FEED_ORDER.to_string()),
            ("limit", limit.to_string()),
        ]);

        let rows = self.send(request).await?.json::<Vec<ConfessionRow>>().await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_like(&self, like: &LikeRecord) -> Result<()> {
        let request = self
            .client
            .post(self.table_url(LIKES_TABLE))
            .header("Prefer", "return=minimal")
            .json(like);

        self.send(request).await?;
        Ok(())
    }

    async fn delete_like(&self, confession_id: ConfessionId, identity: &Identity) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(LIKES_TABLE))
            .query(&like_filter(confession_id, identity));

        self.send(request).await?;
        Ok(())
    }

    async fn list_liked(&self, identity: &Identity) -> Result<Vec<ConfessionId>> {
        let (column, value) = owner_filter(identity);
        let request = self
            .client
            .get(self.table_url(LIKES_TABLE))
            .query(&[("select", "confession_id".to_string()), (column, value)]);

        let rows = self.send(request).await?.json::<Vec<LikedRow>>().await?;
        Ok(rows
            .into_iter()
            .map(|row| ConfessionId::new(row.confession_id))
            .collect())
    }
}

pub fn normalize_rest_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(trimmed) {
        return Err(Error::InvalidInput(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

/// `PostgREST` equality filter scoping rows to one identity column.
fn owner_filter(identity: &Identity) -> (&'static str, String) {
    (
        identity.owner_column(),
        format!("eq.{}", identity.owner_value()),
    )
}

fn like_filter(confession_id: ConfessionId, identity: &Identity) -> [(&'static str, String); 2] {
    [
        ("confession_id", format!("eq.{confession_id}")),
        owner_filter(identity),
    ]
}

#[derive(Debug, Deserialize)]
struct ConfessionRow {
    id: i64,
    text: String,
    created_at: String,
    #[serde(default)]
    likes_count: Option<i64>,
}

impl TryFrom<ConfessionRow> for Confession {
    type Error = Error;

    fn try_from(row: ConfessionRow) -> Result<Self> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|error| {
                Error::Api(format!(
                    "confession {} has invalid created_at '{}': {error}",
                    row.id, row.created_at
                ))
            })?
            .timestamp_millis();
        let like_count = u32::try_from(row.likes_count.unwrap_or(0).max(0)).unwrap_or(u32::MAX);

        Ok(Self {
            id: ConfessionId::new(row.id),
            text: row.text,
            created_at,
            like_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LikedRow {
    confession_id: i64,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn map_api_error(status: StatusCode, body: &str) -> Error {
    let parsed = serde_json::from_str::<PostgrestErrorResponse>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|payload| payload.code.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|payload| payload.message.or(payload.details).or(payload.hint))
        .map_or_else(
            || {
                let trimmed = compact_text(body);
                if trimmed.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    format!("{trimmed} ({})", status.as_u16())
                }
            },
            |message| format!("{} ({})", message.trim(), status.as_u16()),
        );

    if code == FOREIGN_KEY_VIOLATION_CODE {
        Error::NotFound(message)
    } else if status == StatusCode::CONFLICT || code == UNIQUE_VIOLATION_CODE {
        Error::Conflict(message)
    } else {
        Error::Api(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn normalize_rest_url_keeps_existing_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
        assert!(normalize_rest_url("demo.supabase.co").is_err());
        assert!(normalize_rest_url("  ").is_err());
    }

    #[test]
    fn like_filter_scopes_by_single_identity_column() {
        let platform = like_filter(ConfessionId::new(7), &Identity::Platform(1234));
        assert_eq!(
            platform,
            [
                ("confession_id", "eq.7".to_string()),
                ("fid", "eq.1234".to_string()),
            ]
        );

        let generated = like_filter(
            ConfessionId::new(7),
            &Identity::Generated("anon_abc".to_string()),
        );
        assert_eq!(generated[1], ("anonymous_user_id", "eq.anon_abc".to_string()));
    }

    #[test]
    fn confession_row_parses_postgres_timestamp() {
        let rows: Vec<ConfessionRow> = serde_json::from_str(
            r#"[{"id": 7, "text": "hi", "created_at": "2024-05-01T12:00:00.250+00:00", "likes_count": 3}]"#,
        )
        .unwrap();
        let confession: Confession = rows.into_iter().next().unwrap().try_into().unwrap();
        assert_eq!(confession.id, ConfessionId::new(7));
        assert_eq!(confession.like_count, 3);
        assert_eq!(confession.created_at, 1_714_564_800_250);
    }

    #[test]
    fn confession_row_floors_negative_counts() {
        let row = ConfessionRow {
            id: 1,
            text: "x".to_string(),
            created_at: "2024-05-01T12:00:00Z".to_string(),
            likes_count: Some(-2),
        };
        let confession = Confession::try_from(row).unwrap();
        assert_eq!(confession.like_count, 0);
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#;
        let error = map_api_error(StatusCode::CONFLICT, body);
        assert!(matches!(error, Error::Conflict(message) if message.contains("duplicate key")));
    }

    #[test]
    fn foreign_key_violation_maps_to_not_found() {
        let body = r#"{"code":"23503","message":"insert or update on table \"likes\" violates foreign key constraint"}"#;
        let error = map_api_error(StatusCode::CONFLICT, body);
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[test]
    fn other_errors_map_to_api() {
        let error = map_api_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(matches!(error, Error::Api(message) if message == "HTTP 500"));

        let error = map_api_error(StatusCode::BAD_REQUEST, "plain failure");
        assert!(matches!(error, Error::Api(message) if message == "plain failure (400)"));
    }

    #[test]
    fn store_debug_redacts_anon_key() {
        let store = SupabaseStore::new("https://demo.supabase.co", "secret-anon-key").unwrap();
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("secret-anon-key"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
