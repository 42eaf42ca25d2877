//! Microsoft Graph `calendarView` client

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::{MeetingSource, TokenProvider};
use crate::config::CalendarConfig;
use crate::http::{build_client, check_status};
use crate::models::{Meeting, MeetingWindow};
use crate::{MorningBotError, Result};

const GRAPH_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Stop following `@odata.nextLink` after this many pages
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct EventPage {
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    #[serde(default)]
    subject: Option<String>,
    start: GraphDateTime,
    end: GraphDateTime,
    #[serde(default)]
    is_cancelled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
}

/// Reads the signed-in user's default calendar
pub struct GraphCalendar {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl GraphCalendar {
    pub fn new(config: &CalendarConfig, tokens: Arc<dyn TokenProvider>, timeout_seconds: u32) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_seconds)?,
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn calendar_view_url(&self, window: &MeetingWindow) -> String {
        format!(
            "{}/me/calendarView?startDateTime={}&endDateTime={}&$select=subject,start,end,isCancelled&$orderby=start/dateTime&$top=50",
            self.base_url,
            urlencoding::encode(&local_to_utc_string(window.start)),
            urlencoding::encode(&local_to_utc_string(window.end)),
        )
    }

    async fn fetch_page(&self, url: String, access_token: &str) -> Result<EventPage> {
        debug!("Graph request URL: {url}");
        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .send()
            .await?;
        let response = check_status(response, "Microsoft Graph", started).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl MeetingSource for GraphCalendar {
    #[instrument(skip(self), fields(start = %window.start, end = %window.end))]
    async fn meetings(&self, window: &MeetingWindow) -> Result<Vec<Meeting>> {
        let access_token = self.tokens.token().await?.into_access_token()?;
        collect_pages(self.calendar_view_url(window), |url| {
            self.fetch_page(url, &access_token)
        })
        .await
    }
}

/// Follow `@odata.nextLink` from `first_url`, dropping cancelled events
async fn collect_pages<F, Fut>(first_url: String, mut fetch_page: F) -> Result<Vec<Meeting>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<EventPage>>,
{
    let mut meetings = Vec::new();
    let mut next = Some(first_url);
    let mut pages = 0;
    while let Some(url) = next.take() {
        if pages == MAX_PAGES {
            return Err(MorningBotError::api(format!(
                "Microsoft Graph returned more than {MAX_PAGES} pages of events"
            )));
        }
        pages += 1;

        let page = fetch_page(url).await?;
        for event in page.value.into_iter().filter(|e| !e.is_cancelled) {
            meetings.push(to_meeting(event)?);
        }
        next = page.next_link;
    }

    info!("Retrieved {} calendar events in {pages} page(s)", meetings.len());
    Ok(meetings)
}

fn to_meeting(event: GraphEvent) -> Result<Meeting> {
    Ok(Meeting::new(
        event.subject.unwrap_or_default(),
        utc_to_local(parse_graph_datetime(&event.start.date_time)?),
        utc_to_local(parse_graph_datetime(&event.end.date_time)?),
    ))
}

/// Graph sends `2026-10-17T09:00:00.0000000` without an offset
fn parse_graph_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, GRAPH_DATETIME_FORMAT)
        .map_err(|e| MorningBotError::parse(format!("invalid Graph dateTime '{value}': {e}")))
}

fn utc_to_local(utc: NaiveDateTime) -> NaiveDateTime {
    Utc.from_utc_datetime(&utc).with_timezone(&Local).naive_local()
}

fn local_to_utc_string(local: NaiveDateTime) -> String {
    let utc = Local
        .from_local_datetime(&local)
        .earliest()
        .map_or_else(|| local.and_utc(), |dt| dt.with_timezone(&Utc));
    utc.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
