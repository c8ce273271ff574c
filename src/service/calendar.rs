//! Capability-scoped calendar client and request signing.
//!
//! [`authorize_capabilities`] refuses credentials whose scopes do not cover the requested
//! [`Capability`] set, so a client can only be built for what the identity granted.
//! [`RequestSigner`] is the seam that attaches a credential to an outbound request.
//! Paged list answers are followed to the last page and normalized once.

// crates.io
use time::Date;
#[cfg(feature = "reqwest")]
use time::UtcOffset;
// self
use crate::{
	_prelude::*,
	auth::{Capability, Credential},
	normalize::Entity,
};
#[cfg(feature = "reqwest")]
use crate::{
	normalize::{self, Listing},
	obs::events,
	service::api::ApiClient,
};

/// Default base URL of the calendar API.
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3/";
/// Id alias of the account's primary calendar.
pub const PRIMARY_CALENDAR: &str = "primary";
/// Name of the calendar the assistant writes its own events to.
pub const ASSISTANT_CALENDAR: &str = "secretary_bot";
/// Characters of an event description kept by [`describe_day`].
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Attaches a credential to an outbound request without constraining the HTTP client type.
pub trait RequestSigner<Request, E>
where
	Self: Send + Sync,
{
	/// Consumes the request and returns it with authorization state derived from `credential`.
	fn attach_token(&self, request: Request, credential: &Credential) -> Result<Request, E>;
}

/// Signer adding `Authorization: Bearer <access token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSigner<reqwest::RequestBuilder, Error> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		credential: &Credential,
	) -> Result<reqwest::RequestBuilder> {
		if credential.access_token.is_empty() {
			return Err(Error::InvalidGrant { reason: "Credential carries no access token".into() });
		}

		Ok(request.bearer_auth(credential.access_token.expose()))
	}
}

/// Fails with [`Error::InsufficientScope`] unless `credential` covers every capability.
pub fn authorize_capabilities(credential: &Credential, capabilities: &[Capability]) -> Result<()> {
	let required = Capability::scope_set(capabilities);

	if credential.covers(&required) {
		return Ok(());
	}

	Err(Error::InsufficientScope {
		reason: format!("credential lacks [{}]", credential.scopes.missing(&required).join(" ")),
	})
}

/// Start or end of an event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
	/// RFC 3339 instant for timed events.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date_time: Option<String>,
	/// `YYYY-MM-DD` for all-day events.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub date: Option<String>,
	/// IANA time zone name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_zone: Option<String>,
}
impl EventTime {
	/// Timed instant in UTC.
	pub fn utc(date_time: impl Into<String>) -> Self {
		Self { date_time: Some(date_time.into()), date: None, time_zone: Some("UTC".into()) }
	}

	/// `dateTime`, else `date`, else empty; used for ordering and display.
	pub fn sort_key(&self) -> &str {
		self.date_time.as_deref().or(self.date.as_deref()).unwrap_or_default()
	}
}

/// Calendar event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
	/// Opaque event id, assigned by the server.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	/// Title.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	/// Free-form description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Location.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	/// Start.
	#[serde(default)]
	pub start: EventTime,
	/// End.
	#[serde(default)]
	pub end: EventTime,
	/// Link to the event in the web UI.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub html_link: Option<String>,
}
impl Entity for CalendarEvent {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		self.id.as_deref().filter(|id| !id.is_empty()).map(Cow::Borrowed)
	}
}

/// Calendar (or calendar-list entry) resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
	/// Opaque calendar id.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub id: String,
	/// Display name.
	#[serde(default)]
	pub summary: String,
	/// IANA time zone name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub time_zone: Option<String>,
}
impl Entity for CalendarEntry {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		(!self.id.is_empty()).then(|| Cow::Borrowed(self.id.as_str()))
	}
}

/// Builder for [`CalendarClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct CalendarClientBuilder {
	base_url: Option<Url>,
	http_client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl CalendarClientBuilder {
	/// Overrides the API base URL (must end with `/`).
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Reuses an existing reqwest client.
	pub fn with_http_client(mut self, http_client: ReqwestClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Builds a client for `credential`, restricted to `capabilities`.
	pub fn build(self, credential: &Credential, capabilities: &[Capability]) -> Result<CalendarClient> {
		let api = ApiClient::new(
			self.http_client,
			self.base_url,
			DEFAULT_CALENDAR_BASE_URL,
			credential,
			capabilities,
		)?;

		Ok(CalendarClient { api })
	}
}

/// Calendar client bound to one credential.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct CalendarClient {
	api: ApiClient,
}
#[cfg(feature = "reqwest")]
impl CalendarClient {
	/// Returns a builder with the default base URL.
	pub fn builder() -> CalendarClientBuilder {
		CalendarClientBuilder::default()
	}

	/// Lists single events of `calendar_id` ordered by start time, optionally within a window.
	///
	/// Every page is fetched before the combined answer is normalized.
	pub async fn list_events(
		&self,
		calendar_id: &str,
		window: Option<(OffsetDateTime, OffsetDateTime)>,
	) -> Result<Vec<CalendarEvent>> {
		let url = self.api.endpoint(&["calendars", calendar_id, "events"])?;
		let mut query = vec![
			("singleEvents".to_owned(), "true".to_owned()),
			("orderBy".to_owned(), "startTime".to_owned()),
		];

		if let Some((start, end)) = window {
			query.push(("timeMin".to_owned(), format_instant(start)?));
			query.push(("timeMax".to_owned(), format_instant(end)?));
		}

		Ok(normalize::normalize(self.api.collect_pages(url, &query).await?))
	}

	/// Events of `date` (local midnight to the next midnight at `offset`) from the primary
	/// calendar and, when given, one more calendar, merged and ordered by start.
	pub async fn events_for_day(
		&self,
		date: Date,
		offset: UtcOffset,
		extra_calendar: Option<&str>,
	) -> Result<Vec<CalendarEvent>> {
		let start = date.midnight().assume_offset(offset);
		let window = (start, start + Duration::DAY);
		let mut calendars = vec![PRIMARY_CALENDAR];

		if let Some(extra) = extra_calendar.filter(|id| *id != PRIMARY_CALENDAR) {
			calendars.push(extra);
		}

		let mut listings = Vec::new();

		for calendar_id in calendars {
			listings.extend(self.list_events(calendar_id, Some(window)).await?.into_iter().map(Listing::from));
		}

		let mut day = normalize::normalize(listings);

		day.sort_by(|a, b| a.start.sort_key().cmp(b.start.sort_key()));

		Ok(day)
	}

	/// Returns the id of the calendar named `summary`, creating it when no calendar of the
	/// account carries that name.
	///
	/// New calendars take the primary calendar's time zone, or `UTC` when it cannot be read.
	pub async fn find_or_create_calendar(&self, summary: &str) -> Result<String> {
		let url = self.api.endpoint(&["users", "me", "calendarList"])?;
		let entries: Vec<CalendarEntry> = normalize::normalize(self.api.collect_pages(url, &[]).await?);

		if let Some(entry) = entries.into_iter().find(|entry| entry.summary == summary) {
			return Ok(entry.id);
		}

		let time_zone = match self.calendar(PRIMARY_CALENDAR).await {
			Ok(primary) => primary.time_zone,
			Err(e) => {
				events::calendar_time_zone_fallback(&e);

				None
			},
		};
		let body = CalendarEntry {
			id: String::new(),
			summary: summary.to_owned(),
			time_zone: Some(time_zone.unwrap_or_else(|| "UTC".into())),
		};
		let url = self.api.endpoint(&["calendars"])?;
		let created: CalendarEntry = self.api.send_json(self.api.http().post(url).json(&body)).await?;

		if created.id.is_empty() {
			return Err(Error::FatalApi {
				message: format!("created calendar `{summary}` came back without an id"),
				status: None,
			});
		}

		Ok(created.id)
	}

	/// Fetches the calendar resource `calendar_id`.
	pub async fn calendar(&self, calendar_id: &str) -> Result<CalendarEntry> {
		let url = self.api.endpoint(&["calendars", calendar_id])?;

		self.api.send_json(self.api.http().get(url)).await
	}

	/// Inserts `event` into `calendar_id` and returns the stored event.
	pub async fn insert_event(
		&self,
		calendar_id: &str,
		event: &CalendarEvent,
	) -> Result<CalendarEvent> {
		let url = self.api.endpoint(&["calendars", calendar_id, "events"])?;

		self.api.send_json(self.api.http().post(url).json(event)).await
	}

	/// Deletes `event_id` from `calendar_id`.
	pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<()> {
		let url = self.api.endpoint(&["calendars", calendar_id, "events", event_id])?;

		self.api.send(self.api.http().delete(url)).await.map(|_| ())
	}
}

/// Plain-text day view: summary, start, end, location, and a description cut at
/// [`DESCRIPTION_PREVIEW_CHARS`] characters.
pub fn describe_day(date: Date, events: &[CalendarEvent]) -> String {
	if events.is_empty() {
		return format!("No events found for {date}.");
	}

	let mut out = format!("Events for {date}:\n");

	for event in events {
		out.push_str(&format!("- {}\n", event.summary.as_deref().unwrap_or("No Title")));
		out.push_str(&format!("  Start: {}\n", event.start.sort_key()));
		out.push_str(&format!("  End: {}\n", event.end.sort_key()));

		if let Some(location) = event.location.as_deref().filter(|location| !location.is_empty()) {
			out.push_str(&format!("  Location: {location}\n"));
		}
		if let Some(description) =
			event.description.as_deref().filter(|description| !description.is_empty())
		{
			let preview = if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
				format!("{}...", description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect::<String>())
			} else {
				description.to_owned()
			};

			out.push_str(&format!("  Description: {preview}\n"));
		}

		out.push('\n');
	}

	out
}

#[cfg(feature = "reqwest")]
fn format_instant(instant: OffsetDateTime) -> Result<String> {
	instant.format(&time::format_description::well_known::Rfc3339).map_err(|e| Error::FatalApi {
		message: format!("instant cannot be formatted: {e}"),
		status: None,
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ScopeSet;

	fn credential(scopes: &[&str]) -> Credential {
		Credential::builder(
			Url::parse("https://oauth2.googleapis.com/token").expect("Token URI should parse."),
			"client",
			"secret",
			ScopeSet::new(scopes.iter().copied()).expect("Scope fixture should be valid."),
		)
		.access_token("ya29.token")
		.build()
		.expect("Credential fixture should build.")
	}

	#[test]
	fn capabilities_must_be_covered() {
		let calendar_only = credential(&[Capability::Calendar.scope()]);

		assert!(authorize_capabilities(&calendar_only, &[Capability::Calendar]).is_ok());

		let err = authorize_capabilities(&calendar_only, &[Capability::Calendar, Capability::MailReadonly])
			.expect_err("Missing mail scope should be rejected.");

		assert!(
			matches!(err, Error::InsufficientScope { ref reason } if reason.contains("gmail.readonly"))
		);
	}

	#[test]
	fn day_view_lists_details_and_truncates_descriptions() {
		let date = time::macros::date!(2025 - 04 - 14);
		let events = [
			CalendarEvent {
				summary: Some("Standup".into()),
				start: EventTime::utc("2025-04-14T09:00:00Z"),
				end: EventTime::utc("2025-04-14T09:15:00Z"),
				location: Some("Room 4".into()),
				description: Some("x".repeat(120)),
				..Default::default()
			},
			CalendarEvent {
				start: EventTime { date: Some("2025-04-14".into()), ..Default::default() },
				end: EventTime { date: Some("2025-04-15".into()), ..Default::default() },
				..Default::default()
			},
		];
		let view = describe_day(date, &events);

		assert_eq!(
			view,
			format!(
				"Events for 2025-04-14:\n- Standup\n  Start: 2025-04-14T09:00:00Z\n  End: 2025-04-14T09:15:00Z\n  Location: Room 4\n  Description: {}...\n\n- No Title\n  Start: 2025-04-14\n  End: 2025-04-15\n\n",
				"x".repeat(DESCRIPTION_PREVIEW_CHARS)
			)
		);
		assert_eq!(describe_day(date, &[]), "No events found for 2025-04-14.");
	}

	#[test]
	fn events_serialize_in_api_casing() {
		let event = CalendarEvent {
			summary: Some("Deep work".into()),
			start: EventTime::utc("2025-01-01T09:00:00Z"),
			end: EventTime::utc("2025-01-01T10:00:00Z"),
			..Default::default()
		};
		let json = serde_json::to_value(&event).expect("Event should serialize.");

		assert_eq!(json["start"]["dateTime"], "2025-01-01T09:00:00Z");
		assert_eq!(json["start"]["timeZone"], "UTC");
		assert!(json.get("id").is_none());
		assert!(json.get("htmlLink").is_none());
	}
}
