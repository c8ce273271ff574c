//! Flattens inconsistently shaped list responses into one deduplicated entity sequence.
//!
//! Remote list APIs answer with a flat list of entities, a list of pages, or a mix of both.
//! [`Listing`] models one top-level element of such a response. Normalizing unwraps exactly
//! one level of nesting, keeps the first occurrence of every id in encounter order, and drops
//! elements without an id with a [`MalformedResponse`] diagnostic.

// self
use crate::{_prelude::*, obs::events};

/// Anything with a stable identity key.
pub trait Entity {
	/// Identity key, or `None` when the element carries none.
	fn entity_id(&self) -> Option<Cow<'_, str>>;

	/// Returns `true` when the element is itself a list (nesting deeper than one level).
	fn is_nested(&self) -> bool {
		false
	}
}
impl Entity for Value {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		match self.get("id")? {
			Value::String(id) if !id.is_empty() => Some(Cow::Borrowed(id)),
			Value::Number(id) => Some(Cow::Owned(id.to_string())),
			_ => None,
		}
	}

	fn is_nested(&self) -> bool {
		self.is_array()
	}
}

/// One top-level element of a list response: a page of entities or a bare entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
	/// A page (sequence) of entities.
	Page(Vec<T>),
	/// A single entity.
	Single(T),
}
impl<T> Listing<T> {
	/// Entities carried by this element, in order.
	pub fn into_entities(self) -> Vec<T> {
		match self {
			Listing::Page(entities) => entities,
			Listing::Single(entity) => vec![entity],
		}
	}
}
impl<T> From<T> for Listing<T> {
	fn from(entity: T) -> Self {
		Listing::Single(entity)
	}
}

/// Local diagnostic for a list element that could not be used.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum MalformedResponse {
	/// Element has no identity key.
	#[error("element #{position} has no id and was dropped")]
	MissingIdentity {
		/// Position in the flattened sequence.
		position: usize,
	},
	/// Element is still a list after flattening one level.
	#[error("element #{position} is nested more than one level deep and was dropped")]
	NestedTooDeep {
		/// Position in the flattened sequence.
		position: usize,
	},
}

/// Normalized entities plus the diagnostics produced on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizeReport<T> {
	/// Deduplicated entities in first-seen order.
	pub entities: Vec<T>,
	/// Dropped elements, in encounter order.
	pub diagnostics: Vec<MalformedResponse>,
}

/// Flattens, deduplicates, and filters `listings`.
pub fn normalize<T, I>(listings: I) -> Vec<T>
where
	T: Entity,
	I: IntoIterator<Item = Listing<T>>,
{
	normalize_report(listings).entities
}

/// Like [`normalize`] but also returns the diagnostics for dropped elements.
pub fn normalize_report<T, I>(listings: I) -> NormalizeReport<T>
where
	T: Entity,
	I: IntoIterator<Item = Listing<T>>,
{
	let mut seen = HashSet::new();
	let mut entities = Vec::new();
	let mut diagnostics = Vec::new();

	for (position, element) in listings.into_iter().flat_map(Listing::into_entities).enumerate() {
		let Some(id) = element.entity_id().map(Cow::into_owned) else {
			let diagnostic = if element.is_nested() {
				MalformedResponse::NestedTooDeep { position }
			} else {
				MalformedResponse::MissingIdentity { position }
			};

			events::malformed_response(&diagnostic);
			diagnostics.push(diagnostic);

			continue;
		};

		if seen.insert(id) {
			entities.push(element);
		}
	}

	NormalizeReport { entities, diagnostics }
}

/// Normalizes a raw JSON response.
///
/// A top-level array is a list of listings, a top-level object is a one-element list, and
/// `null` is empty.
pub fn normalize_value(raw: Value) -> Vec<Value> {
	normalize_value_report(raw).entities
}

/// Like [`normalize_value`] but also returns the diagnostics for dropped elements.
pub fn normalize_value_report(raw: Value) -> NormalizeReport<Value> {
	let listings = match raw {
		Value::Null => Vec::new(),
		Value::Array(items) => items.into_iter().map(listing_from_value).collect(),
		other => vec![Listing::Single(other)],
	};

	normalize_report(listings)
}

/// Builds an `id → attribute` lookup; the first entity wins for duplicate ids.
///
/// Entities without an id, or for which `attr` returns `None`, are skipped.
pub fn index_by<'a, T, V, F>(entities: impl IntoIterator<Item = &'a T>, attr: F) -> HashMap<String, V>
where
	T: 'a + Entity,
	F: Fn(&T) -> Option<V>,
{
	let mut index = HashMap::new();

	for entity in entities {
		let Some(id) = entity.entity_id() else { continue };

		if index.contains_key(id.as_ref()) {
			continue;
		}
		if let Some(value) = attr(entity) {
			index.insert(id.into_owned(), value);
		}
	}

	index
}

fn listing_from_value(value: Value) -> Listing<Value> {
	match value {
		Value::Array(page) => Listing::Page(page),
		other => Listing::Single(other),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn numeric_and_string_ids_are_recognized() {
		assert_eq!(json!({ "id": "a" }).entity_id().as_deref(), Some("a"));
		assert_eq!(json!({ "id": 42 }).entity_id().as_deref(), Some("42"));
		assert_eq!(json!({ "id": "" }).entity_id(), None);
		assert_eq!(json!({ "name": "x" }).entity_id(), None);
		assert_eq!(json!([{ "id": "a" }]).entity_id(), None);
	}

	#[test]
	fn untagged_listing_accepts_pages_and_entities() {
		let listings: Vec<Listing<Value>> =
			serde_json::from_value(json!([[{ "id": "a" }], { "id": "b" }]))
				.expect("Mixed listings should deserialize.");

		assert!(matches!(listings[0], Listing::Page(_)));
		assert!(matches!(listings[1], Listing::Single(_)));
	}

	#[test]
	fn deep_nesting_and_missing_ids_are_reported() {
		let report = normalize_value_report(json!([
			[{ "id": "a" }, [{ "id": "deep" }]],
			{ "title": "no id" },
			{ "id": "a" }
		]));

		assert_eq!(report.entities, vec![json!({ "id": "a" })]);
		assert_eq!(
			report.diagnostics,
			vec![
				MalformedResponse::NestedTooDeep { position: 1 },
				MalformedResponse::MissingIdentity { position: 2 },
			]
		);
	}

	#[test]
	fn scalar_shapes_are_tolerated() {
		assert!(normalize_value(Value::Null).is_empty());
		assert_eq!(normalize_value(json!({ "id": "x" })), vec![json!({ "id": "x" })]);
		assert!(normalize_value(json!([])).is_empty());
	}

	#[test]
	fn index_by_keeps_first_attribute_per_id() {
		let entities = [
			json!({ "id": "p1", "name": "Inbox" }),
			json!({ "id": "p2" }),
			json!({ "id": "p1", "name": "Shadow" }),
			json!({ "name": "Orphan" }),
		];
		let index = index_by(&entities, |entity| {
			entity.get("name").and_then(Value::as_str).map(str::to_owned)
		});

		assert_eq!(index.len(), 1);
		assert_eq!(index.get("p1").map(String::as_str), Some("Inbox"));
	}
}
