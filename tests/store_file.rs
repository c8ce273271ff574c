// std
use std::{fs, path::PathBuf};
// crates.io
use time::{Duration, macros};
// self
use agenda_broker::{
	auth::{Credential, IdentityId, ScopeSet},
	store::{CredentialStore, FileStore, MemoryStore, StoreError},
	url::Url,
};

fn identity(value: &str) -> IdentityId {
	IdentityId::new(value).expect("Identity fixture should be valid.")
}

fn build_credential(access: &str, refresh: Option<&str>) -> Credential {
	let scope = ScopeSet::new(["https://www.googleapis.com/auth/calendar"])
		.expect("Scope fixture should be valid.");
	let issued = macros::datetime!(2025-11-10 12:00 UTC);
	let mut builder = Credential::builder(
		Url::parse("https://oauth2.googleapis.com/token").expect("Token URI fixture should parse."),
		"client-store",
		"secret-store",
		scope,
	)
	.access_token(access)
	.issued_at(issued)
	.expires_in(Duration::hours(1));

	if let Some(value) = refresh {
		builder = builder.refresh_token(value);
	}

	builder.build().expect("Credential fixture should build successfully.")
}

fn scratch_dir(name: &str) -> PathBuf {
	let dir =
		std::env::temp_dir().join(format!("agenda-broker-store-{}-{name}", std::process::id()));
	let _ = fs::remove_dir_all(&dir);

	dir
}

async fn exercise_contract(store: &dyn CredentialStore) {
	let alice = identity("alice");

	assert_eq!(store.load(&alice).await.expect("Loading an absent record should succeed."), None);

	let first = build_credential("access-1", Some("refresh-1"));

	store.save(&alice, &first).await.expect("Saving a record should succeed.");

	assert_eq!(store.load(&alice).await.expect("Loading should succeed."), Some(first));

	// A save fully replaces the prior record, including dropping its refresh token.
	let second = build_credential("access-2", None);

	store.save(&alice, &second).await.expect("Replacing a record should succeed.");

	assert_eq!(store.load(&alice).await.expect("Loading should succeed."), Some(second));
	assert!(store.delete(&alice).await.expect("Deleting should succeed."));
	assert!(!store.delete(&alice).await.expect("Deleting twice should succeed."));
	assert_eq!(store.load(&alice).await.expect("Loading after delete should succeed."), None);
}

#[tokio::test]
async fn memory_store_honors_the_contract() {
	exercise_contract(&MemoryStore::default()).await;
}

#[tokio::test]
async fn file_store_honors_the_contract() {
	let dir = scratch_dir("contract");

	exercise_contract(&FileStore::new(&dir)).await;

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn records_are_isolated_per_identity() {
	let dir = scratch_dir("isolation");
	let store = FileStore::new(&dir);
	let user = identity("user");
	let admin = identity("admin");

	store.save(&user, &build_credential("user-access", None)).await.expect("Save should succeed.");
	store.save(&admin, &build_credential("admin-access", None)).await.expect("Save should succeed.");

	assert!(store.path_for(&user).ends_with("token_user.json"));
	assert!(store.path_for(&admin).exists());

	let loaded = store
		.load(&user)
		.await
		.expect("Load should succeed.")
		.expect("User record should exist.");

	assert_eq!(loaded.access_token.expose(), "user-access");

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn identities_that_sanitize_alike_keep_separate_records() {
	let dir = scratch_dir("collide");
	let store = FileStore::new(&dir);
	let dotted = identity("alice@example.com");
	let plain = identity("aliceexample.com");

	assert_ne!(store.path_for(&dotted), store.path_for(&plain));

	store.save(&dotted, &build_credential("alice-access", None)).await.expect("Save should succeed.");

	assert_eq!(store.load(&plain).await.expect("Load should succeed."), None);

	store.save(&plain, &build_credential("plain-access", None)).await.expect("Save should succeed.");

	let loaded = store
		.load(&dotted)
		.await
		.expect("Load should succeed.")
		.expect("Dotted record should exist.");

	assert_eq!(loaded.access_token.expose(), "alice-access");

	for symbols in ["@@", "##"] {
		store
			.save(&identity(symbols), &build_credential(symbols, None))
			.await
			.expect("Save should succeed.");
	}

	let loaded = store
		.load(&identity("@@"))
		.await
		.expect("Load should succeed.")
		.expect("Symbol-only record should exist.");

	assert_eq!(loaded.access_token.expose(), "@@");

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn corrupt_documents_are_serialization_errors() {
	let dir = scratch_dir("corrupt");
	let store = FileStore::new(&dir);
	let bob = identity("bob");

	fs::create_dir_all(&dir).expect("Scratch directory should be creatable.");
	fs::write(store.path_for(&bob), br#"{"access_token": 42}"#).expect("Fixture should be written.");

	let err = store.load(&bob).await.expect_err("Corrupt documents must be rejected.");

	assert!(matches!(err, StoreError::Serialization { ref message } if message.contains("access_token")), "{err:?}");

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn legacy_documents_load() {
	let dir = scratch_dir("legacy");
	let store = FileStore::new(&dir);
	let carol = identity("carol@example.com");

	fs::create_dir_all(&dir).expect("Scratch directory should be creatable.");
	fs::write(
		store.path_for(&carol),
		r#"{
			"token": "legacy-access",
			"refresh_token": "legacy-refresh",
			"token_uri": "https://oauth2.googleapis.com/token",
			"client_id": "client",
			"client_secret": "secret",
			"scopes": ["https://www.googleapis.com/auth/calendar"],
			"expiry": "2025-01-01T00:00:00.000000Z"
		}"#,
	)
	.expect("Fixture should be written.");

	let loaded = store
		.load(&carol)
		.await
		.expect("Legacy documents should parse.")
		.expect("Legacy record should exist.");

	let file_name = store.path_for(&carol);
	let file_name = file_name.file_name().and_then(|name| name.to_str()).expect("Path should have a file name.");

	assert!(file_name.starts_with("token_carolexamplecom."), "{file_name}");
	assert_eq!(loaded.access_token.expose(), "legacy-access");
	assert_eq!(loaded.expiry, Some(macros::datetime!(2025-01-01 00:00 UTC)));

	let _ = fs::remove_dir_all(&dir);
}
