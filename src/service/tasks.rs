//! Task-source contract and the normalized views built on top of it.

// self
use crate::{
	_prelude::*,
	normalize::{self, Entity, Listing},
	service::ServiceFuture,
};

/// Project of the task source that receives captured tasks by default.
pub const INBOX_PROJECT: &str = "Inbox";

/// Project of the task source.
///
/// Every field defaults so an element missing its id still decodes and is then dropped by the
/// normalizer instead of failing the whole response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	/// Opaque project id.
	#[serde(default)]
	pub id: String,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Whether the owner starred the project.
	#[serde(default)]
	pub is_favorite: bool,
}
impl Entity for Project {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		(!self.id.is_empty()).then(|| Cow::Borrowed(self.id.as_str()))
	}
}

/// Due marker of a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDue {
	/// Calendar date (`YYYY-MM-DD`) or date-time string.
	pub date: String,
}

/// Task of the task source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
	/// Opaque task id.
	#[serde(default)]
	pub id: String,
	/// Task text.
	#[serde(default)]
	pub content: String,
	/// Longer notes attached to the task.
	#[serde(default)]
	pub description: String,
	/// Foreign key to [`Project::id`].
	#[serde(default)]
	pub project_id: Option<String>,
	/// Due marker, when the task has one.
	#[serde(default)]
	pub due: Option<TaskDue>,
}
impl Entity for Task {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		(!self.id.is_empty()).then(|| Cow::Borrowed(self.id.as_str()))
	}
}

/// Remote task source. Answers may be flat, paged, or mixed.
pub trait TaskSource: Send + Sync {
	/// Lists every project.
	fn list_projects(&self) -> ServiceFuture<'_, Vec<Listing<Project>>>;

	/// Lists the tasks matching `query` (for example `overdue | today`).
	fn filter_tasks<'a>(&'a self, query: &'a str) -> ServiceFuture<'a, Vec<Listing<Task>>>;
}

/// Fetches and normalizes every project.
pub async fn fetch_projects(source: &dyn TaskSource) -> Result<Vec<Project>> {
	Ok(normalize::normalize(source.list_projects().await?))
}

/// Fetches and normalizes the tasks matching `query`.
pub async fn fetch_tasks(source: &dyn TaskSource, query: &str) -> Result<Vec<Task>> {
	Ok(normalize::normalize(source.filter_tasks(query).await?))
}

/// Filter for tasks worth scheduling today.
///
/// Overdue and due-today tasks, undated tasks in the inbox, and undated tasks assigned to the
/// owner in favorite projects. Spaces in project names are escaped as `\ `.
pub fn potential_tasks_query(projects: &[Project]) -> String {
	let mut query = format!("overdue | today | (no date & #{INBOX_PROJECT})");
	let favorites = projects
		.iter()
		.filter(|project| project.is_favorite && !project.name.is_empty())
		.map(|project| format!("#{}", project.name.replace(' ', "\\ ")))
		.collect::<Vec<_>>();

	if !favorites.is_empty() {
		query.push_str(&format!(" | (assigned to: me & no date & ({}))", favorites.join(" | ")));
	}

	query
}

/// Fetches projects, then the tasks matching [`potential_tasks_query`].
pub async fn fetch_potential_tasks(source: &dyn TaskSource) -> Result<(Vec<Project>, Vec<Task>)> {
	let projects = fetch_projects(source).await?;
	let tasks = fetch_tasks(source, &potential_tasks_query(&projects)).await?;

	Ok((projects, tasks))
}

/// `project id → project name` lookup.
pub fn project_names(projects: &[Project]) -> HashMap<String, String> {
	normalize::index_by(projects, |project| Some(project.name.clone()))
}

/// One line per task: `- content (description) [project] (Due: date)`.
///
/// The description is omitted when empty.
pub fn describe_tasks(tasks: &[Task], project_names: &HashMap<String, String>) -> String {
	if tasks.is_empty() {
		return "No overdue or due today tasks found.".into();
	}

	tasks
		.iter()
		.map(|task| {
			let project = task
				.project_id
				.as_ref()
				.and_then(|id| project_names.get(id))
				.map(|name| format!(" [{name}]"))
				.unwrap_or_default();
			let description = if task.description.is_empty() {
				String::new()
			} else {
				format!(" ({})", task.description)
			};
			let due = task.due.as_ref().map_or("No due date", |due| due.date.as_str());

			format!("- {}{description}{project} (Due: {due})", task.content)
		})
		.collect::<Vec<_>>()
		.join("\n")
}
