//! Notion task adapter.
//!
//! Each user gets one workspace page and one "Anvik Tasks" database under
//! it, created lazily on the first task. Both ids are cached on the user.
//! Provisioning is single-flight per user: a second caller waits, re-reads
//! the user and reuses what the first caller created.

use std::sync::Arc;

use anvik_core::datetime::{parse_date, parse_timezone, resolve_due_date};
use anvik_core::OAuthClient;
use anvik_models::{ChatId, NewTask, Task, TaskStatus, TaskUpdates, User};
use anvik_persistence::UserStore;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{error, info};
use url::Url;

use crate::error::{json_or_error, IntegrationError, Result};
use crate::locks::KeyedLocks;

/// Notion REST API root.
pub const NOTION_API_URL: &str = "https://api.notion.com/v1";

/// API version pinned on every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Title of the per-user task database.
pub const DATABASE_TITLE: &str = "Anvik Tasks";

/// Prefix that marks a Notion OAuth `state`.
pub const STATE_PREFIX: &str = "notion:";

const NOT_CONNECTED: &str = "🔗 Please connect Notion first using \"connect notion\" or /notion_token";

/// Notion endpoints used by the adapter.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// Creates the top-level workspace page; returns its id.
    async fn create_workspace_page(&self, token: &str) -> Result<String>;

    /// Creates the task database under `parent_page_id`; returns its id.
    async fn create_task_database(&self, token: &str, parent_page_id: &str) -> Result<String>;

    /// Inserts one row; returns the page id.
    async fn create_task_page(&self, token: &str, database_id: &str, task: &NewTask) -> Result<String>;

    /// All rows, due date ascending.
    async fn query_tasks(&self, token: &str, database_id: &str) -> Result<Vec<Task>>;

    /// Writes the present fields of `updates`.
    async fn update_task_page(&self, token: &str, page_id: &str, updates: &TaskUpdates) -> Result<()>;

    /// Archives (deletes) a page.
    async fn archive_page(&self, token: &str, page_id: &str) -> Result<()>;
}

fn rich_text(content: &str) -> Value {
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Property payload for a new row.
pub fn task_properties(task: &NewTask) -> Value {
    json!({
        "Title": { "title": rich_text(&task.title) },
        "Description": { "rich_text": rich_text(&task.description) },
        "DueDate": { "date": { "start": task.due_date.format("%Y-%m-%d").to_string() } },
        "Status": { "select": { "name": task.status.as_str() } },
    })
}

/// Property payload holding only the fields present in `updates`.
pub fn update_properties(updates: &TaskUpdates) -> Value {
    let mut props = Map::new();
    if let Some(title) = &updates.title {
        props.insert("Title".into(), json!({ "title": rich_text(title) }));
    }
    if let Some(description) = &updates.description {
        props.insert("Description".into(), json!({ "rich_text": rich_text(description) }));
    }
    if let Some(due) = updates.due_date {
        props.insert(
            "DueDate".into(),
            json!({ "date": { "start": due.format("%Y-%m-%d").to_string() } }),
        );
    }
    if let Some(status) = updates.status {
        props.insert("Status".into(), json!({ "select": { "name": status.as_str() } }));
    }
    Value::Object(props)
}

/// Reads a database row back into a [`Task`].
pub fn task_from_page(page: &Value) -> Option<Task> {
    let id = page["id"].as_str()?.to_string();
    let props = &page["properties"];
    let title = props["Title"]["title"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["plain_text"].as_str().or_else(|| p["text"]["content"].as_str()))
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled Task".to_string());
    Some(Task {
        id,
        title,
        due_date: props["DueDate"]["date"]["start"].as_str().map(String::from),
        status: props["Status"]["select"]["name"].as_str().map(String::from),
    })
}

/// Builds [`TaskUpdates`] from a model-supplied `updates` object.
///
/// Unrecognised statuses and dates are dropped.
pub fn updates_from_details(updates: &Map<String, Value>, today: NaiveDate) -> TaskUpdates {
    let text = |key: &str| {
        updates
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    TaskUpdates {
        title: text("title").map(String::from),
        description: text("description").map(String::from),
        due_date: text("due_date")
            .or_else(|| text("dueDate"))
            .and_then(|d| parse_date(d, today)),
        status: text("status").and_then(TaskStatus::parse_loose),
    }
}

/// Numbered task list for a chat reply.
pub fn format_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "📭 No tasks found.".to_string();
    }
    let mut out = String::from("📋 *Your Tasks:*\n\n");
    for (i, task) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "{}. *{}*\n   📅 {} | 🏷 {}\n   🆔 {}\n\n",
            i + 1,
            task.title,
            task.due_date.as_deref().unwrap_or("no date"),
            task.status.as_deref().unwrap_or(TaskStatus::ToDo.as_str()),
            task.id,
        ));
    }
    out.trim_end().to_string()
}

/// [`NotionApi`] over HTTPS.
pub struct HttpNotionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotionApi {
    pub fn new() -> Self {
        Self::with_base_url(NOTION_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value> {
        json_or_error("Notion", builder.send().await?).await
    }
}

impl Default for HttpNotionApi {
    fn default() -> Self {
        Self::new()
    }
}

fn id_of(value: &Value) -> Result<String> {
    value["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| IntegrationError::Provider {
            service: "Notion",
            status: 200,
            body: "response has no id".to_string(),
        })
}

#[async_trait]
impl NotionApi for HttpNotionApi {
    async fn create_workspace_page(&self, token: &str) -> Result<String> {
        let body = json!({
            "parent": { "type": "workspace", "workspace": true },
            "icon": { "type": "emoji", "emoji": "🧠" },
            "properties": { "title": { "title": rich_text("Anvik Workspace") } },
            "children": [{
                "object": "block",
                "type": "heading_1",
                "heading_1": { "rich_text": rich_text("Welcome to your Anvik Workspace 👋") }
            }]
        });
        let page = self
            .send(self.request(reqwest::Method::POST, "/pages", token).json(&body))
            .await?;
        id_of(&page)
    }

    async fn create_task_database(&self, token: &str, parent_page_id: &str) -> Result<String> {
        let options: Vec<Value> = TaskStatus::ALL
            .iter()
            .map(|s| json!({ "name": s.as_str() }))
            .collect();
        let body = json!({
            "parent": { "type": "page_id", "page_id": parent_page_id },
            "title": rich_text(DATABASE_TITLE),
            "properties": {
                "Title": { "title": {} },
                "Description": { "rich_text": {} },
                "DueDate": { "date": {} },
                "Status": { "select": { "options": options } }
            }
        });
        let db = self
            .send(self.request(reqwest::Method::POST, "/databases", token).json(&body))
            .await?;
        id_of(&db)
    }

    async fn create_task_page(&self, token: &str, database_id: &str, task: &NewTask) -> Result<String> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": task_properties(task),
        });
        let page = self
            .send(self.request(reqwest::Method::POST, "/pages", token).json(&body))
            .await?;
        id_of(&page)
    }

    async fn query_tasks(&self, token: &str, database_id: &str) -> Result<Vec<Task>> {
        let body = json!({
            "sorts": [{ "property": "DueDate", "direction": "ascending" }]
        });
        let path = format!("/databases/{}/query", database_id);
        let result = self
            .send(self.request(reqwest::Method::POST, &path, token).json(&body))
            .await?;
        Ok(result["results"]
            .as_array()
            .map(|rows| rows.iter().filter_map(task_from_page).collect())
            .unwrap_or_default())
    }

    async fn update_task_page(&self, token: &str, page_id: &str, updates: &TaskUpdates) -> Result<()> {
        let body = json!({ "properties": update_properties(updates) });
        let path = format!("/pages/{}", page_id);
        self.send(self.request(reqwest::Method::PATCH, &path, token).json(&body))
            .await?;
        Ok(())
    }

    async fn archive_page(&self, token: &str, page_id: &str) -> Result<()> {
        let path = format!("/pages/{}", page_id);
        self.send(
            self.request(reqwest::Method::PATCH, &path, token)
                .json(&json!({ "archived": true })),
        )
        .await?;
        Ok(())
    }
}

/// Public-integration OAuth for Notion.
pub struct NotionOAuth {
    client: Option<OAuthClient>,
    http: reqwest::Client,
    base_url: String,
    users: Arc<UserStore>,
}

impl NotionOAuth {
    pub fn new(client: Option<OAuthClient>, users: Arc<UserStore>) -> Self {
        Self {
            client,
            http: reqwest::Client::new(),
            base_url: NOTION_API_URL.to_string(),
            users,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    fn registration(&self) -> Result<&OAuthClient> {
        self.client
            .as_ref()
            .ok_or(IntegrationError::NotConfigured("Notion"))
    }

    /// Notion consent URL with `state = notion:<chat_id>`.
    pub fn auth_url(&self, chat_id: &ChatId) -> Result<String> {
        let reg = self.registration()?;
        let state = format!("{}{}", STATE_PREFIX, chat_id);
        let url = Url::parse_with_params(
            &format!("{}/oauth/authorize", self.base_url),
            &[
                ("client_id", reg.client_id.as_str()),
                ("redirect_uri", reg.redirect_uri.as_str()),
                ("response_type", "code"),
                ("owner", "user"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| IntegrationError::InvalidInput(e.to_string()))?;
        Ok(url.into())
    }

    /// Exchanges `code` and stores the access token on the user in `state`.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<ChatId> {
        let reg = self.registration()?;
        let chat = state
            .trim()
            .strip_prefix(STATE_PREFIX)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| IntegrationError::InvalidInput(format!("bad state '{}'", state)))?;
        if code.trim().is_empty() {
            return Err(IntegrationError::InvalidInput("missing code".to_string()));
        }
        let chat_id = ChatId::from(chat);

        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .basic_auth(&reg.client_id, Some(&reg.client_secret))
            .json(&json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": reg.redirect_uri,
            }))
            .send()
            .await?;
        let body = json_or_error("Notion OAuth", response).await?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| IntegrationError::Provider {
                service: "Notion OAuth",
                status: 200,
                body: "response has no access_token".to_string(),
            })?
            .to_string();

        self.users
            .update(&chat_id, |u| u.notion_token = Some(token))
            .await?;
        info!(chat_id = %chat_id, "Notion workspace connected");
        Ok(chat_id)
    }
}

/// Task CRUD on the user's Notion database.
pub struct NotionAdapter {
    users: Arc<UserStore>,
    api: Arc<dyn NotionApi>,
    locks: KeyedLocks,
}

impl NotionAdapter {
    pub fn new(users: Arc<UserStore>, api: Arc<dyn NotionApi>) -> Self {
        Self {
            users,
            api,
            locks: KeyedLocks::new(),
        }
    }

    fn token_of(user: &User) -> Result<String> {
        user.notion_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(IntegrationError::NotConnected("Notion"))
    }

    async fn load(&self, chat_id: &ChatId) -> Result<User> {
        self.users
            .get(chat_id)
            .await
            .ok_or(IntegrationError::NotConnected("Notion"))
    }

    /// Workspace page id, created on first use. Caller holds the user lock.
    pub async fn ensure_workspace(&self, user: &User) -> Result<String> {
        if let Some(id) = user.notion_parent_page_id.clone().filter(|id| !id.is_empty()) {
            return Ok(id);
        }
        let token = Self::token_of(user)?;
        let page_id = self.api.create_workspace_page(&token).await?;
        let stored = page_id.clone();
        self.users
            .update(&user.chat_id, |u| u.notion_parent_page_id = Some(stored))
            .await?;
        info!(chat_id = %user.chat_id, page_id = %page_id, "Created Notion workspace page");
        Ok(page_id)
    }

    /// Task database id, created under `page_id` on first use. Caller holds
    /// the user lock.
    pub async fn ensure_database(&self, user: &User, page_id: &str) -> Result<String> {
        if let Some(id) = user.notion_database_id.clone().filter(|id| !id.is_empty()) {
            return Ok(id);
        }
        let token = Self::token_of(user)?;
        let database_id = self.api.create_task_database(&token, page_id).await?;
        let stored = database_id.clone();
        self.users
            .update(&user.chat_id, |u| u.notion_database_id = Some(stored))
            .await?;
        info!(chat_id = %user.chat_id, database_id = %database_id, "Created Notion task database");
        Ok(database_id)
    }

    /// Token and database id, provisioning both containers if needed.
    async fn provision(&self, chat_id: &ChatId) -> Result<(String, String)> {
        let _guard = self.locks.lock(chat_id).await;
        // Re-read under the lock so a concurrent provision is observed
        let user = self.load(chat_id).await?;
        let token = Self::token_of(&user)?;
        if let Some(db) = user.notion_database_id.clone().filter(|id| !id.is_empty()) {
            return Ok((token, db));
        }
        let page_id = self.ensure_workspace(&user).await?;
        let database_id = self.ensure_database(&user, &page_id).await?;
        Ok((token, database_id))
    }

    fn today_for(user: &User) -> NaiveDate {
        Utc::now()
            .with_timezone(&parse_timezone(&user.prefs.timezone))
            .date_naive()
    }

    /// Adds a task, creating the workspace and database if needed.
    pub async fn create_task(
        &self,
        chat_id: &ChatId,
        title: Option<&str>,
        description: Option<&str>,
        due_date: Option<&str>,
    ) -> String {
        let today = match self.load(chat_id).await {
            Ok(user) if user.has_notion() => Self::today_for(&user),
            _ => return NOT_CONNECTED.to_string(),
        };
        let task = NewTask {
            title: title.unwrap_or("Untitled Task").to_string(),
            description: description.unwrap_or("No description provided").to_string(),
            due_date: resolve_due_date(due_date, today),
            status: TaskStatus::ToDo,
        };

        let result = async {
            let (token, database_id) = self.provision(chat_id).await?;
            self.api.create_task_page(&token, &database_id, &task).await
        }
        .await;

        match result {
            Ok(page_id) => {
                info!(chat_id = %chat_id, page_id = %page_id, "Notion task created");
                format!(
                    "✅ Task '{}' added with due date {}.",
                    task.title,
                    task.due_date.format("%Y-%m-%d")
                )
            }
            Err(IntegrationError::NotConnected(_)) => NOT_CONNECTED.to_string(),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Notion task creation failed");
                "❌ Failed to add task to Notion. Please try again later.".to_string()
            }
        }
    }

    /// Lists tasks, soonest due first.
    pub async fn list_tasks(&self, chat_id: &ChatId) -> String {
        let user = match self.load(chat_id).await {
            Ok(user) if user.has_notion() => user,
            _ => return NOT_CONNECTED.to_string(),
        };
        let Some(database_id) = user.notion_database_id.clone().filter(|id| !id.is_empty()) else {
            return format_tasks(&[]);
        };
        let token = user.notion_token.clone().unwrap_or_default();

        match self.api.query_tasks(&token, &database_id).await {
            Ok(tasks) => format_tasks(&tasks),
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Notion query failed");
                "❌ Failed to fetch tasks from Notion.".to_string()
            }
        }
    }

    /// Updates the given fields of a task.
    pub async fn update_task(&self, chat_id: &ChatId, page_id: Option<&str>, updates: &TaskUpdates) -> String {
        let user = match self.load(chat_id).await {
            Ok(user) if user.has_notion() => user,
            _ => return NOT_CONNECTED.to_string(),
        };
        let Some(page_id) = page_id.map(str::trim).filter(|p| !p.is_empty()) else {
            return "⚠️ Please tell me which task to update, e.g. `update task <task id> status to Done`."
                .to_string();
        };
        if updates.is_empty() {
            return "⚠️ Nothing to update. Give a new title, description, due date or status.".to_string();
        }
        let token = user.notion_token.clone().unwrap_or_default();

        match self.api.update_task_page(&token, page_id, updates).await {
            Ok(()) => {
                info!(chat_id = %chat_id, page_id = %page_id, "Notion task updated");
                "✏️ Task updated.".to_string()
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Notion update failed");
                "❌ Failed to update the task in Notion.".to_string()
            }
        }
    }

    /// Archives a task.
    pub async fn delete_task(&self, chat_id: &ChatId, page_id: Option<&str>) -> String {
        let user = match self.load(chat_id).await {
            Ok(user) if user.has_notion() => user,
            _ => return NOT_CONNECTED.to_string(),
        };
        let Some(page_id) = page_id.map(str::trim).filter(|p| !p.is_empty()) else {
            return "⚠️ Please tell me which task to delete, e.g. `delete task <task id>`.".to_string();
        };
        let token = user.notion_token.clone().unwrap_or_default();

        match self.api.archive_page(&token, page_id).await {
            Ok(()) => {
                info!(chat_id = %chat_id, page_id = %page_id, "Notion task archived");
                "🗑️ Task deleted.".to_string()
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "Notion archive failed");
                "❌ Failed to delete the task from Notion.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeNotion {
        pages_created: AtomicUsize,
        databases_created: AtomicUsize,
        rows: Mutex<Vec<NewTask>>,
    }

    #[async_trait]
    impl NotionApi for FakeNotion {
        async fn create_workspace_page(&self, _token: &str) -> Result<String> {
            let n = self.pages_created.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(format!("page-{}", n))
        }

        async fn create_task_database(&self, _token: &str, parent: &str) -> Result<String> {
            let n = self.databases_created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("db-{}-under-{}", n, parent))
        }

        async fn create_task_page(&self, _token: &str, _db: &str, task: &NewTask) -> Result<String> {
            self.rows.lock().unwrap().push(task.clone());
            Ok("row-1".into())
        }

        async fn query_tasks(&self, _token: &str, _db: &str) -> Result<Vec<Task>> {
            Ok(Vec::new())
        }

        async fn update_task_page(&self, _t: &str, _p: &str, _u: &TaskUpdates) -> Result<()> {
            Ok(())
        }

        async fn archive_page(&self, _t: &str, _p: &str) -> Result<()> {
            Err(IntegrationError::Provider {
                service: "Notion",
                status: 404,
                body: "not found".into(),
            })
        }
    }

    async fn setup(token: Option<&str>) -> (tempfile::TempDir, Arc<UserStore>, Arc<FakeNotion>, Arc<NotionAdapter>) {
        let dir = tempdir().unwrap();
        let users = Arc::new(UserStore::open(dir.path()).unwrap());
        let token = token.map(String::from);
        users
            .update(&ChatId::from("1"), |u| u.notion_token = token)
            .await
            .unwrap();
        let fake = Arc::new(FakeNotion::default());
        let adapter = Arc::new(NotionAdapter::new(Arc::clone(&users), fake.clone()));
        (dir, users, fake, adapter)
    }

    #[tokio::test]
    async fn test_provisions_once_across_calls() {
        let (_dir, users, fake, adapter) = setup(Some("secret")).await;
        let chat = ChatId::from("1");

        let reply = adapter.create_task(&chat, Some("first"), None, Some("2025-11-01")).await;
        assert_eq!(reply, "✅ Task 'first' added with due date 2025-11-01.");
        adapter.create_task(&chat, Some("second"), None, None).await;

        assert_eq!(fake.pages_created.load(Ordering::SeqCst), 1);
        assert_eq!(fake.databases_created.load(Ordering::SeqCst), 1);
        let user = users.get(&chat).await.unwrap();
        assert_eq!(user.notion_parent_page_id.as_deref(), Some("page-0"));
        assert_eq!(user.notion_database_id.as_deref(), Some("db-0-under-page-0"));
    }

    #[tokio::test]
    async fn test_concurrent_provisioning_is_single_flight() {
        let (_dir, _users, fake, adapter) = setup(Some("secret")).await;

        let mut handles = Vec::new();
        for i in 0..5 {
            let adapter = Arc::clone(&adapter);
            handles.push(tokio::spawn(async move {
                let title = format!("task {}", i);
                adapter
                    .create_task(&ChatId::from("1"), Some(&title), None, None)
                    .await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().starts_with("✅"));
        }
        assert_eq!(fake.pages_created.load(Ordering::SeqCst), 1);
        assert_eq!(fake.databases_created.load(Ordering::SeqCst), 1);
        assert_eq!(fake.rows.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let (_dir, _users, fake, adapter) = setup(Some("secret")).await;
        adapter.create_task(&ChatId::from("1"), None, None, None).await;
        let rows = fake.rows.lock().unwrap();
        assert_eq!(rows[0].title, "Untitled Task");
        assert_eq!(rows[0].description, "No description provided");
        assert_eq!(rows[0].status, TaskStatus::ToDo);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let (_dir, _users, _fake, adapter) = setup(None).await;
        let reply = adapter.create_task(&ChatId::from("1"), Some("x"), None, None).await;
        assert!(reply.contains("connect notion"));
        let reply = adapter.list_tasks(&ChatId::from("2")).await;
        assert!(reply.contains("connect notion"));
    }

    #[tokio::test]
    async fn test_list_without_database_is_empty() {
        let (_dir, _users, _fake, adapter) = setup(Some("secret")).await;
        assert_eq!(adapter.list_tasks(&ChatId::from("1")).await, "📭 No tasks found.");
    }

    #[tokio::test]
    async fn test_update_and_delete_usage_and_errors() {
        let (_dir, _users, _fake, adapter) = setup(Some("secret")).await;
        let chat = ChatId::from("1");
        let updates = TaskUpdates {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };

        assert!(adapter.update_task(&chat, None, &updates).await.contains("which task"));
        assert!(adapter
            .update_task(&chat, Some("abc"), &TaskUpdates::default())
            .await
            .contains("Nothing to update"));
        assert_eq!(adapter.update_task(&chat, Some("abc"), &updates).await, "✏️ Task updated.");
        assert!(adapter.delete_task(&chat, Some("  ")).await.contains("which task"));
        assert_eq!(
            adapter.delete_task(&chat, Some("abc")).await,
            "❌ Failed to delete the task from Notion."
        );
    }

    #[test]
    fn test_update_properties_only_present_fields() {
        let props = update_properties(&TaskUpdates {
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        });
        let obj = props.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(props["Status"]["select"]["name"], "In Progress");
    }

    #[test]
    fn test_updates_from_details() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let map = json!({"status": "done", "due_date": "tomorrow", "title": " "})
            .as_object()
            .cloned()
            .unwrap();
        let updates = updates_from_details(&map, today);
        assert_eq!(updates.status, Some(TaskStatus::Done));
        assert_eq!(updates.due_date, NaiveDate::from_ymd_opt(2025, 3, 13));
        assert!(updates.title.is_none());
    }

    #[test]
    fn test_task_from_page() {
        let page = json!({
            "id": "abc",
            "properties": {
                "Title": {"title": [{"plain_text": "Write report"}]},
                "DueDate": {"date": {"start": "2025-11-01"}},
                "Status": {"select": {"name": "Done"}}
            }
        });
        let task = task_from_page(&page).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.due_date.as_deref(), Some("2025-11-01"));
        assert_eq!(task.status.as_deref(), Some("Done"));

        let out = format_tasks(&[task]);
        assert!(out.contains("1. *Write report*"));
        assert!(out.contains("🆔 abc"));
    }

    #[test]
    fn test_notion_auth_url_state() {
        let dir = tempdir().unwrap();
        let users = Arc::new(UserStore::open(dir.path()).unwrap());
        let oauth = NotionOAuth::new(
            Some(OAuthClient {
                client_id: "nid".into(),
                client_secret: "ns".into(),
                redirect_uri: "https://x/auth/notion/callback".into(),
            }),
            users,
        );
        let url = Url::parse(&oauth.auth_url(&ChatId::from("42")).unwrap()).unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "state" && v == "notion:42"));
        assert!(url.as_str().starts_with("https://api.notion.com/v1/oauth/authorize"));
    }
}
