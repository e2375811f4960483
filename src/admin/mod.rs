mod fields;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use color_eyre::Result;
use color_eyre::eyre::eyre;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{self, Registry};
use crate::storage::{FileStore, StoredFile};

pub use fields::{FieldConfig, RowLoader, UploadField};

/// Notification severity shown to the invoking user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

/// Upload fields declared for one record type.
#[derive(Debug)]
pub struct RecordSchema {
    pub name: String,
    fields: Vec<UploadField>,
}

impl RecordSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: UploadField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn upload_fields(&self) -> &[UploadField] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&UploadField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One saved admin record with its uploaded files.
#[derive(Debug)]
pub struct Record {
    pub id: Uuid,
    schema: Arc<RecordSchema>,
    files: HashMap<String, StoredFile>,
}

impl Record {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schema,
            files: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Attaches a stored file to one of the schema's upload fields.
    pub fn attach(&mut self, field_name: &str, file: StoredFile) -> Result<()> {
        if self.schema.field(field_name).is_none() {
            return Err(eyre!(
                "No upload field named '{}' on '{}'",
                field_name,
                self.schema.name
            ));
        }

        self.files.insert(field_name.to_string(), file);
        Ok(())
    }

    pub fn file(&self, field_name: &str) -> Option<&StoredFile> {
        self.files.get(field_name)
    }

    /// Deletes the record, removing the files it owns.
    pub async fn delete(self, store: &FileStore) -> Result<()> {
        for file in self.files.values() {
            store.remove(file).await?;
        }

        Ok(())
    }
}

/// Admin surface an action runs against: the model registry, the upload
/// store, and the user-notification sink.
pub struct ModelAdmin {
    pub registry: Registry,
    pub store: FileStore,
    messages: Mutex<Vec<Message>>,
}

impl ModelAdmin {
    pub fn new(registry: Registry, store: FileStore) -> Self {
        Self {
            registry,
            store,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Wires the database pool and upload store from loaded configuration.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let pool = db::build(&config.database.url).await?;
        let store = FileStore::open(config.uploads.dir.clone()).await?;

        Ok(Self::new(Registry::new(pool), store))
    }

    pub fn message_user(&self, text: impl Into<String>, level: Level) {
        self.messages.lock().expect("mutex to lock").push(Message {
            level,
            text: text.into(),
        });
    }

    /// Messages emitted so far, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().expect("mutex to lock").clone()
    }
}

pub type ActionFn = for<'a> fn(&'a ModelAdmin, &'a [Record]) -> BoxFuture<'a, ()>;

/// Registered admin actions, dispatched by name.
#[derive(Default)]
pub struct Actions {
    actions: HashMap<&'static str, ActionFn>,
}

impl Actions {
    pub fn register(&mut self, name: &'static str, action: ActionFn) {
        self.actions.insert(name, action);
    }

    pub async fn run(&self, name: &str, admin: &ModelAdmin, selection: &[Record]) -> Result<()> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| eyre!("Unknown admin action: {name}"))?;

        action(admin, selection).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_admin(dir: &tempfile::TempDir) -> ModelAdmin {
        let path = dir.path().join("admin.sqlite");
        let pool = db::build(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = FileStore::open(dir.path().join("uploads")).await.unwrap();

        ModelAdmin::new(Registry::new(pool), store)
    }

    #[tokio::test]
    async fn messages_are_kept_in_emit_order() {
        let dir = tempfile::tempdir().unwrap();
        let admin = test_admin(&dir).await;

        admin.message_user("first", Level::Error);
        admin.message_user("second", Level::Info);

        let messages = admin.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[0].level, Level::Error);
        assert_eq!(messages[1].level, Level::Info);
    }

    #[tokio::test]
    async fn attach_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let admin = test_admin(&dir).await;

        let schema = Arc::new(RecordSchema::new("report"));
        let mut record = Record::new(schema);
        let file = admin.store.store("items.csv", b"a\n1\n").await.unwrap();

        assert!(record.attach("items", file).is_err());
    }

    #[tokio::test]
    async fn deleting_a_record_removes_its_files() {
        let dir = tempfile::tempdir().unwrap();
        let admin = test_admin(&dir).await;

        let schema = Arc::new(
            RecordSchema::new("report")
                .with_field(UploadField::new("items", "inventory", "item", 0)),
        );
        let mut record = Record::new(schema);
        let file = admin.store.store("items.csv", b"a\n1\n").await.unwrap();
        let path = file.path().to_path_buf();
        record.attach("items", file).unwrap();

        record.delete(&admin.store).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unknown_action_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let admin = test_admin(&dir).await;

        let actions = Actions::default();
        assert!(actions.run("load_csv_files", &admin, &[]).await.is_err());
    }

    fn greet<'a>(admin: &'a ModelAdmin, _selection: &'a [Record]) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            admin.message_user("ran", Level::Info);
        })
    }

    #[tokio::test]
    async fn registered_action_runs() {
        let dir = tempfile::tempdir().unwrap();
        let admin = test_admin(&dir).await;

        let mut actions = Actions::default();
        actions.register("greet", greet);

        actions.run("greet", &admin, &[]).await.unwrap();
        assert_eq!(admin.messages()[0].text, "ran");
    }
}
