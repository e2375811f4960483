use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::db::{Model, Row};

type LoadFn = dyn Fn(Model, Row) -> BoxFuture<'static, color_eyre::Result<()>> + Send + Sync;

/// Named per-row insertion callback. The name stands in for the function in
/// serialized field configuration.
#[derive(Clone)]
pub struct RowLoader {
    name: &'static str,
    load: Arc<LoadFn>,
}

impl RowLoader {
    pub fn new<F>(name: &'static str, load: F) -> Self
    where
        F: Fn(Model, Row) -> BoxFuture<'static, color_eyre::Result<()>> + Send + Sync + 'static,
    {
        Self {
            name,
            load: Arc::new(load),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn load(&self, model: Model, row: Row) -> color_eyre::Result<()> {
        (self.load)(model, row).await
    }
}

impl fmt::Debug for RowLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowLoader").field("name", &self.name).finish()
    }
}

/// Upload field: which table an attached file loads into, and where the
/// field sits when a record carries several uploads. Fixed at
/// schema-definition time.
#[derive(Debug, Clone)]
pub struct UploadField {
    pub name: String,
    pub app_label: String,
    pub model_name: String,
    pub order: u32,
    loader: Option<RowLoader>,
    replace: bool,
}

impl UploadField {
    pub fn new(name: &str, app_label: &str, model_name: &str, order: u32) -> Self {
        Self {
            name: name.to_string(),
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
            order,
            loader: None,
            replace: false,
        }
    }

    /// Routes every parsed row through `loader` instead of the bulk insert.
    pub fn with_loader(mut self, loader: RowLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Removes all existing rows from the target table before loading.
    pub fn replace_existing(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn loader(&self) -> Option<&RowLoader> {
        self.loader.as_ref()
    }

    pub fn replaces(&self) -> bool {
        self.replace
    }

    /// Serializable form of the static configuration.
    pub fn config(&self) -> FieldConfig {
        FieldConfig {
            name: self.name.clone(),
            app_label: self.app_label.clone(),
            model_name: self.model_name.clone(),
            order: self.order,
            loader: self.loader.as_ref().map(|l| l.name().to_string()),
            replace: self.replace,
        }
    }
}

/// Persisted upload-field configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    pub app_label: String,
    pub model_name: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<String>,
    #[serde(default)]
    pub replace: bool,
}
