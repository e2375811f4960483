mod csv_file;

pub use csv_file::CsvFile;

use color_eyre::Result;
use color_eyre::eyre::Context;
use futures::future::BoxFuture;
use tracing::debug;

use crate::admin::{Actions, Level, ModelAdmin, Record, UploadField};
use crate::error::LoadError;
use crate::storage::StoredFile;

/// Registers the bulk-load action under its admin name.
pub fn register_action(actions: &mut Actions) {
    actions.register("load_csv_files", boxed_action);
}

fn boxed_action<'a>(admin: &'a ModelAdmin, selection: &'a [Record]) -> BoxFuture<'a, ()> {
    Box::pin(load_csv_files(admin, selection))
}

/// Admin action: load every CSV attached to the selected records into its
/// target table.
pub async fn load_csv_files(admin: &ModelAdmin, selection: &[Record]) {
    if let Err(error) = load_selection(admin, selection).await {
        admin.message_user(error.to_string(), Level::Error);
    }

    // The confirmation fires even when an error was reported above.
    admin.message_user("All data successfully inserted", Level::Info);
}

async fn load_selection(admin: &ModelAdmin, selection: &[Record]) -> Result<()> {
    for record in selection {
        let mut fields: Vec<&UploadField> = record.schema().upload_fields().iter().collect();
        fields.sort_by_key(|field| field.order);

        for field in fields {
            let model = admin.registry.get(&field.app_label, &field.model_name)?;
            let file = validate_csv_format(record, field)?;

            let handle = file.open().await.wrap_err_with(|| {
                format!("Failed to open file: {}", file.path().to_string_lossy())
            })?;
            let csv = CsvFile::read(handle)
                .await
                .wrap_err_with(|| format!("Failed to read file: {}", file.name))?;

            debug!(
                field = field.name.as_str(),
                rows = csv.rows().len(),
                "parsed upload"
            );

            if field.replaces() {
                model.truncate().await?;
            }

            match field.loader() {
                None => {
                    let inserted = model.insert_many(csv.headers(), csv.rows()).await?;
                    debug!(
                        model = field.model_name.as_str(),
                        inserted, "bulk inserted rows"
                    );
                }
                Some(loader) => {
                    for row in csv.into_rows() {
                        loader.load(model.clone(), row).await?;
                    }
                }
            }
        }
    }

    Ok(())
}

fn validate_csv_format<'a>(
    record: &'a Record,
    field: &UploadField,
) -> std::result::Result<&'a StoredFile, LoadError> {
    let file = record
        .file(&field.name)
        .ok_or_else(|| LoadError::MissingFile(field.name.clone()))?;

    if !file.name.contains(".csv") {
        return Err(LoadError::InvalidFileType(file.name.clone()));
    }

    Ok(file)
}
