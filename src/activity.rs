//! The MinIO activity: one configured storage operation per evaluation.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::config::{Method, Settings};
use crate::encode;
use crate::error::{MinioError, Result};
use crate::resolve::Resolver;
use crate::store::{ObjectStore, S3ObjectStore};
use crate::types::{get_content_type, DataFormat, Input, Output};

fn result(key: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value.into());
    map
}

/// Performs the configured [`Method`] against the bucket named in the
/// settings.
///
/// Evaluation never fails: every error is reported through an [`Output`]
/// with status `ERROR` and an `errorMessage`.
pub struct MinioActivity {
    settings: Settings,
    store: Arc<dyn ObjectStore>,
}

impl MinioActivity {
    /// Connects an activity to the S3-compatible server in `settings`.
    pub async fn new(settings: Settings) -> Result<Self> {
        debug!("Settings: {:?}", settings);
        settings.validate()?;

        let store = S3ObjectStore::new(&settings).await.map_err(|e| {
            error!("MinIO connection error: {}", e);
            e
        })?;
        debug!("Got MinIO connection");

        Ok(Self::with_store(settings, Arc::new(store)))
    }

    /// Builds an activity from the host's settings map.
    pub async fn from_map(values: &Map<String, Value>, resolver: &dyn Resolver) -> Result<Self> {
        Self::new(Settings::from_map(values, resolver)?).await
    }

    /// Uses an existing store instead of connecting.
    pub fn with_store(settings: Settings, store: Arc<dyn ObjectStore>) -> Self {
        Self { settings, store }
    }

    /// Returns the settings the activity was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs the configured method for one input.
    pub async fn eval(&self, input: &Input) -> Output {
        debug!(
            "Running {} for object '{}'",
            self.settings.method, input.object_name
        );

        match self.dispatch(input).await {
            Ok(result) => Output::success(result),
            Err(e) => {
                error!("Error in MinIO {} method: {}", self.settings.method, e);
                Output::error(e.to_string())
            }
        }
    }

    /// Like [`eval`](Self::eval), starting from the host's input map.
    pub async fn eval_map(&self, values: &Map<String, Value>) -> Output {
        match Input::from_map(values) {
            Ok(input) => self.eval(&input).await,
            Err(e) => {
                error!("Error getting Input object: {}", e);
                Output::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, input: &Input) -> Result<Map<String, Value>> {
        match self.settings.method {
            Method::BucketExists => self.bucket_exists().await,
            Method::GetObject => self.get_object(input).await,
            Method::MakeBucket => self.make_bucket().await,
            Method::PutObject => self.put_object(input).await,
            Method::RemoveObject => self.remove_object(input).await,
        }
    }

    fn object_name<'a>(&self, input: &'a Input) -> Result<&'a str> {
        let name = input.object_name.trim();
        if name.is_empty() {
            return Err(MinioError::InvalidInput("objectName is required".to_string()));
        }
        Ok(name)
    }

    async fn bucket_exists(&self) -> Result<Map<String, Value>> {
        let exists = self.store.bucket_exists(&self.settings.bucket_name).await?;
        Ok(result("exist", exists))
    }

    async fn make_bucket(&self) -> Result<Map<String, Value>> {
        self.store
            .make_bucket(&self.settings.bucket_name, self.settings.region.trim())
            .await?;
        Ok(result("created", true))
    }

    async fn get_object(&self, input: &Input) -> Result<Map<String, Value>> {
        let name = self.object_name(input)?;
        let object = self.store.get_object(&self.settings.bucket_name, name).await?;

        if let Some(declared) = object.declared_size {
            if declared != object.data.len() as u64 {
                return Err(MinioError::backend(format!(
                    "object size does not match: expected {} bytes, read {}",
                    declared,
                    object.data.len()
                )));
            }
        }

        Ok(result(
            "data",
            String::from_utf8_lossy(&object.data).into_owned(),
        ))
    }

    async fn put_object(&self, input: &Input) -> Result<Map<String, Value>> {
        let name = self.object_name(input)?;
        let document = input.document()?;
        let format: DataFormat = input.format.parse()?;

        let data = encode::encode(Some(&document), format)?;
        debug!("Encoded {} payload: {} bytes", format, data.len());

        let content_type = match self.settings.method_option("contentType") {
            Some(Value::String(content_type)) if !content_type.is_empty() => content_type.clone(),
            _ => get_content_type(name, format),
        };

        let written = self
            .store
            .put_object(
                &self.settings.bucket_name,
                name,
                Bytes::from(data),
                &content_type,
            )
            .await?;

        Ok(result("bytes", written))
    }

    async fn remove_object(&self, input: &Input) -> Result<Map<String, Value>> {
        let name = self.object_name(input)?;
        self.store
            .remove_object(&self.settings.bucket_name, name)
            .await?;
        Ok(result("removed", true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::InMemoryObjectStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn settings(method: Method) -> Settings {
        Settings::new("localhost:9000", "minioadmin", "minioadmin", "flogo", method)
    }

    async fn activity(method: Method) -> (MinioActivity, Arc<InMemoryObjectStore>) {
        let store = Arc::new(InMemoryObjectStore::with_bucket("flogo").await);
        let activity = MinioActivity::with_store(settings(method), store.clone());
        (activity, store)
    }

    #[tokio::test]
    async fn test_put_object_csv() {
        let (activity, store) = activity(Method::PutObject).await;
        let input = Input::new("inbox/testing.csv")
            .format("CSV")
            .data(json!({"abc": "123", "bcd": {"cde": "123", "efg": false}}));

        let output = activity.eval(&input).await;
        assert!(output.is_success(), "{:?}", output);

        let (data, content_type) = store.object("flogo", "inbox/testing.csv").await.unwrap();
        let expected = "\"abc\",\"bcd.cde\",\"bcd.efg\"\n\"123\",\"123\",false";
        assert_eq!(data, Bytes::from(expected));
        assert_eq!(content_type, "text/csv");
        assert_eq!(output.result.get("bytes"), Some(&json!(expected.len())));
    }

    #[tokio::test]
    async fn test_put_object_method_option_content_type() {
        let store = Arc::new(InMemoryObjectStore::with_bucket("flogo").await);
        let options = json!({"contentType": "application/x-ndjson"});
        let settings =
            settings(Method::PutObject).method_options(options.as_object().unwrap().clone());
        let activity = MinioActivity::with_store(settings, store.clone());

        let input = Input::new("data").format("JSON").data(json!({"a": 1}));
        assert!(activity.eval(&input).await.is_success());

        let (_, content_type) = store.object("flogo", "data").await.unwrap();
        assert_eq!(content_type, "application/x-ndjson");
    }

    #[tokio::test]
    async fn test_put_object_without_data() {
        let (activity, store) = activity(Method::PutObject).await;
        let output = activity.eval(&Input::new("a.json").format("JSON")).await;
        assert!(!output.is_success());
        assert_eq!(output.error_message(), Some("Invalid input: data is nil"));
        assert!(store.object("flogo", "a.json").await.is_none());
    }

    #[tokio::test]
    async fn test_put_object_unknown_format() {
        let (activity, _) = activity(Method::PutObject).await;
        let input = Input::new("a.xml").format("XML").data(json!({"a": 1}));
        let output = activity.eval(&input).await;
        assert!(output.error_message().unwrap().contains("unsupported format"));
    }

    #[tokio::test]
    async fn test_object_name_required() {
        let (activity, _) = activity(Method::RemoveObject).await;
        let output = activity.eval(&Input::new("  ")).await;
        assert_eq!(
            output.error_message(),
            Some("Invalid input: objectName is required")
        );
    }

    #[tokio::test]
    async fn test_get_object_size_mismatch() {
        let (activity, store) = activity(Method::GetObject).await;
        store
            .put_object("flogo", "a.txt", Bytes::from_static(b"abc"), "text/plain")
            .await
            .unwrap();
        store.fake_short_read("flogo", "a.txt").await;

        let output = activity.eval(&Input::new("a.txt")).await;
        assert!(output
            .error_message()
            .unwrap()
            .contains("object size does not match"));
    }

    #[tokio::test]
    async fn test_make_bucket_uses_region() {
        let store = Arc::new(InMemoryObjectStore::new());
        let activity = MinioActivity::with_store(
            settings(Method::MakeBucket).region("eu-central-1"),
            store.clone(),
        );
        let output = activity.eval(&Input::default()).await;
        assert_eq!(output.result.get("created"), Some(&json!(true)));
        assert_eq!(
            store.bucket_region("flogo").await.as_deref(),
            Some("eu-central-1")
        );
    }

    #[tokio::test]
    async fn test_eval_map_coerces_host_input() {
        let (activity, store) = activity(Method::PutObject).await;
        let values = json!({
            "objectName": "inbox/testing.json",
            "format": "JSON",
            "data": "{\"abc\": \"123\"}"
        });
        let output = activity.eval_map(values.as_object().unwrap()).await;
        assert!(output.is_success());

        let (data, _) = store.object("flogo", "inbox/testing.json").await.unwrap();
        assert_eq!(data, Bytes::from_static(br#"{"abc":"123"}"#));
    }
}
