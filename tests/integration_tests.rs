use std::sync::Arc;

use elizaos_plugin_minio::fake::InMemoryObjectStore;
use elizaos_plugin_minio::{
    encode_value, CompositeResolver, DataFormat, Input, Method, MinioActivity, MinioError,
    ObjectStore, Settings, Status,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn host_settings(method: &str) -> Map<String, Value> {
    json!({
        "endpoint": "localhost:9000",
        "accessKey": "minioadmin",
        "secretKey": "minioadmin",
        "enableSsl": false,
        "bucketName": "flogo",
        "methodName": method
    })
    .as_object()
    .unwrap()
    .clone()
}

fn activity_for(method: Method, store: &Arc<InMemoryObjectStore>) -> MinioActivity {
    let settings = Settings::new("localhost:9000", "minioadmin", "minioadmin", "flogo", method);
    MinioActivity::with_store(settings, store.clone())
}

#[test]
fn test_settings_from_host_map() {
    let resolver = CompositeResolver::with_defaults(Map::new());
    let settings = Settings::from_map(&host_settings("PutObject"), &resolver).unwrap();
    assert_eq!(settings.bucket_name, "flogo");
    assert_eq!(settings.method, Method::PutObject);
    assert!(settings.method_options.is_none());
}

#[tokio::test]
async fn test_activity_connects_from_host_map() {
    let resolver = CompositeResolver::with_defaults(Map::new());
    let activity = MinioActivity::from_map(&host_settings("BucketExists"), &resolver)
        .await
        .unwrap();
    assert_eq!(activity.settings().method, Method::BucketExists);
}

#[tokio::test]
async fn test_bucket_lifecycle() {
    let store = Arc::new(InMemoryObjectStore::new());

    let output = activity_for(Method::BucketExists, &store)
        .eval(&Input::default())
        .await;
    assert_eq!(output.status, Status::Success);
    assert_eq!(output.result.get("exist"), Some(&json!(false)));

    let output = activity_for(Method::MakeBucket, &store)
        .eval(&Input::default())
        .await;
    assert_eq!(output.result.get("created"), Some(&json!(true)));

    let output = activity_for(Method::BucketExists, &store)
        .eval(&Input::default())
        .await;
    assert_eq!(output.result.get("exist"), Some(&json!(true)));

    let output = activity_for(Method::MakeBucket, &store)
        .eval(&Input::default())
        .await;
    assert_eq!(output.status, Status::Error);
    assert!(output
        .error_message()
        .unwrap()
        .contains("BucketAlreadyOwnedByYou"));
}

#[tokio::test]
async fn test_put_get_remove_round_trip() {
    let store = Arc::new(InMemoryObjectStore::with_bucket("flogo").await);

    let put = activity_for(Method::PutObject, &store);
    let output = put
        .eval(
            &Input::new("inbox/testing.json")
                .format("JSON")
                .data(json!({"abc": "123"})),
        )
        .await;
    assert_eq!(output.result.get("bytes"), Some(&json!(13)));

    let output = activity_for(Method::GetObject, &store)
        .eval(&Input::new("inbox/testing.json"))
        .await;
    assert_eq!(
        Value::Object(output.to_map()),
        json!({"status": "SUCCESS", "result": {"data": "{\"abc\":\"123\"}"}})
    );

    let output = activity_for(Method::RemoveObject, &store)
        .eval(&Input::new("inbox/testing.json"))
        .await;
    assert_eq!(output.result.get("removed"), Some(&json!(true)));

    let output = activity_for(Method::GetObject, &store)
        .eval(&Input::new("inbox/testing.json"))
        .await;
    assert_eq!(output.status, Status::Error);
    assert!(output.error_message().unwrap().contains("NoSuchKey"));
}

#[tokio::test]
async fn test_csv_object_from_host_input() {
    let store = Arc::new(InMemoryObjectStore::with_bucket("flogo").await);
    let activity = activity_for(Method::PutObject, &store);

    let values = json!({
        "objectName": "inbox/testing.csv",
        "format": "CSV",
        "data": "{\"abc\": \"123\", \"bcd\": {\"cde\": \"123\", \"efg\": false}}"
    });
    let output = activity.eval_map(values.as_object().unwrap()).await;
    assert_eq!(output.status, Status::Success);

    let object = store.get_object("flogo", "inbox/testing.csv").await.unwrap();
    assert_eq!(
        String::from_utf8(object.data.to_vec()).unwrap(),
        "\"abc\",\"bcd.cde\",\"bcd.efg\"\n\"123\",\"123\",false"
    );
}

#[tokio::test]
async fn test_backend_failure_becomes_error_output() {
    let store = Arc::new(InMemoryObjectStore::with_bucket("flogo").await);
    store.fake_fail("connection refused").await;

    for method in [
        Method::BucketExists,
        Method::MakeBucket,
        Method::GetObject,
        Method::PutObject,
        Method::RemoveObject,
    ] {
        let input = Input::new("a.json").format("JSON").data(json!({"a": 1}));
        let output = activity_for(method, &store).eval(&input).await;
        assert_eq!(output.status, Status::Error, "{}", method);
        assert_eq!(
            output.error_message(),
            Some("Backend error: connection refused")
        );
    }
}

#[test]
fn test_encode_value_scenarios() {
    let csv = encode_value(Some(&json!({"abc": "123"})), DataFormat::Csv).unwrap();
    assert_eq!(csv, b"\"abc\"\n\"123\"".to_vec());

    let json_bytes = encode_value(Some(&json!({"abc": "123"})), DataFormat::Json).unwrap();
    assert_eq!(json_bytes, br#"{"abc":"123"}"#.to_vec());

    assert!(matches!(
        encode_value(None, DataFormat::Csv).unwrap_err(),
        MinioError::InvalidInput(_)
    ));
}

#[test]
fn test_encode_is_deterministic_across_runs() {
    let data = json!({"z": 1, "a": {"m": "x", "b": [true, 2.5]}});
    let first = encode_value(Some(&data), DataFormat::Csv).unwrap();
    let second = encode_value(Some(&data), DataFormat::Csv).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        "\"a.b.0\",\"a.b.1\",\"a.m\",\"z\"\ntrue,2.5,\"x\",1"
    );
}

#[test]
fn test_eval_from_blocking_context() {
    let store = Arc::new(tokio_test::block_on(InMemoryObjectStore::with_bucket("flogo")));
    let activity = activity_for(Method::BucketExists, &store);
    let output = tokio_test::block_on(activity.eval(&Input::default()));
    assert_eq!(output.result.get("exist"), Some(&json!(true)));
}
