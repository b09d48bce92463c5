//! Activity configuration
//!
//! Settings are supplied once, when the host instantiates the activity. They
//! can be built from the host's settings map, from environment variables, or
//! programmatically with the builder-style setters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::{Map, Value};
use url::Url;

use crate::coerce;
use crate::error::{MinioError, Result};
use crate::resolve::{resolve_object, Resolver};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Storage operation performed by every evaluation of the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Check whether the configured bucket exists
    BucketExists,
    /// Read an object as text
    GetObject,
    /// Create the configured bucket
    MakeBucket,
    /// Encode the payload and store it
    PutObject,
    /// Delete an object
    RemoveObject,
}

impl Method {
    /// Host-facing method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::BucketExists => "BucketExists",
            Method::GetObject => "GetObject",
            Method::MakeBucket => "MakeBucket",
            Method::PutObject => "PutObject",
            Method::RemoveObject => "RemoveObject",
        }
    }
}

impl FromStr for Method {
    type Err = MinioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "BucketExists" => Ok(Method::BucketExists),
            "GetObject" => Ok(Method::GetObject),
            "MakeBucket" => Ok(Method::MakeBucket),
            "PutObject" => Ok(Method::PutObject),
            "RemoveObject" => Ok(Method::RemoveObject),
            other => Err(MinioError::Config(format!("unknown method '{}'", other))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS transport settings (`sslConfig`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SslConfig {
    /// PEM client certificate chain
    pub cert_file: String,
    /// PEM private key for the client certificate
    pub key_file: String,
    /// PEM bundle of trusted CA certificates
    pub ca_file: String,
    /// Idle connections kept per host; `None` keeps the transport default
    pub max_idle_conns: Option<usize>,
    /// How long an idle connection is kept; `None` keeps it indefinitely
    pub idle_conn_timeout: Option<Duration>,
    /// Accepted for compatibility; the transport never requests compression
    pub disable_compression: bool,
}

impl SslConfig {
    /// Builds the TLS settings from an already-resolved `sslConfig` object.
    pub fn from_map(values: &Map<String, Value>) -> Result<Self> {
        let max_idle_conns = coerce::to_int(values.get("maxIdleConns"))?;
        let idle_conn_timeout = coerce::to_int(values.get("idleConnTimeout"))?;

        Ok(Self {
            cert_file: coerce::to_string(values.get("certFile"))?,
            key_file: coerce::to_string(values.get("keyFile"))?,
            ca_file: coerce::to_string(values.get("caFile"))?,
            max_idle_conns: usize::try_from(max_idle_conns).ok().filter(|n| *n > 0),
            idle_conn_timeout: u64::try_from(idle_conn_timeout)
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            disable_compression: coerce::to_bool(values.get("disableCompression"))?,
        })
    }

    /// Whether a CA bundle was supplied.
    pub fn has_ca_file(&self) -> bool {
        !self.ca_file.trim().is_empty()
    }

    /// Renders the configuration with the host's `sslConfig` keys.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("certFile".to_string(), Value::from(self.cert_file.clone()));
        map.insert("keyFile".to_string(), Value::from(self.key_file.clone()));
        map.insert("caFile".to_string(), Value::from(self.ca_file.clone()));
        map.insert(
            "maxIdleConns".to_string(),
            Value::from(self.max_idle_conns.unwrap_or(0) as u64),
        );
        map.insert(
            "idleConnTimeout".to_string(),
            Value::from(self.idle_conn_timeout.map(|d| d.as_secs()).unwrap_or(0)),
        );
        map.insert(
            "disableCompression".to_string(),
            Value::from(self.disable_compression),
        );
        map
    }
}

/// MinIO activity settings.
#[derive(Clone)]
pub struct Settings {
    /// Server address, `host:port` or a full URL
    pub endpoint: String,
    /// Access key (required)
    pub access_key: String,
    /// Secret key (required)
    pub secret_key: String,
    /// Use HTTPS
    pub enable_ssl: bool,
    /// Bucket every operation targets (required)
    pub bucket_name: String,
    /// Region for the client and for `MakeBucket`
    pub region: String,
    /// Operation performed on every evaluation (required)
    pub method: Method,
    /// Method-specific options, already resolved
    pub method_options: Option<Map<String, Value>>,
    /// TLS transport settings, already resolved
    pub ssl_config: Option<SslConfig>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("enable_ssl", &self.enable_ssl)
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("method", &self.method)
            .field("method_options", &self.method_options)
            .field("ssl_config", &self.ssl_config)
            .finish()
    }
}

impl Settings {
    /// Create settings with the required values.
    ///
    /// # Example
    ///
    /// ```
    /// use elizaos_plugin_minio::{Method, Settings};
    ///
    /// let settings = Settings::new("localhost:9000", "minioadmin", "minioadmin", "flogo", Method::PutObject);
    /// assert!(!settings.enable_ssl);
    /// ```
    pub fn new(
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
        method: Method,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            enable_ssl: false,
            bucket_name: bucket_name.to_string(),
            region: String::new(),
            method,
            method_options: None,
            ssl_config: None,
        }
    }

    /// Set SSL (builder pattern)
    pub fn enable_ssl(mut self, enable: bool) -> Self {
        self.enable_ssl = enable;
        self
    }

    /// Set region (builder pattern)
    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    /// Set method options (builder pattern)
    pub fn method_options(mut self, options: Map<String, Value>) -> Self {
        self.method_options = Some(options);
        self
    }

    /// Set TLS transport settings (builder pattern)
    pub fn ssl_config(mut self, ssl_config: SslConfig) -> Self {
        self.ssl_config = Some(ssl_config);
        self
    }

    /// Build settings from the host's settings map.
    ///
    /// Strings starting with `=` are expressions and are resolved through
    /// `resolver`, including those nested in `methodOptions` and `sslConfig`.
    ///
    /// # Errors
    ///
    /// Returns `MinioError::Config` when a value cannot be coerced or
    /// resolved, and `MinioError::MissingSetting` when a required value is
    /// empty.
    pub fn from_map(values: &Map<String, Value>, resolver: &dyn Resolver) -> Result<Self> {
        let resolved = resolve_object(values, resolver)?;
        let get = |key: &str| resolved.get(key);

        let method_name = coerce::to_string(get("methodName"))?;
        if method_name.is_empty() {
            return Err(MinioError::MissingSetting("methodName".to_string()));
        }

        let method_options = coerce::to_object(get("methodOptions"))?;

        let ssl_config = coerce::to_object(get("sslConfig"))?
            .map(|map| SslConfig::from_map(&map))
            .transpose()?;

        let settings = Self {
            endpoint: coerce::to_string(get("endpoint"))?,
            access_key: coerce::to_string(get("accessKey"))?,
            secret_key: coerce::to_string(get("secretKey"))?,
            enable_ssl: coerce::to_bool(get("enableSsl"))?,
            bucket_name: coerce::to_string(get("bucketName"))?,
            region: coerce::to_string(get("region"))?,
            method: method_name.parse()?,
            method_options,
            ssl_config,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `MINIO_ENDPOINT`
    /// - `MINIO_ACCESS_KEY`
    /// - `MINIO_SECRET_KEY`
    /// - `MINIO_BUCKET`
    /// - `MINIO_METHOD`: one of `BucketExists`, `GetObject`, `MakeBucket`,
    ///   `PutObject`, `RemoveObject`
    ///
    /// # Optional Variables
    ///
    /// - `MINIO_ENABLE_SSL`
    /// - `MINIO_REGION`
    /// - `MINIO_CA_FILE`, `MINIO_CERT_FILE`, `MINIO_KEY_FILE`
    /// - `MINIO_MAX_IDLE_CONNS`, `MINIO_IDLE_CONN_TIMEOUT` (seconds)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let required = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MinioError::MissingSetting(name.to_string()))
        };
        let optional = |name: &str| std::env::var(name).ok().map(Value::String);

        let method: Method = required("MINIO_METHOD")?.parse()?;
        let mut settings = Self::new(
            &required("MINIO_ENDPOINT")?,
            &required("MINIO_ACCESS_KEY")?,
            &required("MINIO_SECRET_KEY")?,
            &required("MINIO_BUCKET")?,
            method,
        )
        .enable_ssl(coerce::to_bool(optional("MINIO_ENABLE_SSL").as_ref())?);

        if let Ok(region) = std::env::var("MINIO_REGION") {
            settings = settings.region(&region);
        }

        if let Some(ca_file) = optional("MINIO_CA_FILE") {
            let mut ssl = Map::new();
            ssl.insert("caFile".to_string(), ca_file);
            for (key, var) in [
                ("certFile", "MINIO_CERT_FILE"),
                ("keyFile", "MINIO_KEY_FILE"),
                ("maxIdleConns", "MINIO_MAX_IDLE_CONNS"),
                ("idleConnTimeout", "MINIO_IDLE_CONN_TIMEOUT"),
            ] {
                if let Some(value) = optional(var) {
                    ssl.insert(key.to_string(), value);
                }
            }
            settings = settings.ssl_config(SslConfig::from_map(&ssl)?);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `MinioError::MissingSetting` for an empty required value and
    /// `MinioError::Config` for an unusable endpoint.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("endpoint", &self.endpoint),
            ("accessKey", &self.access_key),
            ("secretKey", &self.secret_key),
            ("bucketName", &self.bucket_name),
        ] {
            if value.trim().is_empty() {
                return Err(MinioError::MissingSetting(name.to_string()));
            }
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// The endpoint as a URL; a bare `host:port` gets a scheme from `enable_ssl`.
    pub fn endpoint_url(&self) -> Result<String> {
        let endpoint = self.endpoint.trim();
        let candidate = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            let scheme = if self.enable_ssl { "https" } else { "http" };
            format!("{}://{}", scheme, endpoint)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| MinioError::Config(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        if url.host_str().is_none() {
            return Err(MinioError::Config(format!(
                "invalid endpoint '{}': missing host",
                endpoint
            )));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    /// Configured region, or [`DEFAULT_REGION`].
    pub fn region_or_default(&self) -> &str {
        if self.region.trim().is_empty() {
            DEFAULT_REGION
        } else {
            &self.region
        }
    }

    /// Whether the client needs the custom TLS transport.
    pub fn uses_custom_transport(&self) -> bool {
        self.enable_ssl
            && self
                .ssl_config
                .as_ref()
                .is_some_and(SslConfig::has_ca_file)
    }

    /// A single method option, if set.
    pub fn method_option(&self, key: &str) -> Option<&Value> {
        self.method_options.as_ref().and_then(|options| options.get(key))
    }

    /// Renders the settings with the host's keys, secret key included.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("endpoint".to_string(), Value::from(self.endpoint.clone()));
        map.insert("accessKey".to_string(), Value::from(self.access_key.clone()));
        map.insert("secretKey".to_string(), Value::from(self.secret_key.clone()));
        map.insert("enableSsl".to_string(), Value::from(self.enable_ssl));
        map.insert("bucketName".to_string(), Value::from(self.bucket_name.clone()));
        map.insert("region".to_string(), Value::from(self.region.clone()));
        map.insert("methodName".to_string(), Value::from(self.method.as_str()));
        map.insert(
            "methodOptions".to_string(),
            self.method_options
                .clone()
                .map(Value::Object)
                .unwrap_or(Value::Null),
        );
        map.insert(
            "sslConfig".to_string(),
            self.ssl_config
                .as_ref()
                .map(|ssl| Value::Object(ssl.to_map()))
                .unwrap_or(Value::Null),
        );
        map
    }
}
