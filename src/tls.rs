//! Custom HTTPS transport for servers with private certificate authorities.
//!
//! When SSL is enabled and a CA bundle is configured, the SDK's default
//! transport is replaced with a hyper client that trusts only that bundle and,
//! if a certificate and key are given, authenticates with them.

use std::fs::File;
use std::io::BufReader;

use hyper::client::HttpConnector;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore};
use rustls_pemfile::Item;
use tracing::debug;

use crate::config::SslConfig;
use crate::error::{MinioError, Result};

fn open(path: &str) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn load_certificates(path: &str) -> Result<Vec<Certificate>> {
    let certs = rustls_pemfile::certs(&mut open(path)?)?;
    if certs.is_empty() {
        return Err(MinioError::Tls(format!("no certificates found in {}", path)));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

fn load_private_key(path: &str) -> Result<PrivateKey> {
    rustls_pemfile::read_all(&mut open(path)?)?
        .into_iter()
        .find_map(|item| match item {
            Item::RSAKey(key) | Item::PKCS8Key(key) | Item::ECKey(key) => Some(PrivateKey(key)),
            _ => None,
        })
        .ok_or_else(|| MinioError::Tls(format!("no private key found in {}", path)))
}

/// Builds the rustls client configuration described by `ssl`.
pub fn client_config(ssl: &SslConfig) -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    for cert in load_certificates(&ssl.ca_file)? {
        roots
            .add(&cert)
            .map_err(|e| MinioError::Tls(format!("invalid CA certificate: {}", e)))?;
    }

    let builder = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots);

    if ssl.cert_file.trim().is_empty() || ssl.key_file.trim().is_empty() {
        debug!("No client certificate configured");
        return Ok(builder.with_no_client_auth());
    }

    let chain = load_certificates(&ssl.cert_file)?;
    let key = load_private_key(&ssl.key_file)?;
    builder
        .with_client_auth_cert(chain, key)
        .map_err(|e| MinioError::Tls(format!("invalid client certificate: {}", e)))
}

/// HTTPS connector using [`client_config`].
pub fn https_connector(ssl: &SslConfig) -> Result<HttpsConnector<HttpConnector>> {
    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(client_config(ssl)?)
        .https_or_http()
        .enable_http1()
        .build())
}

/// Connection pool limits from `ssl`.
pub fn pool_builder(ssl: &SslConfig) -> hyper::client::Builder {
    let mut builder = hyper::Client::builder();
    builder.pool_idle_timeout(ssl.idle_conn_timeout);
    if let Some(max_idle) = ssl.max_idle_conns {
        builder.pool_max_idle_per_host(max_idle);
    }
    builder
}
