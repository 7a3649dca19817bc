pub mod api;

use crate::cli::ServeArgs;
use crate::relay::RelayService;
use axum_server::tls_rustls::RustlsConfig;
use std::error::Error;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use log::{ info, error };

pub struct Server {
    addr: String,
    relay: RelayService,
    args: ServeArgs,
}

impl Server {
    pub fn new(addr: String, relay: RelayService, args: ServeArgs) -> Self {
        Self { addr, relay, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;

        match self.tls_paths()? {
            Some((cert_path, key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                // Both ring and aws-lc end up linked; pick one explicitly.
                let _ = rustls::crypto::ring::default_provider().install_default();
                let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;

                info!("Relay listening on: https://{}", addr);
                let app = api::router(self.relay.clone());
                axum_server::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service()).await?;
            }
            None => {
                let listener = match TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!("Failed to bind relay to {}: {}. Try a different port.", addr, e);
                        return Err(Box::new(e));
                    }
                };
                info!("Relay listening on: http://{}", listener.local_addr()?);
                api::serve(listener, self.relay.clone()).await?;
            }
        }

        Ok(())
    }

    fn tls_paths(&self) -> Result<Option<(&str, &str)>, Box<dyn Error + Send + Sync>> {
        if !self.args.enable_tls {
            info!("TLS not enabled. Serving plain HTTP.");
            return Ok(None);
        }
        match (&self.args.tls_cert_path, &self.args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Some((cert_path.as_str(), key_path.as_str()))),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }
}
