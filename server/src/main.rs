use leads_proxy::{LeadsProxyServer, ProxyConfig};
use miette::{Context, IntoDiagnostic, Result};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leads_proxy=debug,server=debug,info".into()),
        )
        .init();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e).into_diagnostic().wrap_err("invalid configuration");
        }
    };
    let port = config.port;

    let server = LeadsProxyServer::builder()
        .config(config)
        .build()
        .into_diagnostic()
        .wrap_err("failed to build leads proxy server")?;
    tracing::info!(backend = %server.backend().describe(), "data backend ready");

    let app = server.router();

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()
        .wrap_err("failed to bind to address")?;
    tracing::info!("auth proxy listening on {}", addr);

    axum::serve(listener, app)
        .await
        .into_diagnostic()
        .wrap_err("server error")?;

    Ok(())
}
