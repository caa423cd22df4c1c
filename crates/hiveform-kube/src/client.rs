//! Kubernetes client construction from provider configuration

use hiveform_core::ProviderConfig;
use kube::config::{KubeConfigOptions, Kubeconfig};
use tracing::debug;

use crate::error::{KubeError, Result};

/// Connect using the configured kubeconfig and context
///
/// Without either, the usual inference applies (in-cluster config,
/// `KUBECONFIG`, then `~/.kube/config`).
pub async fn connect(config: &ProviderConfig) -> Result<kube::Client> {
    if config.offline {
        return Err(KubeError::Offline {
            operation: "connect".to_string(),
        });
    }

    let options = KubeConfigOptions {
        context: config.context.clone(),
        ..Default::default()
    };

    let kube_config = match &config.kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), context = ?config.context, "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                KubeError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
            })?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| KubeError::InvalidConfig(e.to_string()))?
        }
        None if config.context.is_some() => kube::Config::from_kubeconfig(&options)
            .await
            .map_err(|e| KubeError::InvalidConfig(e.to_string()))?,
        None => kube::Config::infer()
            .await
            .map_err(|e| KubeError::InvalidConfig(e.to_string()))?,
    };

    Ok(kube::Client::try_from(kube_config)?)
}
