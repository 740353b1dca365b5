use kube::{Client, Config as KubeConfig, config::KubeConfigOptions};
use log::{debug, info};

use crate::lib::client::Clientset;
use crate::{
    Config, ConfigError::InvalidValue, KubernetesError::ConnectionFailed, Result,
};

/// Build a client from the kubeconfig, honouring a context override
pub async fn connect(config: &Config) -> Result<Client> {
    let client = if let Some(ref context) = config.context {
        debug!("Using context {context} from Kubeconfig");
        let custom_config = KubeConfig::from_kubeconfig(&KubeConfigOptions {
            context: Some(context.clone()),
            ..Default::default()
        })
        .await
        .map_err(|e| InvalidValue(e.to_string()))?;

        Client::try_from(custom_config).map_err(|e| ConnectionFailed(e.to_string()))?
    } else {
        debug!("Creating a Kubernetes client using default Kubeconfig");
        Client::try_default()
            .await
            .map_err(|e| ConnectionFailed(e.to_string()))?
    };

    info!("Connected to cluster (default namespace {})", client.default_namespace());
    Ok(client)
}

/// Clientset against the cluster selected by `config`
pub async fn clientset(config: &Config) -> Result<Clientset> {
    Ok(Clientset::new(connect(config).await?))
}
