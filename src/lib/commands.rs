use std::path::Path;
use std::time::Duration;

use log::{debug, info};

use crate::lib::cli::{Cli, Command, OutputFormat};
use crate::lib::client::{Clientset, ListOptions};
use crate::lib::crd;
use crate::lib::informer::{HandlerFuncs, SharedInformerFactory};
use crate::lib::kind::with_kind;
use crate::lib::kubernetes;
use crate::lib::object::CraneObject;
use crate::lib::output::{self, event_line};
use crate::lib::tui::display_resource_table;
use crate::{Config, CraneError, Result};

/// How long `watch` waits for its first list
const CACHE_SYNC_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crds { out_dir } => crds(out_dir.as_deref()),
        Command::List {
            kind,
            namespace,
            selector,
            output,
        } => {
            let config = Config::new(cli.context, namespace, selector, 0)?;
            let clientset = kubernetes::clientset(&config).await?;
            with_kind!(kind, K => list::<K>(&clientset, &config, &output).await)
        }
        Command::Get {
            kind,
            name,
            namespace,
            output,
        } => {
            let config = Config::new(cli.context, namespace, None, 0)?;
            let clientset = kubernetes::clientset(&config).await?;
            with_kind!(kind, K => get::<K>(&clientset, &config, &name, &output).await)
        }
        Command::Watch {
            kind,
            namespace,
            selector,
            resync_seconds,
        } => {
            let config = Config::new(cli.context, namespace, selector, resync_seconds)?;
            let clientset = kubernetes::clientset(&config).await?;
            with_kind!(kind, K => watch::<K>(clientset, &config).await)
        }
    }
}

fn crds(out_dir: Option<&Path>) -> Result<()> {
    match out_dir {
        Some(dir) => {
            for path in crd::write_all(dir)? {
                println!("{}", path.display());
            }
        }
        None => print!("{}", crd::to_yaml(&crd::all()?)?),
    }
    Ok(())
}

fn list_options(config: &Config) -> ListOptions {
    ListOptions {
        label_selector: config.label_selector.clone(),
        ..Default::default()
    }
}

async fn list<K: CraneObject>(clientset: &Clientset, config: &Config, format: &OutputFormat) -> Result<()> {
    let client = clientset.resource::<K>(config.namespace.as_deref());
    let list = client.list(&list_options(config)).await?;
    info!("Found {} {}", list.len(), K::resource_name());

    match format {
        OutputFormat::Table => {
            let namespace_column = K::NAMESPACED && config.namespace.is_none();
            display_resource_table(&K::resource_name(), namespace_column, output::rows(&list.items))?;
        }
        other => println!("{}", output::render(&list, other)?),
    }
    Ok(())
}

async fn get<K: CraneObject>(
    clientset: &Clientset,
    config: &Config,
    name: &str,
    format: &OutputFormat,
) -> Result<()> {
    if K::NAMESPACED && config.namespace.is_none() {
        return Err(CraneError::Invalid(format!(
            "{} is namespaced, pass --namespace",
            K::kind_name()
        )));
    }

    let obj = clientset.resource::<K>(config.namespace.as_deref()).get(name).await?;
    match format {
        OutputFormat::Table => {
            display_resource_table(&K::kind_name(), K::NAMESPACED, output::rows([&obj]))?;
        }
        other => println!("{}", output::render(&obj, other)?),
    }
    Ok(())
}

async fn watch<K: CraneObject>(clientset: Clientset, config: &Config) -> Result<()> {
    let factory = SharedInformerFactory::new(clientset, config);
    factory.add_event_handler::<K>(
        HandlerFuncs::new()
            .on_add(|obj: &K| println!("{}", event_line("ADDED", obj)))
            .on_update(|old: &K, new: &K| {
                let verb = if old.meta().resource_version == new.meta().resource_version {
                    "SYNCED"
                } else {
                    "MODIFIED"
                };
                println!("{}", event_line(verb, new));
            })
            .on_delete(|obj: &K| println!("{}", event_line("DELETED", obj))),
    );

    let tasks = factory.start();
    factory.wait_for_cache_sync(CACHE_SYNC_TIMEOUT).await?;
    debug!("Cache for {} synced", K::resource_name());

    for task in tasks {
        task.await.map_err(|e| CraneError::Other(e.to_string()))??;
    }
    Ok(())
}
