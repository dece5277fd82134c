use anyhow::Context;
use clap::{CommandFactory, Parser};
use k8s_status::cli::{Args, Command};
use k8s_status::k8s::api::KubeClusterApi;
use k8s_status::k8s::cache::{CacheBackend, CacheStore, MemoryBackend, RedisBackend, ResourceCache};
use k8s_status::k8s::fetchers::ResourceFetcher;
use k8s_status::k8s::views::Views;
use k8s_status::k8s::{USER_AGENT, client};
use k8s_status::logging;
use k8s_status::pages::{Dashboard, Page};
use std::sync::Arc;
use tracing::{debug, info};

fn backend(args: &Args) -> anyhow::Result<Arc<dyn CacheBackend>> {
    if args.no_redis {
        info!("using in-process cache");
        return Ok(Arc::new(MemoryBackend::new()));
    }
    let redis = RedisBackend::new(&args.redis_url).with_context(|| format!("invalid redis url {}", args.redis_url))?;
    Ok(Arc::new(redis))
}

async fn render(dashboard: &Dashboard, command: Command, args: &Args) -> Page {
    let lookup = args.lookup();
    match command {
        Command::Home => dashboard.home(lookup).await,
        Command::Nodes => dashboard.nodes(lookup).await,
        Command::Node { name } => dashboard.node(&name, lookup).await,
        Command::Namespaces => dashboard.namespaces(lookup).await,
        Command::Namespace { namespace } => dashboard.namespace(&namespace, lookup).await,
        Command::Pod { namespace, name } => dashboard.pod(&namespace, &name, lookup).await,
        Command::Ingress { namespace, name } => dashboard.ingress(&namespace, &name, lookup).await,
        Command::Images => dashboard.images(lookup).await,
        Command::Image { image } => dashboard.image(&image, lookup).await,
        Command::Quota { namespace } => dashboard.quota(&namespace, lookup).await,
        Command::Completions { .. } => Page::default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Command::Completions { shell } = &args.command {
        let mut command = Args::command();
        let name = command.get_name().to_string();
        clap_complete::generate(*shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    logging::initialize();

    if rustls::crypto::aws_lc_rs::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }

    let client = client::new(Some(USER_AGENT)).await.context("no usable kubeconfig")?;
    let store = CacheStore::new(backend(&args)?, &args.identity());
    debug!("cache prefix {}", store.prefix());

    let fetcher = ResourceFetcher::new(Arc::new(KubeClusterApi::new(client)), ResourceCache::new(store));
    let dashboard = Dashboard::new(Views::new(fetcher, args.roles()));

    let page = render(&dashboard, args.command.clone(), &args).await;
    println!("{}", k8s_openapi::serde_json::to_string_pretty(&page)?);

    Ok(())
}
