//! Informers keep a local cache of one kind in sync with the cluster and
//! fan changes out to registered handlers.
//!
//! An informer consumes a stream of `kube::runtime::watcher` events. Against
//! an API server that stream comes from `watcher()` with backoff; against the
//! fake clientset it is synthesized from list and watch calls. Every
//! (re-)list replaces the cache: objects missing from the new list are
//! reported as deletes. A resync ticker re-delivers every cached object as an
//! update.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use kube::Api;
use kube::runtime::reflector::{self, ObjectRef, Store, store::Writer};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::lib::client::{Clientset, ListOptions, ResourceClient, WatchEvent, WatchStream};
use crate::lib::lister::Lister;
use crate::lib::object::CraneObject;
use crate::{Config, CraneError, KubernetesError, Result};

pub type EventStream<K> = BoxStream<'static, Result<Event<K>>>;

/// Callbacks for cache changes. Unused callbacks default to no-ops.
pub trait ResourceEventHandler<K>: Send + Sync {
    fn on_add(&self, _obj: &K) {}

    fn on_update(&self, _old: &K, _new: &K) {}

    fn on_delete(&self, _obj: &K) {}
}

type AddFn<K> = Box<dyn Fn(&K) + Send + Sync>;
type UpdateFn<K> = Box<dyn Fn(&K, &K) + Send + Sync>;

/// Handler assembled from closures
pub struct HandlerFuncs<K> {
    add: Option<AddFn<K>>,
    update: Option<UpdateFn<K>>,
    delete: Option<AddFn<K>>,
}

impl<K> Default for HandlerFuncs<K> {
    fn default() -> Self {
        Self {
            add: None,
            update: None,
            delete: None,
        }
    }
}

impl<K> HandlerFuncs<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_add(mut self, f: impl Fn(&K) + Send + Sync + 'static) -> Self {
        self.add = Some(Box::new(f));
        self
    }

    pub fn on_update(mut self, f: impl Fn(&K, &K) + Send + Sync + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl Fn(&K) + Send + Sync + 'static) -> Self {
        self.delete = Some(Box::new(f));
        self
    }
}

impl<K> ResourceEventHandler<K> for HandlerFuncs<K> {
    fn on_add(&self, obj: &K) {
        if let Some(f) = &self.add {
            f(obj)
        }
    }

    fn on_update(&self, old: &K, new: &K) {
        if let Some(f) = &self.update {
            f(old, new)
        }
    }

    fn on_delete(&self, obj: &K) {
        if let Some(f) = &self.delete {
            f(obj)
        }
    }
}

/// Watch events for `api`, re-listing with backoff after failures
pub fn watch_api<K: CraneObject>(api: Api<K>, opts: &ListOptions) -> EventStream<K> {
    let mut config = watcher::Config::default().any_semantic();
    if let Some(labels) = opts.label_selector.as_deref() {
        config = config.labels(labels);
    }
    if let Some(fields) = opts.field_selector.as_deref() {
        config = config.fields(fields);
    }

    watcher::watcher(api, config)
        .default_backoff()
        .map_err(|e| CraneError::from(KubernetesError::WatchFailed(e.to_string())))
        .boxed()
}

/// Pause before listing again after a failed list
const RELIST_BACKOFF: Duration = Duration::from_millis(100);

/// Watch events synthesized from a client's list and watch calls: a list,
/// then the live watch. A watch error starts over with a fresh watch and
/// list, so the informer can diff the cache against the new state.
pub fn list_watch<K: CraneObject>(client: Box<dyn ResourceClient<K>>, opts: ListOptions) -> EventStream<K> {
    let source = ListWatch {
        client,
        opts,
        phase: Phase::Relist(None),
    };
    stream::unfold(source, |mut source| async move {
        let item = source.next().await?;
        Some((item, source))
    })
    .boxed()
}

struct ListWatch<K: CraneObject> {
    client: Box<dyn ResourceClient<K>>,
    opts: ListOptions,
    phase: Phase<K>,
}

enum Phase<K> {
    Relist(Option<Duration>),
    Initial(std::vec::IntoIter<Event<K>>, WatchStream<K>),
    Live(WatchStream<K>),
    Done,
}

impl<K: CraneObject> ListWatch<K> {
    async fn next(&mut self) -> Option<Result<Event<K>>> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Relist(delay) => {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    match self.relist().await {
                        Ok((head, changes)) => self.phase = Phase::Initial(head.into_iter(), changes),
                        Err(e) => {
                            self.phase = Phase::Relist(Some(RELIST_BACKOFF));
                            return Some(Err(e));
                        }
                    }
                }
                Phase::Initial(mut head, changes) => match head.next() {
                    Some(event) => {
                        self.phase = Phase::Initial(head, changes);
                        return Some(Ok(event));
                    }
                    None => self.phase = Phase::Live(changes),
                },
                Phase::Live(mut changes) => match changes.next().await {
                    Some(Ok(change)) => {
                        self.phase = Phase::Live(changes);
                        match change {
                            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => return Some(Ok(Event::Apply(obj))),
                            WatchEvent::Deleted(obj) => return Some(Ok(Event::Delete(obj))),
                            WatchEvent::Bookmark(_) => {}
                        }
                    }
                    Some(Err(e)) => {
                        debug!("Watch of {} broke, listing again", K::resource_name());
                        self.phase = Phase::Relist(None);
                        return Some(Err(e));
                    }
                    None => return None,
                },
                Phase::Done => return None,
            }
        }
    }

    async fn relist(&mut self) -> Result<(Vec<Event<K>>, WatchStream<K>)> {
        // Subscribe before listing so no write falls between the two
        let changes = self.client.watch(&self.opts).await?;
        let list = self.client.list(&self.opts).await?;

        let mut head = vec![Event::Init];
        head.extend(list.items.into_iter().map(Event::InitApply));
        head.push(Event::InitDone);
        Ok((head, changes))
    }
}

/// Cache plus handler fan-out for one kind
pub struct Informer<K: CraneObject> {
    store: Store<K>,
    writer: Writer<K>,
    events: EventStream<K>,
    handlers: Vec<Arc<dyn ResourceEventHandler<K>>>,
    resync_period: Option<Duration>,
    // Keys seen since the last `Init`, while a re-list is in flight
    relisted: Option<HashSet<ObjectRef<K>>>,
}

impl<K: CraneObject> Informer<K> {
    pub fn new(events: EventStream<K>, resync_period: Option<Duration>) -> Self {
        let (store, writer) = reflector::store();
        Self {
            store,
            writer,
            events,
            handlers: Vec::new(),
            resync_period,
            relisted: None,
        }
    }

    pub fn add_event_handler(&mut self, handler: impl ResourceEventHandler<K> + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn store(&self) -> Store<K> {
        self.store.clone()
    }

    pub fn lister(&self) -> Lister<K> {
        Lister::new(self.store.clone())
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    /// Process events until the source ends
    pub async fn run(mut self) -> Result<()> {
        let resource = K::resource_name();
        info!("Starting informer for {resource}");

        let mut resync = self.resync_period.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                event = self.events.next() => match event {
                    Some(Ok(event)) => self.handle(event),
                    Some(Err(e)) => warn!("Watch of {resource} failed: {e}"),
                    None => break,
                },
                _ = tick(&mut resync) => self.resync(),
            }
        }

        info!("Informer for {resource} stopped");
        Ok(())
    }

    fn handle(&mut self, event: Event<K>) {
        match &event {
            Event::Apply(obj) => {
                let old = self.store.get(&ObjectRef::from_obj(obj));
                self.writer.apply_watcher_event(&event);
                self.dispatch_apply(old.as_deref(), obj);
            }
            Event::Delete(obj) => {
                self.writer.apply_watcher_event(&event);
                self.handlers.iter().for_each(|h| h.on_delete(obj));
            }
            Event::Init => {
                debug!("Listing {}", K::resource_name());
                self.relisted = Some(HashSet::new());
                self.writer.apply_watcher_event(&event);
            }
            Event::InitApply(obj) => {
                // The live cache is untouched until InitDone swaps in the new list
                let key = ObjectRef::from_obj(obj);
                let old = self.store.get(&key);
                if let Some(seen) = self.relisted.as_mut() {
                    seen.insert(key);
                }
                self.writer.apply_watcher_event(&event);
                self.dispatch_apply(old.as_deref(), obj);
            }
            Event::InitDone => {
                let seen = self.relisted.take().unwrap_or_default();
                let gone: Vec<Arc<K>> = self
                    .store
                    .state()
                    .into_iter()
                    .filter(|obj| !seen.contains(&ObjectRef::from_obj(obj.as_ref())))
                    .collect();
                self.writer.apply_watcher_event(&event);
                for obj in &gone {
                    self.handlers.iter().for_each(|h| h.on_delete(obj));
                }
                debug!(
                    "Synced {} {} ({} removed)",
                    seen.len(),
                    K::resource_name(),
                    gone.len()
                );
            }
        }
    }

    fn dispatch_apply(&self, old: Option<&K>, obj: &K) {
        match old {
            Some(old) => self.handlers.iter().for_each(|h| h.on_update(old, obj)),
            None => self.handlers.iter().for_each(|h| h.on_add(obj)),
        }
    }

    fn resync(&self) {
        let cached = self.store.state();
        debug!("Resyncing {} cached {}", cached.len(), K::resource_name());
        for obj in &cached {
            self.handlers.iter().for_each(|h| h.on_update(obj, obj));
        }
    }
}

async fn tick(resync: &mut Option<Interval>) {
    match resync {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}


/// Type-erased informer held by the factory
trait SharedInformer: Send {
    fn start(&mut self) -> Option<JoinHandle<Result<()>>>;

    fn synced(&self) -> BoxFuture<'static, Result<()>>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Entry<K: CraneObject> {
    store: Store<K>,
    pending: Option<Informer<K>>,
}

impl<K: CraneObject> SharedInformer for Entry<K> {
    fn start(&mut self) -> Option<JoinHandle<Result<()>>> {
        self.pending.take().map(Informer::spawn)
    }

    fn synced(&self) -> BoxFuture<'static, Result<()>> {
        let store = self.store.clone();
        Box::pin(async move {
            store
                .wait_until_ready()
                .await
                .map_err(|_| KubernetesError::CacheSyncFailed(K::resource_name()).into())
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Hands out one informer per kind. Every informer shares the namespace,
/// list options and resync period of the factory.
pub struct SharedInformerFactory {
    clientset: Clientset,
    namespace: Option<String>,
    options: ListOptions,
    resync_period: Option<Duration>,
    informers: Mutex<HashMap<TypeId, Box<dyn SharedInformer>>>,
}

impl SharedInformerFactory {
    pub fn new(clientset: Clientset, config: &Config) -> Self {
        Self {
            clientset,
            namespace: config.namespace.clone(),
            options: ListOptions {
                label_selector: config.label_selector.clone(),
                ..Default::default()
            },
            resync_period: config.resync_period,
            informers: Mutex::new(HashMap::new()),
        }
    }

    /// Adjust the list options every informer is built with
    pub fn tweak_list_options(mut self, tweak: impl FnOnce(&mut ListOptions)) -> Self {
        tweak(&mut self.options);
        self
    }

    /// Register a handler on the informer for `K`, creating it if needed.
    /// Handlers added after `start` are never called.
    pub fn add_event_handler<K: CraneObject>(&self, handler: impl ResourceEventHandler<K> + 'static) {
        self.with_entry::<K, _>(|entry| match entry.pending.as_mut() {
            Some(informer) => informer.add_event_handler(handler),
            None => warn!("Informer for {} already started", K::resource_name()),
        });
    }

    pub fn lister<K: CraneObject>(&self) -> Lister<K> {
        self.with_entry::<K, _>(|entry| Lister::new(entry.store.clone()))
    }

    fn with_entry<K: CraneObject, R>(&self, f: impl FnOnce(&mut Entry<K>) -> R) -> R {
        let mut informers = self.informers.lock().unwrap_or_else(PoisonError::into_inner);
        let shared = informers.entry(TypeId::of::<K>()).or_insert_with(|| {
            debug!("Creating informer for {}", K::resource_name());
            let informer = Informer::new(
                self.clientset
                    .event_source::<K>(self.namespace.as_deref(), &self.options),
                self.resync_period,
            );
            Box::new(Entry {
                store: informer.store(),
                pending: Some(informer),
            }) as Box<dyn SharedInformer>
        });

        match shared.as_any_mut().downcast_mut::<Entry<K>>() {
            Some(entry) => f(entry),
            None => unreachable!("informers are keyed by their own type"),
        }
    }

    /// Spawn every informer that is not running yet
    pub fn start(&self) -> Vec<JoinHandle<Result<()>>> {
        let mut informers = self.informers.lock().unwrap_or_else(PoisonError::into_inner);
        let started: Vec<_> = informers.values_mut().filter_map(|i| i.start()).collect();
        info!("Started {} informers", started.len());
        started
    }

    /// Wait until every informer has completed its first list
    pub async fn wait_for_cache_sync(&self, timeout: Duration) -> Result<()> {
        let pending: Vec<_> = self
            .informers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|i| i.synced())
            .collect();

        tokio::time::timeout(timeout, future::try_join_all(pending))
            .await
            .map_err(|_| KubernetesError::CacheSyncFailed(format!("not synced after {timeout:?}")))??;
        Ok(())
    }
}
