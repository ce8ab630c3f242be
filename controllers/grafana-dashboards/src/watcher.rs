//! Kubernetes resource watchers.
//!
//! This module turns the raw `kube_runtime::watcher` stream into informer
//! events. The `Informer` keeps a local store of the objects it has seen so
//! it can tell an *added* object from an *updated* one, detect objects that
//! disappeared across a relist, and periodically redeliver everything it
//! knows as updates (full resync).
//!
//! Handlers run on the informer task, one event at a time. Cancellation is
//! only observed between events; a handler that has started always finishes.

use crate::error::ControllerError;
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::WatchStreamExt;
use kube_runtime::watcher::{self, Event};
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Resync period used by the controller, matching the classic informer default.
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(3 * 60);

/// Raw watch events, as produced by `kube_runtime::watcher`.
pub type WatchStream<K> = BoxStream<'static, Result<Event<K>, watcher::Error>>;

/// Receives informer events.
///
/// Only `on_add` is required; updates and deletes are ignored unless a
/// handler opts in.
#[async_trait::async_trait]
pub trait ResourceEventHandler<K: Send + Sync>: Send + Sync {
    async fn on_add(&self, obj: &K);

    async fn on_update(&self, _old: &K, _new: &K) {}

    async fn on_delete(&self, _obj: &K) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    namespace: Option<String>,
    name: String,
}

impl ObjectKey {
    fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace(),
            name: obj.name_any(),
        }
    }
}

/// Objects seen so far, plus the keys seen during an ongoing relist.
struct Store<K> {
    objects: HashMap<ObjectKey, K>,
    relist: Option<HashSet<ObjectKey>>,
}

impl<K> Store<K>
where
    K: Resource + Clone + Send + Sync,
{
    fn new() -> Self {
        Self {
            objects: HashMap::new(),
            relist: None,
        }
    }

    async fn apply<H>(&mut self, event: Event<K>, handler: &H)
    where
        H: ResourceEventHandler<K> + ?Sized,
    {
        match event {
            Event::Init => {
                debug!("Informer relist started");
                self.relist = Some(HashSet::new());
            }
            Event::InitApply(obj) => {
                if let Some(seen) = self.relist.as_mut() {
                    seen.insert(ObjectKey::of(&obj));
                }
                self.upsert(obj, handler).await;
            }
            Event::InitDone => {
                if let Some(seen) = self.relist.take() {
                    let gone: Vec<ObjectKey> = self
                        .objects
                        .keys()
                        .filter(|key| !seen.contains(*key))
                        .cloned()
                        .collect();
                    for key in gone {
                        if let Some(obj) = self.objects.remove(&key) {
                            handler.on_delete(&obj).await;
                        }
                    }
                }
                info!("Informer synced ({} objects)", self.objects.len());
            }
            Event::Apply(obj) => self.upsert(obj, handler).await,
            Event::Delete(obj) => {
                let key = ObjectKey::of(&obj);
                self.objects.remove(&key);
                if let Some(seen) = self.relist.as_mut() {
                    seen.remove(&key);
                }
                handler.on_delete(&obj).await;
            }
        }
    }

    async fn upsert<H>(&mut self, obj: K, handler: &H)
    where
        H: ResourceEventHandler<K> + ?Sized,
    {
        match self.objects.insert(ObjectKey::of(&obj), obj.clone()) {
            Some(old) => handler.on_update(&old, &obj).await,
            None => handler.on_add(&obj).await,
        }
    }

    async fn resync<H>(&self, handler: &H)
    where
        H: ResourceEventHandler<K> + ?Sized,
    {
        debug!("Informer resync ({} objects)", self.objects.len());
        for obj in self.objects.values() {
            handler.on_update(obj, obj).await;
        }
    }
}

/// List-watch driven event source with periodic resync.
pub struct Informer<K> {
    events: WatchStream<K>,
    resync_period: Option<Duration>,
}

impl<K> Debug for Informer<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Informer")
            .field("resync_period", &self.resync_period)
            .finish_non_exhaustive()
    }
}

impl<K> Informer<K>
where
    K: Resource + Clone + Send + Sync + 'static,
{
    /// Creates an informer over an arbitrary raw event stream.
    pub fn new(events: WatchStream<K>) -> Self {
        Self {
            events,
            resync_period: Some(DEFAULT_RESYNC_PERIOD),
        }
    }

    /// Creates an informer watching `api`, reconnecting with backoff.
    pub fn for_api(api: Api<K>) -> Self
    where
        K: DeserializeOwned + Debug,
    {
        let events = watcher::watcher(api, watcher::Config::default())
            .default_backoff()
            .boxed();
        Self::new(events)
    }

    /// Sets the resync period. `Duration::ZERO` disables resync.
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync_period = (!period.is_zero()).then_some(period);
        self
    }

    /// Delivers events to `handler` until `cancel` fires.
    ///
    /// Watch errors are logged and the stream is polled again. The stream
    /// ending is reported as an error since a watch should never end.
    pub async fn run<H>(self, handler: &H, cancel: CancellationToken) -> Result<(), ControllerError>
    where
        H: ResourceEventHandler<K> + ?Sized,
    {
        let Informer {
            mut events,
            resync_period,
        } = self;
        let mut store = Store::new();
        let mut resync = resync_period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        info!("Starting informer");

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!("Informer stopped");
                    return Ok(());
                }
                () = next_resync(&mut resync) => {
                    store.resync(handler).await;
                }
                next = events.next() => match next {
                    Some(Ok(event)) => store.apply(event, handler).await,
                    Some(Err(e)) => warn!("Watch stream error (continuing): {}", e),
                    None => {
                        return Err(ControllerError::Watch("watch stream ended".to_string()));
                    }
                },
            }
        }
    }
}

async fn next_resync(resync: &mut Option<Interval>) {
    match resync {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
