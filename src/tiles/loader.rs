//! Threaded tile fetching.
//!
//! The loader owns a LIFO work stack shared by at most `thread_limit` worker
//! threads per tile server. Workers pop the most recently requested tile
//! first, so tiles that just scrolled into view win over older requests.
//! Finished tiles are written to the [`DiskCache`] and handed back to the
//! control thread over a channel; [`TileLoader::poll`] drains it without
//! blocking. Failed downloads are logged and dropped: no retry, no error
//! delivery, and the tile is never requested again by this loader.

use super::cache::DiskCache;
use super::source::TileServerConfig;
use super::spec::TileSpec;
use crate::core::config::TileLoaderConfig;
use crate::core::constants::{DEFAULT_REQUEST_TIMEOUT_MS, USER_AGENT};
use crate::{MapError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use fxhash::FxHashSet;
use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shared blocking HTTP client with the crate User-Agent so that public tile
/// servers don't reject the request. Building the client once avoids the cost
/// of TLS and connection pool setup for every tile.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    build_client(USER_AGENT, Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS))
        .expect("failed to build reqwest blocking client")
});

fn build_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// Anything that can turn a tile URL into image bytes.
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain HTTP GET fetcher. Non-2xx responses are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Fetcher with its own client built from the loader configuration
    pub fn from_config(config: &TileLoaderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config.user_agent, config.request_timeout())?,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
        }
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// A tile that is now available on disk
#[derive(Debug, Clone, PartialEq)]
pub struct TileArrival {
    pub spec: TileSpec,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
struct WorkQueue {
    /// Pending specs; the end of the vector is the top of the stack
    stack: Vec<TileSpec>,
    /// Worker threads currently alive
    workers: usize,
}

struct Shared {
    queue: Mutex<WorkQueue>,
    cache: DiskCache,
    fetcher: Arc<dyn TileFetcher>,
    results: Sender<TileArrival>,
}

impl Shared {
    fn lock_queue(&self) -> MutexGuard<'_, WorkQueue> {
        // The queue holds plain data, a panicking holder cannot leave it torn.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Fetch coordinator for one tile server.
///
/// Lives on the control thread; only the worker threads and the channel cross
/// thread boundaries.
pub struct TileLoader {
    server: Arc<TileServerConfig>,
    shared: Arc<Shared>,
    results: Receiver<TileArrival>,
    /// Everything ever handed to `request`, so no tile is fetched twice
    requested: FxHashSet<TileSpec>,
    spawned: usize,
}

impl TileLoader {
    pub fn new(server: Arc<TileServerConfig>, cache: DiskCache, fetcher: Arc<dyn TileFetcher>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            server,
            shared: Arc::new(Shared {
                queue: Mutex::new(WorkQueue::default()),
                cache,
                fetcher,
                results: tx,
            }),
            results: rx,
            requested: FxHashSet::default(),
            spawned: 0,
        }
    }

    /// Loader using HTTP and the cache directory from `config`
    pub fn from_config(server: Arc<TileServerConfig>, config: &TileLoaderConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(config)?;
        Ok(Self::new(server, config.cache(), Arc::new(fetcher)))
    }

    pub fn server(&self) -> &Arc<TileServerConfig> {
        &self.server
    }

    pub fn cache(&self) -> &DiskCache {
        &self.shared.cache
    }

    /// Queues tiles for fetching and returns how many were new.
    ///
    /// Specs seen before are skipped. Tiles already in the disk cache are
    /// reported as arrived right away; the rest are pushed on the work stack
    /// and picked up by worker threads, spawning new ones up to the server's
    /// thread limit.
    pub fn request<I>(&mut self, specs: I) -> Result<usize>
    where
        I: IntoIterator<Item = TileSpec>,
    {
        let mut accepted = 0;
        let mut to_download = Vec::new();
        for spec in specs {
            if !self.requested.insert(spec.clone()) {
                continue;
            }
            accepted += 1;
            match self.shared.cache.get(&spec) {
                Some(path) => {
                    log::debug!("tile {} served from cache", spec);
                    // The receiver lives in `self`, so this cannot fail.
                    let _ = self.shared.results.send(TileArrival { spec, path });
                }
                None => to_download.push(spec),
            }
        }

        if to_download.is_empty() {
            return Ok(accepted);
        }

        log::debug!("queueing {} tile downloads from {}", to_download.len(), self.server.name);
        let spawn = {
            let mut queue = self.shared.lock_queue();
            queue.stack.extend(to_download);
            let wanted = self.server.thread_limit.max(1).min(queue.stack.len());
            let spawn = wanted.saturating_sub(queue.workers);
            queue.workers += spawn;
            spawn
        };

        for started in 0..spawn {
            if let Err(e) = self.spawn_worker() {
                log::error!("failed to start tile worker: {}", e);
                self.shared.lock_queue().workers -= spawn - started;
                return Err(e);
            }
        }
        Ok(accepted)
    }

    fn spawn_worker(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let name = format!("tile-worker-{}", self.spawned);
        self.spawned += 1;
        std::thread::Builder::new()
            .name(name)
            .spawn(move || run_worker(shared))?;
        Ok(())
    }

    /// Drains finished tiles without blocking
    pub fn poll(&self) -> Vec<TileArrival> {
        self.results.try_iter().collect()
    }

    /// Blocks until the next tile arrives or the timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TileArrival> {
        self.results.recv_timeout(timeout).ok()
    }

    /// Whether `spec` was ever handed to [`TileLoader::request`]
    pub fn was_requested(&self, spec: &TileSpec) -> bool {
        self.requested.contains(spec)
    }

    /// Tiles waiting for a worker
    pub fn queued(&self) -> usize {
        self.shared.lock_queue().stack.len()
    }

    /// Tiles waiting for a worker plus tiles being downloaded right now
    pub fn in_flight(&self) -> usize {
        let queue = self.shared.lock_queue();
        queue.stack.len() + queue.workers
    }

    /// Worker threads currently running
    pub fn active_workers(&self) -> usize {
        self.shared.lock_queue().workers
    }

    /// No work queued, running or waiting to be polled
    pub fn is_idle(&self) -> bool {
        let queue = self.shared.lock_queue();
        queue.stack.is_empty() && queue.workers == 0 && self.results.is_empty()
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        let spec = {
            let mut queue = shared.lock_queue();
            match queue.stack.pop() {
                Some(spec) => spec,
                None => {
                    queue.workers -= 1;
                    return;
                }
            }
        };

        let url = spec.download_url();
        let fetched = shared
            .fetcher
            .fetch(&url)
            .and_then(|data| shared.cache.store(&spec, &data));
        match fetched {
            Ok(path) => {
                log::debug!("downloaded tile {} to {}", spec, path.display());
                if shared.results.send(TileArrival { spec, path }).is_err() {
                    log::debug!("tile loader dropped, discarding result");
                }
            }
            Err(e) => log::warn!("tile {} from {} failed: {}", spec, url, e),
        }
    }
}
