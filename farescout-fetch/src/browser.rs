//! Headless browser pool.
//!
//! A fixed-size pool of long-lived Chrome instances, leased per request
//! with scoped acquisition. The lease returns its instance on every exit
//! path, including cancellation; a lease marked broken is replaced with a
//! freshly launched instance instead of being returned.
//!
//! The pool drives a system-installed Chrome binary; nothing is bundled.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::deadline::Deadline;
use crate::error::BrowserError;

// ============================================================================
// Pool Config
// ============================================================================

/// Configuration for the browser pool.
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Number of long-lived instances.
    pub size: usize,
    /// Explicit Chrome binary path; auto-detected when `None`.
    pub chrome_executable: Option<PathBuf>,
    /// Run headless.
    pub headless: bool,
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            size: 2,
            chrome_executable: None,
            headless: true,
        }
    }
}

// ============================================================================
// Instance
// ============================================================================

/// One pooled browser with its CDP event-loop task.
#[derive(Debug)]
struct Instance {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Instance {
    async fn launch(config: &BrowserPoolConfig) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(BrowserError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // The CDP handler stream must be driven for the browser to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "Browser close failed");
        }
        self.handler_task.abort();
    }
}

// ============================================================================
// Browser Pool
// ============================================================================

#[derive(Debug)]
struct PoolShared {
    config: BrowserPoolConfig,
    returns: mpsc::Sender<Instance>,
}

/// Fixed-size pool of long-lived browser instances.
pub struct BrowserPool {
    shared: Arc<PoolShared>,
    idle: Mutex<mpsc::Receiver<Instance>>,
}

impl BrowserPool {
    /// Launches `config.size` instances and builds the pool.
    pub async fn launch(config: BrowserPoolConfig) -> Result<Self, BrowserError> {
        let (tx, rx) = mpsc::channel(config.size.max(1));
        for i in 0..config.size {
            let instance = Instance::launch(&config).await?;
            debug!(slot = i, "Browser instance launched");
            tx.send(instance)
                .await
                .map_err(|_| BrowserError::LaunchFailed("pool channel closed".to_string()))?;
        }
        info!(size = config.size, "Browser pool ready");
        Ok(Self {
            shared: Arc::new(PoolShared {
                config,
                returns: tx,
            }),
            idle: Mutex::new(rx),
        })
    }

    /// An empty pool for configurations with browser automation disabled.
    ///
    /// Leasing from it always fails `PoolExhausted`.
    pub fn disabled() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            shared: Arc::new(PoolShared {
                config: BrowserPoolConfig {
                    size: 0,
                    ..BrowserPoolConfig::default()
                },
                returns: tx,
            }),
            idle: Mutex::new(rx),
        }
    }

    /// Number of configured slots.
    pub fn size(&self) -> usize {
        self.shared.config.size
    }

    /// Leases an instance, waiting up to the request deadline.
    pub async fn lease(&self, deadline: Deadline) -> Result<BrowserLease, BrowserError> {
        if self.shared.config.size == 0 {
            return Err(BrowserError::PoolExhausted(Duration::ZERO));
        }
        let wait = deadline.remaining();
        let mut idle = self.idle.lock().await;
        let instance = tokio::time::timeout(wait, idle.recv())
            .await
            .map_err(|_| BrowserError::PoolExhausted(wait))?
            .ok_or_else(|| BrowserError::LaunchFailed("pool channel closed".to_string()))?;
        drop(idle);

        Ok(BrowserLease {
            instance: Some(instance),
            shared: Arc::clone(&self.shared),
            broken: false,
        })
    }
}

// ============================================================================
// Browser Lease
// ============================================================================

/// Scoped lease of one pooled browser instance.
///
/// Dropping the lease returns the instance to the pool. A lease marked
/// broken shuts the instance down and launches a replacement in the
/// background so the pool keeps its size.
#[derive(Debug)]
pub struct BrowserLease {
    instance: Option<Instance>,
    shared: Arc<PoolShared>,
    broken: bool,
}

impl BrowserLease {
    /// Opens a new page on the leased instance.
    pub async fn new_page(&self, url: &str) -> Result<Page, BrowserError> {
        let instance = self.instance.as_ref().expect("lease already released");
        instance
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))
    }

    /// Marks the instance unusable; it will be replaced, not returned.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let broken = self.broken;
        tokio::spawn(async move {
            if broken {
                warn!("Replacing broken browser instance");
                instance.shutdown().await;
                match Instance::launch(&shared.config).await {
                    Ok(fresh) => {
                        let _ = shared.returns.send(fresh).await;
                    }
                    Err(e) => warn!(error = %e, "Browser relaunch failed; pool shrinks"),
                }
            } else {
                let _ = shared.returns.send(instance).await;
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
