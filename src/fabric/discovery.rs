//! Crawl controller.
//!
//! Seeds are submitted to a bounded worker pool. Each worker harvests one
//! device and sends the result back over a channel. The controller, on the
//! calling thread, is the only writer of fabric state: it takes results in
//! completion order, stores the device, and queues the neighbors it reports
//! that are not known yet. The crawl ends when nothing is outstanding.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};

use chrono::Local;
use log::{debug, error, info};

use super::collect::{collect, DiscoveryOptions};
use super::{DiscoveryError, Fabric};
use crate::device::{Device, DeviceId, DiscoveryStatus};
use crate::interface::{Neighbor, NeighborDescriptor};
use crate::session::SessionConnector;

/// Result of one worker, keyed by the target it was given
struct CrawlOutcome {
    target: String,
    result: Result<Device, DiscoveryError>,
}

/// Counts of terminal states reached during one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CrawlSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

fn spawn_worker<'scope, C: SessionConnector>(
    scope: &rayon::Scope<'scope>,
    results: &Sender<CrawlOutcome>,
    connector: &'scope C,
    options: &'scope DiscoveryOptions,
    target: String,
) {
    let results = results.clone();
    scope.spawn(move |_| {
        let result = panic::catch_unwind(AssertUnwindSafe(|| collect(&target, connector, options)))
            .unwrap_or_else(|_| {
                Err(DiscoveryError::WorkerPanicked {
                    address: target.clone(),
                })
            });
        // The controller only hangs up once nothing is outstanding
        let _ = results.send(CrawlOutcome { target, result });
    });
}

impl Fabric {
    /// Crawl the network starting from `seeds`.
    ///
    /// `should_crawl` decides, for every newly seen neighbor, whether it is
    /// queued for discovery or recorded as skipped. Per-host failures are
    /// logged and recorded in the discovery status; only failing to start
    /// the worker pool is an error.
    pub fn discover<C, F>(
        &mut self,
        seeds: &[impl AsRef<str>],
        connector: &C,
        options: &DiscoveryOptions,
        should_crawl: F,
    ) -> Result<CrawlSummary, DiscoveryError>
    where
        C: SessionConnector,
        F: Fn(&NeighborDescriptor) -> bool,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.parallelism.max(1))
            .thread_name(|i| format!("crawl-{}", i))
            .build()
            .map_err(|e| DiscoveryError::Pool(e.to_string()))?;

        let mut summary = CrawlSummary::default();
        let (tx, rx) = mpsc::channel::<CrawlOutcome>();

        pool.in_place_scope(|scope| {
            let mut outstanding = 0usize;

            for seed in seeds {
                let seed = seed.as_ref().trim();
                if self.enqueue(seed).is_some() {
                    info!("Queueing seed {}", seed);
                    spawn_worker(scope, &tx, connector, options, seed.to_string());
                    outstanding += 1;
                }
            }

            while outstanding > 0 {
                info!("Connecting to devices, {} to go", outstanding);
                let Ok(outcome) = rx.recv() else {
                    error!("Crawl workers disconnected with {} outstanding", outstanding);
                    break;
                };
                outstanding -= 1;

                for target in self.process_outcome(outcome, &should_crawl, &mut summary) {
                    spawn_worker(scope, &tx, connector, options, target);
                    outstanding += 1;
                }
            }
        });

        self.compact();
        info!(
            "Discovery complete: {} completed, {} failed, {} skipped; crunching data",
            summary.completed, summary.failed, summary.skipped
        );
        self.refresh_global_information();
        Ok(summary)
    }

    /// Discover a single host synchronously, without following neighbors.
    ///
    /// A host that was already discovered is harvested again and its switch
    /// state replaced. On failure the host is kept as a plain device.
    pub fn add_switch<C: SessionConnector>(
        &mut self,
        host: &str,
        connector: &C,
        options: &DiscoveryOptions,
    ) -> Result<DeviceId, DiscoveryError> {
        let slot = self.slot_for(host);
        self.discovery_status.insert(host.to_string(), DiscoveryStatus::Queued);
        self.devices[slot.0].discovery_status = DiscoveryStatus::Queued;

        info!("Creating switch {}", host);
        match collect(host, connector, options) {
            Ok(device) => {
                let hostname = self.accept(slot, host, device);
                self.compact();
                info!("Finished discovery of switch {}", hostname);
                self.lookup(&hostname).ok_or(DiscoveryError::UnknownHost(hostname))
            }
            Err(e) => {
                self.fail(slot, host, &e);
                self.compact();
                Err(e)
            }
        }
    }

    /// Existing slot for a target, or a new plain device for it
    fn slot_for(&mut self, target: &str) -> DeviceId {
        let id = match self.targets.get(target).copied().or_else(|| self.lookup(target)) {
            Some(id) => id,
            None => self.push_device(Device::new(target)),
        };
        self.targets.insert(target.to_string(), id);
        id
    }

    /// Mark a target as queued. Returns `None` without side effects if it
    /// has already been queued or reached a terminal state.
    fn enqueue(&mut self, target: &str) -> Option<DeviceId> {
        if target.is_empty() {
            return None;
        }
        if self.status_of(target) != DiscoveryStatus::NotStarted {
            debug!("{} already {}, not queueing again", target, self.status_of(target).label());
            return None;
        }
        let existing = self.targets.get(target).copied().or_else(|| self.lookup(target));
        if let Some(id) = existing {
            let status = self.devices[id.0].discovery_status;
            if status != DiscoveryStatus::NotStarted {
                debug!("{} already {}, not queueing again", target, status.label());
                return None;
            }
        }

        let id = self.slot_for(target);
        self.devices[id.0].discovery_status.advance(DiscoveryStatus::Queued);
        self.discovery_status.insert(target.to_string(), DiscoveryStatus::Queued);
        Some(id)
    }

    /// Apply one worker result. Returns the targets to crawl next.
    fn process_outcome<F>(&mut self, outcome: CrawlOutcome, should_crawl: &F, summary: &mut CrawlSummary) -> Vec<String>
    where
        F: Fn(&NeighborDescriptor) -> bool,
    {
        let CrawlOutcome { target, result } = outcome;
        let Some(slot) = self.targets.get(&target).copied() else {
            error!("Received result for unknown target {}", target);
            return Vec::new();
        };

        match result {
            Ok(device) => {
                summary.completed += 1;
                let hostname = self.accept(slot, &target, device);
                info!("Completed discovery of {} ({})", hostname, target);
                match self.lookup(&hostname) {
                    Some(home) => self.expand_neighbors(home, should_crawl, summary),
                    None => Vec::new(),
                }
            }
            Err(e) => {
                summary.failed += 1;
                self.fail(slot, &target, &e);
                Vec::new()
            }
        }
    }

    /// Store a harvested device in the fabric. If its reported hostname
    /// belongs to another slot, that slot takes the data and `slot` is
    /// retired. Returns the hostname it was stored under.
    fn accept(&mut self, slot: DeviceId, target: &str, mut device: Device) -> String {
        let hostname = device.hostname.clone();
        let home = match self.index.get(&hostname).copied() {
            Some(existing) if existing != slot && !self.retired.contains(&existing) => existing,
            _ => slot,
        };

        let old_key = self.devices[slot.0].hostname.clone();
        if self.index.get(&old_key) == Some(&slot) && old_key != hostname {
            self.index.remove(&old_key);
        }
        if home != slot {
            info!("{} is {}, already known; merging", target, hostname);
            self.unlink_device(slot);
            self.retired.insert(slot);
            for id in self.targets.values_mut() {
                if *id == slot {
                    *id = home;
                }
            }
        }

        self.unlink_device(home);
        let previous = &self.devices[home.0];
        device.mgmt_address = previous.mgmt_address.or(device.mgmt_address);
        let now = DiscoveryStatus::Completed(Local::now());
        device.discovery_status = now;

        self.devices[home.0] = device;
        self.index.insert(hostname.clone(), home);
        self.targets.insert(target.to_string(), home);
        self.discovery_status.insert(target.to_string(), now);
        hostname
    }

    fn fail(&mut self, slot: DeviceId, target: &str, e: &DiscoveryError) {
        error!("{} generated an error: {}", target, e);
        self.discovery_status.insert(target.to_string(), DiscoveryStatus::Failed);

        let device = &mut self.devices[slot.0];
        device.discovery_status.advance(DiscoveryStatus::Failed);
        if device.demote().is_some() {
            info!("Demoted {} back to plain device", device.hostname);
        }
    }

    /// Queue or skip the neighbors of a freshly discovered device
    fn expand_neighbors<F>(&mut self, home: DeviceId, should_crawl: &F, summary: &mut CrawlSummary) -> Vec<String>
    where
        F: Fn(&NeighborDescriptor) -> bool,
    {
        let candidates: Vec<NeighborDescriptor> = self.devices[home.0]
            .interfaces()
            .iter()
            .flat_map(|i| i.neighbors.iter().filter_map(Neighbor::descriptor))
            .cloned()
            .collect();

        let mut queued = Vec::new();
        for neighbor in candidates {
            debug!("Evaluating neighbor {}", neighbor.hostname);
            if neighbor.hostname.is_empty() && neighbor.ip.is_none() {
                continue;
            }
            if !neighbor.hostname.is_empty() && self.lookup(&neighbor.hostname).is_some() {
                debug!("Skipping {}, already known", neighbor.hostname);
                continue;
            }

            let target = neighbor
                .ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| neighbor.hostname.clone());
            if self.discovery_status.contains_key(&target) {
                debug!("Skipping {}, {} already queued", neighbor.hostname, target);
                continue;
            }

            let hostname = if neighbor.hostname.is_empty() {
                target.clone()
            } else {
                neighbor.hostname.clone()
            };
            let id = self.push_device(Device::with_hostname(hostname, neighbor.ip));
            self.targets.insert(target.clone(), id);

            let status = if should_crawl(&neighbor) {
                info!("Queueing discovery of {} ({})", neighbor.hostname, target);
                queued.push(target.clone());
                DiscoveryStatus::Queued
            } else {
                info!("Skipping {}, rejected by neighbor filter", neighbor.hostname);
                summary.skipped += 1;
                DiscoveryStatus::Skipped
            };
            self.devices[id.0].discovery_status.advance(status);
            self.discovery_status.insert(target, status);
        }

        debug!("{} new neighbors queued from {}", queued.len(), self.devices[home.0].hostname);
        queued
    }
}
