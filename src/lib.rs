//! # Fabricmap - topology discovery for switched networks
//!
//! Crawls a network of managed switches starting from a few seed
//! addresses, following CDP/LLDP neighbors, and builds an in-memory model
//! of every device, every interface and the links between them.
//!
//! ## Overview
//!
//! - `interface`: parse and render interface configuration blocks
//! - `device`: a device, its interfaces and the data read from it
//! - `session`: the management-session boundary, with snapshot and in-memory connectors
//! - `fabric`: the concurrent crawl, link resolution, MAC attachment points and path search
//! - `config` / `config_loader`: YAML scan configuration
//! - `report`: text and JSON fabric reports
//! - `utils`: uptime timers and MAC address parsing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fabricmap::{config_loader, fabric::Fabric, session::snapshot::SnapshotConnector};
//!
//! let config = config_loader::load_config(Path::new("scan.yaml"))?;
//! let filter = config.neighbor_filter.compile()?;
//! let connector = SnapshotConnector::new(&config.snapshot_dir);
//!
//! let mut fabric = Fabric::new();
//! fabric.discover(config.seeds.as_slice(), &connector, &config.to_options(), |n| filter.allows(n))?;
//!
//! for path in fabric.find_paths_between("access-1", &["core-1"])? {
//!     println!("{:?}", path);
//! }
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Standalone parsing
//!
//! ```rust
//! let interface = fabricmap::interface::parse_str(
//!     "interface GigabitEthernet0/1\n switchport mode access\n switchport access vlan 20\n",
//! );
//! assert_eq!(interface.native_vlan, 20);
//! ```

pub mod config;
pub mod config_loader;
pub mod device;
pub mod fabric;
pub mod interface;
pub mod report;
pub mod session;
pub mod utils;
