use crate::config::ScanConfig;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and validate a scan configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<ScanConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration {:?}", config_path))?;

    let config: ScanConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration {:?}", config_path))?;

    config.validate()?;

    info!(
        "Loaded {} seed(s), {} credential(s), parallelism {}",
        config.seeds.len(),
        config.credentials.len(),
        config.parallelism
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "seeds: [10.0.0.1]\ncredentials:\n  - username: admin\n    password: secret\nparallelism: 4\nsnapshot_dir: /tmp/snapshots"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.snapshot_dir, Path::new("/tmp/snapshots"));
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "seeds: []\ncredentials:\n  - username: admin\n    password: secret").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/scan.yaml")).is_err());
    }
}
