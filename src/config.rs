//! Loading the topology inputs
//!
//! Inputs come from a TOML or JSON file (chosen by extension), then
//! environment variables, then command-line overrides, in that order.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::schema::{Inputs, Sensitive};

pub const ENV_ADMIN_PASSWORD: &str = "TOPOFORM_ADMIN_PASSWORD";
pub const ENV_SSH_PUBLIC_KEY: &str = "TOPOFORM_SSH_PUBLIC_KEY";
pub const ENV_SUBSCRIPTION_ID: &str = "TOPOFORM_SUBSCRIPTION_ID";

/// Serialization format of an inputs file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }

    pub fn parse(self, content: &str) -> Result<Inputs> {
        match self {
            Self::Toml => toml::from_str(content).context("Invalid TOML inputs"),
            Self::Json => serde_json::from_str(content).context("Invalid JSON inputs"),
        }
    }
}

/// Inputs plus the file they were read from, if any
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub inputs: Inputs,
    pub source: Option<PathBuf>,
}

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vm_count: Option<i64>,
    pub deploy_vms: Option<bool>,
    pub ssh_public_key_file: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(&self, inputs: &mut Inputs) -> Result<()> {
        if let Some(count) = self.vm_count {
            inputs.vm_count = count;
        }
        if let Some(deploy) = self.deploy_vms {
            inputs.deploy_vms = deploy;
        }
        if let Some(file) = &self.ssh_public_key_file {
            let path = paths::expand(&file.to_string_lossy());
            let key = fs::read_to_string(&path)
                .with_context(|| format!("Could not read SSH public key: {}", path.display()))?;
            let key = key.trim();
            if key.is_empty() {
                bail!("SSH public key file is empty: {}", path.display());
            }
            inputs.ssh_public_key = Some(key.to_string());
        }
        Ok(())
    }
}

/// Load inputs from `explicit`, or from the default file when present
///
/// A missing default file is not an error; every input has a default.
pub fn load_inputs(explicit: Option<&Path>, overrides: &Overrides) -> Result<LoadedInputs> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (paths::config_file()?, false),
    };

    let (mut inputs, source) = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let inputs = ConfigFormat::from_path(&path)
            .parse(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        log::debug!("Loaded inputs from {}", path.display());
        (inputs, Some(path))
    } else if required {
        bail!("Inputs file not found: {}", path.display());
    } else {
        log::debug!("No inputs file at {}, using defaults", path.display());
        (Inputs::default(), None)
    };

    apply_env(&mut inputs, |key| std::env::var(key).ok());
    overrides.apply(&mut inputs)?;

    if inputs.has_conflicting_credentials() {
        log::warn!("Both an SSH public key and an admin password are set; the password is ignored");
    }

    Ok(LoadedInputs { inputs, source })
}

/// Apply environment overrides; empty values are ignored
fn apply_env<F>(inputs: &mut Inputs, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(password) = get(ENV_ADMIN_PASSWORD) {
        inputs.admin_password = Some(Sensitive::new(password));
    }
    if let Some(key) = get(ENV_SSH_PUBLIC_KEY) {
        inputs.ssh_public_key = Some(key.trim().to_string());
    }
    if let Some(subscription) = get(ENV_SUBSCRIPTION_ID) {
        inputs.subscription_id = subscription.trim().to_string();
    }
}

/// Starter inputs file written by `config init`
pub const STARTER_TOML: &str = r#"# topoform inputs
#
# Secrets are better supplied through the environment:
#   TOPOFORM_ADMIN_PASSWORD, TOPOFORM_SSH_PUBLIC_KEY, TOPOFORM_SUBSCRIPTION_ID

subscription_id = ""
resource_group_name = "rg-vm-topology"
location = "East US"

deploy_vms = true
vm_count = 1
vm_size = "Standard_B1s"
admin_username = "azureuser"

[tags]
environment = "dev"
managed_by = "topoform"

[provider]
version = "=4.1.0"

[network]
address_space = ["10.0.0.0/16"]
subnet_prefix = "10.0.1.0/24"

[[security_rules]]
name = "SSH"
priority = 1001
direction = "Inbound"
access = "Allow"
protocol = "Tcp"
destination_port_range = "22"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("inputs")), ConfigFormat::Toml);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "topology.toml", "resource_group_name = \"rg-a\"\nvm_count = 2\n");

        let loaded = load_inputs(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(loaded.inputs.resource_group_name, "rg-a");
        assert_eq!(loaded.inputs.vm_count, 2);
        assert_eq!(loaded.source, Some(path));
    }

    #[test]
    fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "inputs.json",
            r#"{"resource_group_name": "rg-json", "deploy_vms": false, "provider": {"version": ["=3.1"]}}"#,
        );

        let inputs = load_inputs(Some(&path), &Overrides::default()).unwrap().inputs;
        assert_eq!(inputs.resource_group_name, "rg-json");
        assert!(!inputs.deploy_vms);
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_inputs(Some(&dir.path().join("nope.toml")), &Overrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("Inputs file not found"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.toml", "vm_count = \"three\"\n");
        let err = load_inputs(Some(&path), &Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ADMIN_PASSWORD, "from-env"),
            (ENV_SUBSCRIPTION_ID, " sub-env "),
            (ENV_SSH_PUBLIC_KEY, ""),
        ]);
        let mut inputs = Inputs::default();
        apply_env(&mut inputs, |k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(inputs.admin_password.unwrap().expose(), "from-env");
        assert_eq!(inputs.subscription_id, "sub-env");
        assert!(inputs.ssh_public_key.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let key = write(&dir, "id.pub", "ssh-ed25519 AAAAC3Nza test@host\n");

        let mut inputs = Inputs::default();
        Overrides {
            vm_count: Some(4),
            deploy_vms: Some(false),
            ssh_public_key_file: Some(key),
        }
        .apply(&mut inputs)
        .unwrap();

        assert_eq!(inputs.vm_count, 4);
        assert!(!inputs.deploy_vms);
        assert_eq!(
            inputs.ssh_public_key.as_deref(),
            Some("ssh-ed25519 AAAAC3Nza test@host")
        );
    }

    #[test]
    fn test_empty_key_file_rejected() {
        let dir = TempDir::new().unwrap();
        let key = write(&dir, "empty.pub", "\n");
        let overrides = Overrides {
            ssh_public_key_file: Some(key),
            ..Overrides::default()
        };
        assert!(overrides.apply(&mut Inputs::default()).is_err());
    }

    #[test]
    fn test_starter_file_parses() {
        let inputs = ConfigFormat::Toml.parse(STARTER_TOML).unwrap();
        assert_eq!(inputs.resource_group_name, "rg-vm-topology");
        assert_eq!(inputs.security_rules.len(), 1);
        assert_eq!(inputs.security_rules[0].destination_port_range, "22");
    }
}
