use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ickb_sdk::ScriptConfig;

pub const DEFAULT_JSONRPC_URL: &str = "http://127.0.0.1:8114";
const SCRIPTS_CONFIG_ENV: &str = "ICKB_SCRIPTS_CONFIG";
const DEFAULT_SCRIPTS_CONFIG: &str = "ickb-scripts.toml";

pub struct GlobalConfig {
    url: String,
    scripts_path: PathBuf,
    debug: bool,
}

impl GlobalConfig {
    /// `--config`, then `$ICKB_SCRIPTS_CONFIG`, then `./ickb-scripts.toml`
    pub fn new(url: Option<&str>, scripts_path: Option<&str>, debug: bool) -> GlobalConfig {
        let scripts_path = scripts_path
            .map(PathBuf::from)
            .or_else(|| env::var_os(SCRIPTS_CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPTS_CONFIG));
        GlobalConfig {
            url: url.unwrap_or(DEFAULT_JSONRPC_URL).to_owned(),
            scripts_path,
            debug,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn scripts_path(&self) -> &Path {
        &self.scripts_path
    }

    pub fn load_script_config(&self) -> Result<ScriptConfig, String> {
        load_script_config(&self.scripts_path)
    }
}

pub fn load_script_config(path: &Path) -> Result<ScriptConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|err| format!("Read scripts config {:?} failed: {}", path, err))?;
    toml::from_str(&content)
        .map_err(|err| format!("Parse scripts config {:?} failed: {}", path, err))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn script_item(index: u8) -> String {
        format!(
            r#"
code_hash = "0x{hash}"
hash_type = "type"
cell_dep = {{ out_point = {{ tx_hash = "0x{tx}", index = "0x{index:x}" }}, dep_type = "code" }}
"#,
            hash = format!("{:02x}", index + 1).repeat(32),
            tx = "33".repeat(32),
            index = index,
        )
    }

    fn scripts_toml() -> String {
        [
            "secp256k1_blake160",
            "dao",
            "sudt",
            "deposit_lock",
            "owner_lock",
            "receipt_type",
            "claim_lock",
            "domain_logic",
        ]
        .iter()
        .enumerate()
        .map(|(index, name)| format!("[{}]{}", name, script_item(index as u8)))
        .collect::<Vec<_>>()
        .join("\n")
    }

    #[test]
    fn test_default_url() {
        let config = GlobalConfig::new(None, Some("scripts.toml"), false);
        assert_eq!(config.url(), DEFAULT_JSONRPC_URL);
        assert_eq!(config.scripts_path(), Path::new("scripts.toml"));
        let config = GlobalConfig::new(Some("http://node:8114"), Some("a.toml"), true);
        assert_eq!(config.url(), "http://node:8114");
        assert!(config.debug());
    }

    #[test]
    fn test_load_script_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(scripts_toml().as_bytes()).unwrap();
        let config = load_script_config(file.path()).unwrap();
        assert_eq!(config.cell_deps().len(), 8);
        assert!(config.extra_cell_deps.is_empty());
    }

    #[test]
    fn test_load_script_config_errors() {
        let missing = Path::new("/nonexistent/ickb-scripts.toml");
        assert!(load_script_config(missing)
            .unwrap_err()
            .starts_with("Read scripts config"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[dao]\ncode_hash = 1\n").unwrap();
        assert!(load_script_config(file.path())
            .unwrap_err()
            .starts_with("Parse scripts config"));
    }
}
