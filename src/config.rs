//! Configuration module for BoxTally.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "boxtally.db")
    pub db_path: String,
    /// Vendor cloud region: "cn", "eu" or "asean" (default: "eu")
    pub vbox_region: String,
    /// Vendor account id.
    pub vbox_comid: String,
    /// Vendor account private key.
    pub vbox_comkey: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "boxtally.db".to_string(),
            vbox_region: "eu".to_string(),
            vbox_comid: String::new(),
            vbox_comkey: String::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BOXTALLY_HTTP_PORT`: HTTP port (default: 8080)
    /// - `BOXTALLY_DB_PATH`: Database file path (default: "boxtally.db")
    /// - `BOXTALLY_VBOX_REGION`: Vendor region (default: "eu")
    /// - `BOXTALLY_VBOX_COMID`: Vendor account id
    /// - `BOXTALLY_VBOX_COMKEY`: Vendor account private key
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(port_str) = env::var("BOXTALLY_HTTP_PORT") {
            if let Ok(port) = port_str.parse() {
                cfg.http_port = port;
            }
        }

        if let Ok(db_path) = env::var("BOXTALLY_DB_PATH") {
            cfg.db_path = db_path;
        }

        if let Ok(region) = env::var("BOXTALLY_VBOX_REGION") {
            cfg.vbox_region = region;
        }

        if let Ok(comid) = env::var("BOXTALLY_VBOX_COMID") {
            cfg.vbox_comid = comid;
        }

        if let Ok(comkey) = env::var("BOXTALLY_VBOX_COMKEY") {
            cfg.vbox_comkey = comkey;
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.db_path, "boxtally.db");
        assert_eq!(cfg.vbox_region, "eu");
        assert!(cfg.vbox_comid.is_empty());
    }
}
