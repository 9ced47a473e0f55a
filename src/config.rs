/*!
Structs to hold configuration data.
*/
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

#[derive(Deserialize)]
struct ConfigFile {
    host: Option<String>,
    port: Option<u16>,
    allowed_origin: Option<String>,
    default_page_limit: Option<u64>,
}

#[derive(Debug)]
pub struct Cfg {
    pub addr: SocketAddr,
    /// The one origin the CORS layer admits; everything else is refused
    /// at the transport layer.
    pub allowed_origin: String,
    pub default_page_limit: u64,
}

impl std::default::Default for Cfg {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(
                "0.0.0.0".parse().unwrap(),
                5000
            ),
            allowed_origin: "http://localhost:5173".to_owned(),
            default_page_limit: 10,
        }
    }
}

impl Cfg {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let file_contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Unable to read config file: {}", &e))?;
        let cf: ConfigFile = toml::from_str(&file_contents)
            .map_err(|e| format!("Unable to deserialize config file: {}", &e))?;

        let mut c = Self::default();

        if let Some(s) = cf.host {
            c.addr.set_ip(
                s.parse().map_err(|e| format!(
                    "Error parsing {:?} as IP address: {}",
                    &s, &e
                ))?
            );
        }
        if let Some(n) = cf.port {
            c.addr.set_port(n);
        }
        if let Some(s) = cf.allowed_origin {
            c.allowed_origin = s;
        }
        if let Some(n) = cf.default_page_limit {
            if n > 0 {
                c.default_page_limit = n;
            }
        }

        Ok(c)
    }
}
