use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Context;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 500;

/// Server settings, read once at startup.
///
/// | variable | default |
/// |---|---|
/// | `PDF_OCR_HOST` | `0.0.0.0` |
/// | `PDF_OCR_PORT` | `8001` |
/// | `PDF_OCR_MAX_UPLOAD_MB` | `500` |
/// | `TESSERACT_CMD` | `tesseract` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_upload_mb: usize,
    pub tesseract_cmd: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
            tesseract_cmd: pdf_ocr_tesseract::DEFAULT_COMMAND.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or empty values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("PDF_OCR_HOST") {
            config.host = host
                .trim()
                .parse()
                .with_context(|| format!("invalid PDF_OCR_HOST {host:?}"))?;
        }
        if let Some(port) = get("PDF_OCR_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PDF_OCR_PORT {port:?}"))?;
        }
        if let Some(limit) = get("PDF_OCR_MAX_UPLOAD_MB") {
            config.max_upload_mb = limit
                .trim()
                .parse()
                .with_context(|| format!("invalid PDF_OCR_MAX_UPLOAD_MB {limit:?}"))?;
            anyhow::ensure!(config.max_upload_mb > 0, "PDF_OCR_MAX_UPLOAD_MB must be positive");
        }
        if let Some(cmd) = get("TESSERACT_CMD") {
            config.tesseract_cmd = cmd;
        }
        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
