//! URL construction for log lines, the browser and the router prefix.

use crate::config::ServerConfig;
use crate::config::schema::LOCALHOST;

/// Placeholder shown instead of a wildcard bind address.
pub const ALL_INTERFACES_DISPLAY: &str = "[all ip addresses on your system]";

/// Join two URL path pieces without doubling the separating slash.
pub fn url_path_join(a: &str, b: &str) -> String {
    if a.ends_with('/') && b.starts_with('/') {
        format!("{}{}", &a[..a.len() - 1], b)
    } else {
        format!("{a}{b}")
    }
}

/// The address reported at startup: `scheme://host:port/base_url`.
pub fn display_url(config: &ServerConfig, port: u16) -> String {
    let host = if config.server.binds_all_interfaces() {
        ALL_INTERFACES_DISPLAY.to_string()
    } else {
        url_host(config.server.ip.trim())
    };
    format!("{}://{}:{}{}", config.scheme(), host, port, config.server.base_url)
}

/// The address a local browser should open.
pub fn browser_url(config: &ServerConfig, port: u16) -> String {
    let host = if config.server.binds_all_interfaces() {
        LOCALHOST.to_string()
    } else {
        url_host(config.server.ip.trim())
    };
    format!("{}://{}:{}{}", config.scheme(), host, port, config.server.base_url)
}

/// IPv6 literals need brackets inside a URL authority.
fn url_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

/// Router mount point for `base_url`, or `None` for the root.
pub fn mount_point(base_url: &str) -> Option<String> {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_without_double_slash() {
        assert_eq!(url_path_join("/base/", "/kernels"), "/base/kernels");
        assert_eq!(url_path_join("/base", "/kernels"), "/base/kernels");
        assert_eq!(url_path_join("/", "/"), "/");
    }

    #[test]
    fn wildcard_host_displays_placeholder() {
        let mut config = ServerConfig::default();
        config.server.ip = "*".into();
        assert_eq!(
            display_url(&config, 8888),
            "http://[all ip addresses on your system]:8888/"
        );
        assert_eq!(browser_url(&config, 8888), "http://127.0.0.1:8888/");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let mut config = ServerConfig::default();
        config.server.ip = "::1".into();
        assert_eq!(display_url(&config, 8888), "http://[::1]:8888/");
        assert_eq!(browser_url(&config, 8888), "http://[::1]:8888/");

        config.server.ip = "::".into();
        assert_eq!(
            display_url(&config, 8888),
            "http://[all ip addresses on your system]:8888/"
        );
        assert_eq!(browser_url(&config, 8888), "http://127.0.0.1:8888/");
    }

    #[test]
    fn certificate_switches_scheme() {
        let mut config = ServerConfig::default();
        config.server.certfile = Some("cert.pem".into());
        config.server.base_url = "/nb/".into();
        assert_eq!(display_url(&config, 9999), "https://127.0.0.1:9999/nb/");
    }

    #[test]
    fn mount_points() {
        assert_eq!(mount_point("/"), None);
        assert_eq!(mount_point("/nb/"), Some("/nb".to_string()));
        assert_eq!(mount_point("/a/b"), Some("/a/b".to_string()));
    }
}
