//! Shared WebSocket adapter state.
//!
//! The change stream reads its ports from [`crate::inbound::http::state::HttpState`];
//! this bundle only carries the upgrade policy.

use url::Url;

const LOCALHOST: &str = "localhost";

/// Origins allowed to open the change stream.
///
/// Plain-HTTP `localhost` with an explicit non-zero port is always accepted
/// so the console can be developed against a local server.
#[derive(Clone, Debug, Default)]
pub struct AllowedOrigins {
    origins: Vec<Url>,
}

impl AllowedOrigins {
    /// Parse configured origins such as `https://library.example`.
    ///
    /// ```rust
    /// use library_backend::inbound::ws::state::AllowedOrigins;
    /// use url::Url;
    ///
    /// let allowed = AllowedOrigins::parse(["https://library.example"]).expect("origins");
    /// assert!(allowed.permits(&Url::parse("https://library.example").expect("url")));
    /// assert!(!allowed.permits(&Url::parse("https://evil.example").expect("url")));
    /// ```
    pub fn parse<I, S>(origins: I) -> Result<Self, url::ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|raw| Url::parse(raw.as_ref().trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { origins })
    }

    /// Whether a parsed `Origin` header may upgrade.
    #[must_use]
    pub fn permits(&self, origin: &Url) -> bool {
        let Some(host) = origin.host_str() else {
            return false;
        };
        if origin.scheme() == "http" && host == LOCALHOST {
            return matches!(origin.port(), Some(port) if port != 0);
        }
        self.origins
            .iter()
            .any(|allowed| allowed.origin() == origin.origin())
    }
}

/// Dependency bundle for the WebSocket entry point.
#[derive(Clone, Debug, Default)]
pub struct WsState {
    /// Upgrade allow-list.
    pub origins: AllowedOrigins,
}

impl WsState {
    /// State accepting `origins` besides local development hosts.
    pub fn new(origins: AllowedOrigins) -> Self {
        Self { origins }
    }
}
