//! Best-effort browser launch.

use std::thread;

/// Open `url` in a browser on a detached thread.
///
/// Failures are logged and otherwise ignored; nothing waits for the result.
pub fn spawn_browser(url: String, browser: Option<String>) {
    let spawned = thread::Builder::new()
        .name("open-browser".into())
        .spawn(move || {
            let result = match &browser {
                Some(program) => open::with(&url, program.clone()),
                None => open::that(&url),
            };
            if let Err(e) = result {
                tracing::warn!(
                    url = %url,
                    browser = ?browser,
                    error = %e,
                    "Failed to open browser"
                );
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Failed to start browser launcher");
    }
}
