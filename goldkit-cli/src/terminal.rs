//! Terminal stand-ins for the platform seams.

use std::collections::HashMap;
use std::io::Write;

use goldkit_core::navigation::{Navigator, Route};
use goldkit_core::notifications::PushRegistrar;

/// Prints route changes instead of switching screens.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate_to(&self, route: Route, params: HashMap<String, String>) {
        println!("[navigate] {route}{}", format_params(&params));
    }

    fn replace(&self, route: Route, params: HashMap<String, String>) {
        println!("[replace] {route}{}", format_params(&params));
    }

    fn reset(&self, routes: Vec<Route>) {
        let names: Vec<&str> = routes.iter().map(AsRef::as_ref).collect();
        println!("[reset] {}", names.join(" > "));
    }
}

fn format_params(params: &HashMap<String, String>) -> String {
    if params.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    format!(" ({})", pairs.join(", "))
}

/// A terminal has no push channel; handlers are no-ops and no token exists.
pub struct NoPush;

impl PushRegistrar for NoPush {
    fn install_handler(&self) {}

    fn uninstall_handler(&self) {}

    fn device_token(&self) -> Option<String> {
        None
    }

    fn platform(&self) -> String {
        "cli".to_string()
    }
}

/// Prints `label` without a newline so the answer goes on the same line.
pub fn prompt(label: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()
}
