/// The Stitch TUI version.
///
/// In development builds, this defaults to the workspace Cargo package version.
/// In release builds, CI injects the tag version via the `STITCH_TUI_VERSION`
/// environment variable so releases can be cut by tagging without editing
/// `Cargo.toml`.
///
/// Logged at renderer startup and re-exported for hosts that report the
/// renderer version alongside their own (version negotiation stays on the
/// host side; the renderer never gates on it).
pub const STITCH_TUI_VERSION: &str = match option_env!("STITCH_TUI_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn version_falls_back_to_the_package_version() {
        // Test builds run without the release override injected.
        assert_eq!(STITCH_TUI_VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!STITCH_TUI_VERSION.is_empty());
    }
}
