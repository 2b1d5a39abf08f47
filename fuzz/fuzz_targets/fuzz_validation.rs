//! Fuzz testing for name, path and IP validation.
//!
//! Every function here sits directly on untrusted input: plugin file
//! names, endpoint paths from config files, and client addresses from
//! forwarding headers. None of them may panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly fuzz run fuzz_validation
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use hooks_gateway::config::IpFilterConfig;
use hooks_gateway::ip_filter::is_allowed;
use hooks_gateway::validation::{
    canonical_plugin_name, to_type_name, validate_identifier, validate_route_path,
};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    name: &'a str,
    client: &'a str,
    allowlist: Vec<String>,
    blocklist: Vec<String>,
}

fuzz_target!(|input: Input<'_>| {
    let _ = validate_identifier(&to_type_name(input.name));
    if let Ok(name) = canonical_plugin_name(input.name) {
        assert!(validate_identifier(&name).is_ok());
        assert!(!name.contains('_'));
    }
    let _ = validate_route_path(input.name);

    let filter = IpFilterConfig {
        allowlist: input.allowlist,
        blocklist: input.blocklist,
        ..IpFilterConfig::default()
    };
    let allowed = is_allowed(input.client, &filter);

    // Blocklist precedence: blocking everything denies everything.
    let deny_all = IpFilterConfig {
        blocklist: vec!["0.0.0.0/0".to_string(), "::/0".to_string()],
        ..filter
    };
    if allowed {
        assert!(!is_allowed(input.client, &deny_all));
    }
});
