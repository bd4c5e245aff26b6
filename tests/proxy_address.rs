// tests/proxy_address.rs
mod common;
use crate::common::init_tracing;

use devreload::errors::DevReloadError;
use devreload::proxy::{find_leaf, resolve_proxy_target, ProxyTarget};

fn tree(doc: &str) -> toml::Value {
    toml::from_str::<toml::Table>(doc).map(toml::Value::Table).unwrap()
}

#[test]
fn finds_address_in_deeply_nested_section() {
    init_tracing();
    let doc = tree(
        r#"
        [logging]
        level = "info"

        [reverse_proxy.clusters.vite.destinations.d1]
        Address = "http://localhost:5173/"
        "#,
    );

    let target = resolve_proxy_target(&doc, "Address").unwrap();
    assert_eq!(target.host, "localhost");
    assert_eq!(target.port, 5173);
    assert_eq!(target.to_string(), "localhost:5173");
}

#[test]
fn key_match_ignores_ascii_case() {
    let doc = tree(
        r#"
        [proxy]
        ADDRESS = "http://127.0.0.1:9000"
        "#,
    );
    assert_eq!(find_leaf(&doc, "address"), Some("http://127.0.0.1:9000"));
}

#[test]
fn first_depth_first_match_wins() {
    let doc = tree(
        r#"
        [a.z]
        Address = "http://nested-first:1"

        [b]
        Address = "http://sibling:2"
        "#,
    );
    assert_eq!(find_leaf(&doc, "Address"), Some("http://nested-first:1"));
}

#[test]
fn non_string_key_is_searched_not_taken() {
    let doc = tree(
        r#"
        [Address]
        enabled = true

        [Address.inner]
        Address = "http://inner:7"
        "#,
    );
    assert_eq!(find_leaf(&doc, "Address"), Some("http://inner:7"));
}

#[test]
fn arrays_of_tables_are_searched() {
    let doc = tree(
        r#"
        [[routes]]
        Path = "/api"

        [[routes]]
        Address = "http://from-array:3000"
        "#,
    );
    assert_eq!(find_leaf(&doc, "Address"), Some("http://from-array:3000"));
}

#[test]
fn missing_address_is_a_configuration_error() {
    let doc = tree(
        r#"
        [dev_server]
        enabled = true
        "#,
    );
    let err = resolve_proxy_target(&doc, "Address").unwrap_err();
    assert!(matches!(err, DevReloadError::MissingProxyAddress { ref key } if key == "Address"));
}

#[test]
fn parses_default_ports_and_ipv6() {
    let https = ProxyTarget::parse("https://dev.example.test").unwrap();
    assert_eq!((https.host.as_str(), https.port), ("dev.example.test", 443));

    let http = ProxyTarget::parse("http://localhost/").unwrap();
    assert_eq!(http.port, 80);

    let v6 = ProxyTarget::parse("http://[::1]:8080/").unwrap();
    assert_eq!(v6.host, "::1");
    assert_eq!(v6.to_string(), "[::1]:8080");
    assert_eq!(v6.url().as_str(), "http://[::1]:8080/");
}

#[test]
fn rejects_unusable_uris() {
    for value in ["not a uri", "unix:/tmp/dev.sock", "custom://host-without-port"] {
        let err = ProxyTarget::parse(value).unwrap_err();
        assert!(
            matches!(err, DevReloadError::InvalidProxyAddress { .. }),
            "{value} should be rejected, got {err:?}"
        );
    }
}
