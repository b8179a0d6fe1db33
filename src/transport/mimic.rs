//! Fingerprint-seeded TLS profiles.
//!
//! A JA3 string (version,ciphers,extensions,curves,point-formats)
//! restricts the TLS client to the cipher suites and key-exchange groups
//! the fingerprinted stack would offer. A parrot is a canned JA3 profile
//! named after the browser build it imitates. Suites and groups the TLS
//! backend does not implement are skipped; the handshake keeps the
//! fingerprint's relative ordering for everything it can express.

use rustls::crypto::{ring, CryptoProvider};
use rustls::{ClientConfig, SupportedCipherSuite, SupportedProtocolVersion};

use super::tls;
use crate::error::{Error, Result};

/// Canned browser fingerprints, keyed by the substring matched against
/// the configured parrot name (`chrome`, `Chrome_120`, … all hit the
/// chrome profile).
const PARROTS: &[(&str, &str)] = &[
    (
        "chrome",
        "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0",
    ),
    (
        "firefox",
        "771,4865-4867-4866-49195-49199-52393-52392-49196-49200-49162-49161-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-34-51-43-13-45-28,29-23-24-25,0",
    ),
    (
        "safari",
        "771,4865-4866-4867-49196-49195-52393-49200-49199-52392-49162-49161-49172-49171-157-156-53-47-10,0-23-65281-10-11-16-5-13-18-51-45-43-27,29-23-24-25,0",
    ),
    (
        "edge",
        "771,4865-4866-4867-49195-49199-49196-49200-52393-52392-49171-49172-156-157-47-53,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0",
    ),
];

/// Parsed JA3 fingerprint fields.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Ja3 {
    version: u16,
    ciphers: Vec<u16>,
    extensions: Vec<u16>,
    curves: Vec<u16>,
    point_formats: Vec<u16>,
}

impl Ja3 {
    fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.trim().split(',').collect();
        if fields.len() != 5 {
            return Err(Error::config(format!(
                "a JA3 string has five comma-separated fields, got {}",
                fields.len()
            )));
        }
        Ok(Self {
            version: fields[0]
                .parse()
                .map_err(|_| Error::config(format!("bad JA3 version field: {}", fields[0])))?,
            ciphers: parse_ids(fields[1])?,
            extensions: parse_ids(fields[2])?,
            curves: parse_ids(fields[3])?,
            point_formats: parse_ids(fields[4])?,
        })
    }
}

fn parse_ids(field: &str) -> Result<Vec<u16>> {
    field
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| Error::config(format!("bad JA3 field element: {part}")))
        })
        .collect()
}

/// Build a TLS client config seeded by a JA3 fingerprint string.
pub(crate) fn config_from_ja3(ja3: &str) -> Result<ClientConfig> {
    let profile = Ja3::parse(ja3)?;
    let base = ring::default_provider();

    let suites: Vec<SupportedCipherSuite> = profile
        .ciphers
        .iter()
        .filter_map(|id| {
            base.cipher_suites
                .iter()
                .find(|s| u16::from(s.suite()) == *id)
                .copied()
        })
        .collect();
    if suites.is_empty() {
        return Err(Error::config(
            "no cipher suite in the JA3 fingerprint is available",
        ));
    }

    let groups = if profile.curves.is_empty() {
        base.kx_groups.clone()
    } else {
        let picked: Vec<_> = profile
            .curves
            .iter()
            .filter_map(|id| {
                base.kx_groups
                    .iter()
                    .find(|g| u16::from(g.name()) == *id)
                    .copied()
            })
            .collect();
        if picked.is_empty() {
            base.kx_groups.clone()
        } else {
            picked
        }
    };

    // Offer only the protocol versions the selected suites can serve
    let mut versions: Vec<&'static SupportedProtocolVersion> = Vec::new();
    if suites
        .iter()
        .any(|s| matches!(s, SupportedCipherSuite::Tls12(_)))
    {
        versions.push(&rustls::version::TLS12);
    }
    if suites
        .iter()
        .any(|s| matches!(s, SupportedCipherSuite::Tls13(_)))
    {
        versions.push(&rustls::version::TLS13);
    }

    let provider = CryptoProvider {
        cipher_suites: suites,
        kx_groups: groups,
        ..base
    };
    tls::config_with(provider, &versions, &["http/1.1"])
}

/// Build a TLS client config from a named browser profile.
pub(crate) fn config_from_parrot(parrot: &str) -> Result<ClientConfig> {
    let wanted = parrot.to_ascii_lowercase();
    let ja3 = PARROTS
        .iter()
        .find(|(name, _)| wanted.contains(name))
        .map(|(_, ja3)| *ja3)
        .ok_or_else(|| Error::config(format!("unknown parrot profile: {parrot}")))?;
    config_from_ja3(ja3)
}
